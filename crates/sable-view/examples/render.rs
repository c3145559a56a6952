//! Render a small buffer to stdout through the view engine.
//!
//! ```sh
//! cargo run -p sable-view --example render
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use sable_text::Buffer;
use sable_view::{ScreenLine, StyleId, SymbolFlags, Syntax, UiBackend, View};

struct StdoutUi;

impl UiBackend for StdoutUi {
    fn draw_text(&mut self, lines: &[ScreenLine]) {
        println!("+{}+", "-".repeat(32));
        for line in lines {
            let row: String = line.cells().iter().map(|c| c.glyph()).collect();
            println!("|{row:<32}|");
        }
        println!("+{}+", "-".repeat(32));
    }

    fn syntax_style(&mut self, slot: StyleId, spec: &str) {
        eprintln!("style slot {} -> {spec:?}", slot.slot());
    }
}

fn main() {
    let text = Rc::new(RefCell::new(Buffer::from(
        "fn main() {\n\tlet greeting = \"hello\";\n\tprintln!(\"{greeting}\");\n}\n",
    )));
    let mut view = View::new(Rc::clone(&text));
    view.set_ui(Box::new(StdoutUi));
    view.symbols_set(SymbolFlags::EOL | SymbolFlags::TAB);

    let mut syntax = Syntax::new();
    let keyword = syntax.add_style("bold");
    syntax
        .add_rule(r"\bfn\b|\blet\b", keyword)
        .expect("pattern compiles");
    view.syntax_set(Some(syntax));

    view.resize(32, 6);
    view.tabwidth_set(4);
    view.cursor_to(3);
}
