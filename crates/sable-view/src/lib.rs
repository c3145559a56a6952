#![forbid(unsafe_code)]

//! Viewport engine for the sable editor.
//!
//! This crate turns a byte-addressed text buffer into a bounded grid of
//! cells for a terminal while keeping a population of cursors and
//! selections alive across edits:
//!
//! - [`View`] - the viewport: cell grid, screen-line chain, scrolling
//! - [`Cell`] / [`ScreenLine`] - the grid data model
//! - [`Syntax`] - regex rules, style slots and whitespace symbols
//! - [`CursorId`] / [`SelectionId`] - handles into the view's cursor and
//!   selection sets
//! - [`UiBackend`] / [`ViewEvents`] - the outward contracts
//!
//! Text access goes through [`sable_text::TextBuffer`]; positions that
//! must survive edits (cursors, selection endpoints, the viewport start)
//! are stored as buffer marks, and byte offsets are only caches.
//!
//! # Example
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use sable_text::Buffer;
//! use sable_view::{SymbolFlags, View};
//!
//! let text = Rc::new(RefCell::new(Buffer::from("one\ntwo\nthree\n")));
//! let mut view = View::new(Rc::clone(&text));
//! view.resize(40, 4);
//! view.symbols_set(SymbolFlags::EOL);
//!
//! // Edits made elsewhere slide the viewport anchor along.
//! text.borrow_mut().insert(0, "zero\n");
//! view.draw();
//! assert_eq!(view.lines()[0].lineno(), 1);
//! ```

pub mod cell;
pub mod cursor;
mod draw;
pub mod line;
mod logging;
pub mod selection;
pub mod syntax;
pub mod view;

pub use cell::{Cell, CellFlags, StyleId};
pub use cursor::{CursorId, CursorPos, Register};
pub use line::ScreenLine;
pub use sable_text::ByteRange;
pub use selection::SelectionId;
pub use syntax::{SymbolFlags, SymbolKind, Syntax, SyntaxRule, SyntaxSymbol};
pub use view::View;

/// Rendering backend a view presents to.
///
/// The view computes cells; the backend owns the terminal (or whatever
/// stands in for one) and the mapping of style slots to concrete
/// attributes.
pub trait UiBackend {
    /// Render the finished grid, top row first. Called at the end of every
    /// draw pass.
    fn draw_text(&mut self, lines: &[ScreenLine]);

    /// Register a style specification under a slot. Called once per style
    /// when a syntax definition is attached.
    fn syntax_style(&mut self, slot: StyleId, spec: &str);
}

/// Hook notified while a view draws.
pub trait ViewEvents {
    /// A valid selection was projected; `range` is its absolute byte
    /// range.
    fn selection(&mut self, range: ByteRange);
}
