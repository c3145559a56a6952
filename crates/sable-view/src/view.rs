#![forbid(unsafe_code)]

//! The view: a window of text projected onto a reusable cell grid.
//!
//! A [`View`] owns the grid, the cursor set and the selection set for one
//! window onto a shared text buffer. The byte range `[start, end]` it
//! displays is anchored by a mark, so edits made above the window by other
//! parties slide the window along with the text.
//!
//! Scrolling never consults a line index, because the buffer is byte
//! addressed: moving down walks the rendered screen lines and moving up
//! scans the text backwards for newlines, bounded by one window's worth
//! of bytes.
//!
//! # Example
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use sable_text::Buffer;
//! use sable_view::View;
//!
//! let text = Rc::new(RefCell::new(Buffer::from("fn main() {}\n")));
//! let mut view = View::new(text);
//! view.resize(80, 24);
//! assert_eq!(view.lines()[0].lineno(), 1);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use sable_text::{ByteRange, Mark, TextBuffer};

use crate::cell::StyleId;
use crate::cursor::{Cursor, CursorId};
use crate::line::ScreenLine;
use crate::logging::{debug, trace};
use crate::selection::Selection;
use crate::syntax::{
    SYMBOL_COUNT, SymbolFlags, SymbolKind, Syntax, SyntaxSymbol, symbols_blank, symbols_visible,
};
use crate::{UiBackend, ViewEvents};

/// A viewable area showing part of a text buffer, tracking cursors and
/// selections.
///
/// At all times at least one cursor exists; the *primary* cursor is kept
/// inside the visible viewport by every operation that completes.
pub struct View<T: TextBuffer> {
    pub(crate) text: Rc<RefCell<T>>,
    pub(crate) ui: Option<Box<dyn UiBackend>>,
    pub(crate) events: Option<Box<dyn ViewEvents>>,
    pub(crate) width: usize,
    pub(crate) height: usize,
    /// Displayed byte range `[start, end]`.
    pub(crate) start: usize,
    pub(crate) end: usize,
    /// `start` at the time `start_mark` was last bound.
    pub(crate) start_last: usize,
    /// Mark anchoring the start of the visible area across edits.
    pub(crate) start_mark: Option<Mark>,
    /// Grid rows; reused across redraws, grown on resize only.
    pub(crate) lines: Vec<ScreenLine>,
    /// Index of the last row carrying text. Rows after it show EOF markers.
    pub(crate) lastline: usize,
    /// Row the pipeline writes next, `None` once the grid is full.
    pub(crate) draw_row: Option<usize>,
    /// Column the pipeline writes next.
    pub(crate) draw_col: usize,
    pub(crate) tabwidth: usize,
    pub(crate) symbols: [SyntaxSymbol; SYMBOL_COUNT],
    pub(crate) symbol_flags: SymbolFlags,
    pub(crate) syntax: Option<Syntax>,
    pub(crate) cursors: Vec<Cursor>,
    pub(crate) selections: Vec<Selection>,
    pub(crate) primary: CursorId,
    pub(crate) next_cursor_id: u64,
    pub(crate) next_selection_id: u64,
    /// Center the viewport when the primary cursor reaches end of file and
    /// the end is not yet visible.
    pub(crate) eof_centering: bool,
}

impl<T: TextBuffer> View<T> {
    /// Create a view over `text` with a single cursor at offset 0 and a
    /// 1x1 grid. Call [`resize`](View::resize) to give it a real size.
    pub fn new(text: Rc<RefCell<T>>) -> Self {
        let mut view = Self {
            text,
            ui: None,
            events: None,
            width: 0,
            height: 0,
            start: 0,
            end: 0,
            start_last: 0,
            start_mark: None,
            lines: Vec::new(),
            lastline: 0,
            draw_row: None,
            draw_col: 0,
            tabwidth: 8,
            symbols: symbols_blank(),
            symbol_flags: SymbolFlags::empty(),
            syntax: None,
            cursors: Vec::new(),
            selections: Vec::new(),
            primary: CursorId(0),
            next_cursor_id: 0,
            next_selection_id: 0,
            eof_centering: true,
        };
        let primary = view.cursors_new();
        view.symbols_set(SymbolFlags::empty());
        view.resize(1, 1);
        view.cursors_to(primary, 0);
        view
    }

    /// Attach the UI backend that receives the grid after each draw.
    pub fn set_ui(&mut self, ui: Box<dyn UiBackend>) {
        self.ui = Some(ui);
    }

    /// Attach the event hook notified about selections during draws.
    pub fn set_events(&mut self, events: Box<dyn ViewEvents>) {
        self.events = Some(events);
    }

    /// The shared text buffer this view displays.
    #[must_use]
    pub fn text(&self) -> &Rc<RefCell<T>> {
        &self.text
    }

    /// Swap the underlying buffer, dropping all selections and moving the
    /// cursor to offset 0. Marks minted against the old buffer are
    /// meaningless against the new one and are discarded.
    pub fn reload(&mut self, text: Rc<RefCell<T>>) {
        self.text = text;
        self.start = 0;
        self.end = 0;
        self.start_last = 0;
        self.start_mark = None;
        for cursor in &mut self.cursors {
            cursor.mark = None;
            cursor.sel = None;
            cursor.lastsel_anchor = None;
            cursor.lastsel_cursor = None;
        }
        self.selections.clear();
        let primary = self.primary;
        self.draw();
        self.cursors_to(primary, 0);
    }

    /// Resize the grid, growing the allocation when needed, and redraw.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        let width = width.max(1);
        let height = height.max(1);
        debug!(width, height, "view resize");
        if height > self.lines.len() {
            self.lines.resize_with(height, ScreenLine::default);
        }
        for line in &mut self.lines {
            line.grow(width);
            line.clear();
        }
        self.width = width;
        self.height = height;
        self.draw();
        true
    }

    /// Grid width in columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// The displayed rows, top to bottom.
    #[must_use]
    pub fn lines(&self) -> &[ScreenLine] {
        &self.lines[..self.height]
    }

    /// Index of the last row carrying text.
    #[must_use]
    pub fn lastline(&self) -> usize {
        self.lastline
    }

    /// The displayed byte range `[start, end]`.
    #[must_use]
    pub fn viewport(&self) -> ByteRange {
        ByteRange::new(self.start, self.end)
    }

    /// Columns a tab character expands to.
    #[must_use]
    pub fn tabwidth(&self) -> usize {
        self.tabwidth
    }

    /// Change the tab width and redraw.
    pub fn tabwidth_set(&mut self, tabwidth: usize) {
        self.tabwidth = tabwidth.max(1);
        self.draw();
    }

    /// Whether reaching end of file centers the viewport.
    #[must_use]
    pub fn eof_centering(&self) -> bool {
        self.eof_centering
    }

    /// Control the end-of-file policy of [`cursors_to`](View::cursors_to):
    /// when enabled (the default), moving the primary cursor to the end of
    /// the text while the end is off screen scrolls it to mid-screen
    /// instead of showing a nearly empty window.
    pub fn set_eof_centering(&mut self, enabled: bool) {
        self.eof_centering = enabled;
    }

    /// Select which symbol classes use their visible glyph.
    pub fn symbols_set(&mut self, flags: SymbolFlags) {
        let blank = symbols_blank();
        let visible = symbols_visible();
        for kind in SymbolKind::ALL {
            let i = kind as usize;
            self.symbols[i] = if flags.contains(SymbolFlags::for_kind(kind)) {
                match self.syntax.as_ref().and_then(|s| s.symbol(kind)) {
                    Some(symbol) => symbol.clone(),
                    None => visible[i].clone(),
                }
            } else {
                blank[i].clone()
            };
        }
        self.symbol_flags = flags;
    }

    /// The symbol classes currently rendered visibly.
    #[must_use]
    pub fn symbols(&self) -> SymbolFlags {
        self.symbol_flags
    }

    /// Attach or detach a syntax definition.
    ///
    /// Symbol overrides from the syntax take effect immediately; its style
    /// specifications are registered with the UI backend slot by slot.
    pub fn syntax_set(&mut self, syntax: Option<Syntax>) {
        self.syntax = syntax;
        let blank = symbols_blank();
        let mut flags = SymbolFlags::empty();
        for kind in SymbolKind::ALL {
            let i = kind as usize;
            match self.syntax.as_ref().and_then(|s| s.symbol(kind)) {
                Some(symbol) => {
                    self.symbols[i] = symbol.clone();
                    flags |= SymbolFlags::for_kind(kind);
                }
                None => self.symbols[i] = blank[i].clone(),
            }
        }
        self.symbol_flags = flags;
        if let (Some(syntax), Some(ui)) = (self.syntax.as_ref(), self.ui.as_mut()) {
            for (slot, spec) in syntax.styles().iter().enumerate() {
                let slot = u16::try_from(slot).unwrap_or(u16::MAX);
                ui.syntax_style(StyleId::new(slot), spec);
            }
        }
    }

    /// The attached syntax definition, if any.
    #[must_use]
    pub fn syntax(&self) -> Option<&Syntax> {
        self.syntax.as_ref()
    }

    /// Scroll down by `n` screen lines.
    ///
    /// Fails (returning `false`, without moving) once the end of the text
    /// is already visible.
    pub fn viewport_down(&mut self, n: usize) -> bool {
        if self.end == self.text_size() {
            return false;
        }
        if n >= self.height {
            self.start = self.end;
        } else {
            for row in 0..n {
                self.start += self.lines[row].len;
            }
        }
        trace!(start = self.start, "viewport down");
        self.draw();
        true
    }

    /// Scroll up by `n` screen lines.
    ///
    /// There is no line index to consult, so this scans the text backwards
    /// counting newlines, giving up after one window's worth of bytes so a
    /// file without newlines still scrolls. Fails at offset 0.
    pub fn viewport_up(&mut self, n: usize) -> bool {
        if self.start == 0 {
            return false;
        }
        let max = self.width * self.height;
        let off = {
            let text = Rc::clone(&self.text);
            let txt = text.borrow();
            let mut iter = txt.bytes_rev(self.start - 1);
            let Some(mut byte) = iter.next() else {
                return false;
            };
            let mut remaining = isize::try_from(n).unwrap_or(isize::MAX);
            let mut off = 0usize;
            // Skip a newline sitting immediately before the display area so
            // it is not counted as a scrolled line.
            if byte == b'\n'
                && let Some(prev) = iter.next()
            {
                off += 1;
                byte = prev;
            }
            if byte == b'\r'
                && let Some(prev) = iter.next()
            {
                off += 1;
                byte = prev;
            }
            loop {
                if byte == b'\n' {
                    remaining -= 1;
                    if remaining == 0 {
                        break;
                    }
                }
                off += 1;
                if off > max {
                    break;
                }
                match iter.next() {
                    Some(prev) => byte = prev,
                    None => break,
                }
            }
            if byte == b'\r' {
                off += 1;
            }
            off
        };
        self.start = self.start.saturating_sub(off);
        trace!(start = self.start, "viewport up");
        self.draw();
        true
    }

    /// Redraw with the primary cursor's line as the first row.
    pub fn redraw_top(&mut self) {
        let row = self.primary_row();
        for r in 0..row {
            self.start += self.lines[r].len;
        }
        self.draw();
        let pos = self.primary_pos_cached();
        self.cursors_to(self.primary, pos);
    }

    /// Redraw with the primary cursor's line centered.
    ///
    /// Two passes, because sliding the viewport changes soft wrap and with
    /// it the cursor's row.
    pub fn redraw_center(&mut self) {
        let center = self.height / 2;
        let pos = self.primary_pos_cached();
        for _ in 0..2 {
            let row = self.primary_row();
            if row < center {
                self.slide_down(center - row);
                continue;
            }
            let mut excess = row - center;
            let mut r = 0;
            while excess > 0 {
                self.start += self.lines[r].len;
                r += 1;
                excess -= 1;
            }
            break;
        }
        self.draw();
        self.cursors_to(self.primary, pos);
    }

    /// Redraw with the primary cursor's line as the last row.
    pub fn redraw_bottom(&mut self) {
        let row = self.primary_row();
        if row == self.lastline {
            return;
        }
        let pos = self.primary_pos_cached();
        self.slide_down(self.height - row - 1);
        self.cursors_to(self.primary, pos);
    }

    /// Slide the viewport down `n` rows. The cursor keeps its position
    /// when still visible and is pinned to the top row, keeping its
    /// column, when it falls off. Returns the primary cursor position.
    pub fn slide_up(&mut self, n: usize) -> usize {
        let id = self.primary;
        let col = self.primary_col();
        if self.viewport_down(n) {
            if self.primary_pos_cached() < self.start || self.primary_row() == 0 {
                self.cursors_place(id, 0, col);
            } else {
                let pos = self.primary_pos_cached();
                self.cursors_to(id, pos);
            }
        } else {
            self.screenline_down(id);
        }
        self.primary_pos_cached()
    }

    /// Slide the viewport up `n` rows; the mirror of
    /// [`slide_up`](View::slide_up), pinning to the last text row.
    pub fn slide_down(&mut self, n: usize) -> usize {
        let id = self.primary;
        let col = self.primary_col();
        if self.viewport_up(n) {
            if self.primary_pos_cached() > self.end || self.primary_row() == self.lastline {
                let row = self.lastline;
                self.cursors_place(id, row, col);
            } else {
                let pos = self.primary_pos_cached();
                self.cursors_to(id, pos);
            }
        } else {
            self.screenline_up(id);
        }
        self.primary_pos_cached()
    }

    /// Scroll the view up `n` lines, dragging the cursor along the bottom
    /// edge when it would leave the viewport. At the top of the text the
    /// cursor moves to offset 0 instead. Returns the primary cursor
    /// position.
    pub fn scroll_up(&mut self, n: usize) -> usize {
        let id = self.primary;
        let col = self.primary_col();
        if self.viewport_up(n) {
            let row = if self.primary_pos_cached() > self.end {
                self.lastline
            } else {
                self.primary_row().min(self.lastline)
            };
            self.cursors_place(id, row, col);
        } else {
            self.cursors_to(id, 0);
        }
        self.primary_pos_cached()
    }

    /// Scroll the view down `n` lines, dragging the cursor along the top
    /// edge. At the end of the text the cursor moves to the last offset
    /// instead. Returns the primary cursor position.
    pub fn scroll_down(&mut self, n: usize) -> usize {
        let id = self.primary;
        let col = self.primary_col();
        if self.viewport_down(n) {
            let row = if self.primary_pos_cached() < self.start {
                0
            } else {
                self.primary_row()
            };
            self.cursors_place(id, row, col);
        } else {
            let size = self.text_size();
            self.cursors_to(id, size);
        }
        self.primary_pos_cached()
    }

    /// Move the primary cursor to `pos`, scrolling as needed.
    pub fn cursor_to(&mut self, pos: usize) {
        self.cursors_to(self.primary, pos);
    }

    /// Scroll the viewport row by row until `pos` is visible, then place
    /// the primary cursor there.
    pub fn scroll_to(&mut self, pos: usize) {
        self.cursors_scroll_to(self.primary, pos);
    }

    /// Current position of the primary cursor, `None` when its mark no
    /// longer resolves.
    #[must_use]
    pub fn cursor_pos(&self) -> Option<usize> {
        self.cursors_pos(self.primary)
    }

    /// Byte offset at the start of the `n`-th displayed row (1-based).
    #[must_use]
    pub fn screenline_goto(&self, n: usize) -> usize {
        let mut pos = self.start;
        let mut remaining = n;
        let mut row = 0;
        while remaining > 1 && row != self.lastline {
            pos += self.lines[row].len;
            row += 1;
            remaining -= 1;
        }
        pos
    }

    pub(crate) fn text_size(&self) -> usize {
        self.text.borrow().size()
    }

    pub(crate) fn primary_row(&self) -> usize {
        self.cursor_ref(self.primary)
            .and_then(|c| c.line)
            .unwrap_or(0)
    }

    pub(crate) fn primary_col(&self) -> usize {
        self.cursor_ref(self.primary).map_or(0, |c| c.col)
    }

    pub(crate) fn primary_pos_cached(&self) -> usize {
        self.cursor_ref(self.primary).map_or(0, |c| c.pos)
    }
}
