#![forbid(unsafe_code)]

//! Cursors: positions that follow the text and the screen.
//!
//! Every cursor is a bundle of a buffer mark (the authoritative position),
//! cached grid projections valid after each draw, a remembered column for
//! vertical motion, an optional owning selection, and a private register.
//!
//! Cursors are owned by the view and addressed by [`CursorId`]. All
//! movement funnels through one write point, `cursors_to` /
//! `cursors_place`, which rebinds the mark, updates the attached
//! selection's endpoints and reprojects onto the grid.

use std::rc::Rc;

use sable_text::{Mark, TextBuffer};

use crate::selection::SelectionId;
use crate::view::View;

/// Stable handle for a cursor owned by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(pub(crate) u64);

/// Per-cursor clipboard slot for yank and put operations.
#[derive(Debug, Clone, Default)]
pub struct Register {
    value: Option<String>,
}

impl Register {
    /// Store text, replacing the previous content.
    pub fn put(&mut self, text: impl Into<String>) {
        self.value = Some(text.into());
    }

    /// The stored text, if any.
    #[must_use]
    pub fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Take the stored text out, leaving the register empty.
    pub fn take(&mut self) -> Option<String> {
        self.value.take()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

/// Primary-cursor position as 1-based line and visual column, summing the
/// widths of preceding soft-wrap rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPos {
    /// 1-based source line number.
    pub line: usize,
    /// 1-based visual column within the logical line.
    pub col: usize,
}

/// One cursor. `mark` is authoritative; `pos`, `row`, `col` and `line` are
/// projections refreshed by each draw.
#[derive(Debug)]
pub(crate) struct Cursor {
    pub(crate) id: CursorId,
    pub(crate) pos: usize,
    pub(crate) row: usize,
    pub(crate) col: usize,
    /// Column of the most recent explicit horizontal motion; 0 when unset.
    /// Vertical motion over shorter lines must not erode it.
    pub(crate) lastcol: usize,
    /// Grid row of the cursor, `None` while not visible.
    pub(crate) line: Option<usize>,
    pub(crate) mark: Option<Mark>,
    pub(crate) sel: Option<SelectionId>,
    pub(crate) lastsel_anchor: Option<Mark>,
    pub(crate) lastsel_cursor: Option<Mark>,
    pub(crate) reg: Register,
}

impl<T: TextBuffer> View<T> {
    /// Create a cursor and make it the primary one.
    pub fn cursors_new(&mut self) -> CursorId {
        let id = CursorId(self.next_cursor_id);
        self.next_cursor_id += 1;
        self.cursors.push(Cursor {
            id,
            pos: 0,
            row: 0,
            col: 0,
            lastcol: 0,
            line: None,
            mark: None,
            sel: None,
            lastsel_anchor: None,
            lastsel_cursor: None,
            reg: Register::default(),
        });
        self.primary = id;
        id
    }

    /// Number of live cursors. Always at least 1.
    #[must_use]
    pub fn cursors_count(&self) -> usize {
        self.cursors.len()
    }

    /// Handles of all live cursors, oldest first.
    #[must_use]
    pub fn cursor_ids(&self) -> Vec<CursorId> {
        self.cursors.iter().map(|c| c.id).collect()
    }

    /// The primary cursor.
    #[must_use]
    pub fn cursors_primary(&self) -> CursorId {
        self.primary
    }

    /// Remove a cursor, freeing its selection.
    ///
    /// The last remaining cursor cannot be disposed; `false` is returned
    /// and nothing changes. A disposed primary hands the role to a
    /// neighbor.
    pub fn cursors_dispose(&mut self, id: CursorId) -> bool {
        if self.cursors.len() <= 1 {
            return false;
        }
        let Some(idx) = self.cursor_index(id) else {
            return false;
        };
        if let Some(sid) = self.cursors[idx].sel {
            self.selections_free(sid);
        }
        let successor = if idx > 0 {
            self.cursors[idx - 1].id
        } else {
            self.cursors[idx + 1].id
        };
        self.cursors.remove(idx);
        if self.primary == id {
            self.primary = successor;
        }
        self.draw();
        true
    }

    /// Dispose every cursor except the primary one.
    pub fn cursors_clear(&mut self) {
        let primary = self.primary;
        let stale: Vec<SelectionId> = self
            .cursors
            .iter()
            .filter(|c| c.id != primary)
            .filter_map(|c| c.sel)
            .collect();
        for sid in stale {
            self.selections_free(sid);
        }
        self.cursors.retain(|c| c.id == primary);
        self.draw();
    }

    /// Resolve a cursor's mark to its current byte position.
    #[must_use]
    pub fn cursors_pos(&self, id: CursorId) -> Option<usize> {
        let cursor = self.cursor_ref(id)?;
        let mark = cursor.mark?;
        self.text.borrow().mark_get(mark)
    }

    /// Cached grid coordinates `(row, col)` of a cursor, `None` while it
    /// is not projected onto the grid.
    #[must_use]
    pub fn cursors_coord(&self, id: CursorId) -> Option<(usize, usize)> {
        let cursor = self.cursor_ref(id)?;
        cursor.line.map(|row| (row, cursor.col))
    }

    /// Access a cursor's private register.
    pub fn cursors_register(&mut self, id: CursorId) -> Option<&mut Register> {
        let idx = self.cursor_index(id)?;
        Some(&mut self.cursors[idx].reg)
    }

    /// Move a cursor to `pos`.
    ///
    /// For the primary cursor the viewport follows: a target outside the
    /// window redraws starting at the target's line, or at the target
    /// itself when that line alone is wider than the window. Moving to the
    /// end of the text while the end is off screen centers it (see
    /// [`set_eof_centering`](View::set_eof_centering)).
    pub fn cursors_to(&mut self, id: CursorId, pos: usize) {
        let size = self.text_size();
        let pos = pos.min(size);
        if self.primary == id {
            {
                let text = Rc::clone(&self.text);
                let txt = text.borrow();
                if let Some(idx) = self.cursor_index(id) {
                    self.cursors[idx].mark = Some(txt.mark_set(pos));
                }
            }
            if pos == size && self.end != size && self.eof_centering {
                // Do not show a nearly empty window for the end of file.
                self.start = pos;
                let half = self.height / 2;
                self.viewport_up(half);
            } else {
                for attempt in 0..2 {
                    if pos < self.start || pos > self.end {
                        self.start = if attempt == 0 {
                            self.text.borrow().line_begin(pos)
                        } else {
                            pos
                        };
                        self.draw();
                    }
                }
            }
        }
        self.cursor_commit(id, pos);
    }

    /// Step the viewport one line at a time until `pos` is visible, then
    /// move the cursor there.
    pub fn cursors_scroll_to(&mut self, id: CursorId, pos: usize) {
        if self.primary == id {
            while pos < self.start && self.viewport_up(1) {}
            while pos > self.end && self.viewport_down(1) {}
        }
        self.cursors_to(id, pos);
    }

    /// Place a cursor at screen coordinates, snapping left over columns
    /// occupied by a wide glyph and right over tab cells. This is the sole
    /// screen-to-text mapper; returns the resulting byte position.
    pub fn cursors_place(&mut self, id: CursorId, row: usize, col: usize) -> usize {
        let row = row.min(self.height - 1);
        let mut pos = self.start;
        for r in 0..row {
            pos += self.lines[r].len;
        }
        let line = &self.lines[row];
        let mut col = col.min(self.width.saturating_sub(1));
        while col > 0 && line.cells[col].len() == 0 {
            col -= 1;
        }
        while col < line.width && line.cells[col].is_tab() {
            col += 1;
        }
        for cell in &line.cells[..col] {
            pos += cell.len();
        }
        if let Some(idx) = self.cursor_index(id) {
            let cursor = &mut self.cursors[idx];
            cursor.col = col;
            cursor.row = row;
            cursor.line = Some(row);
        }
        self.cursor_commit(id, pos);
        pos
    }

    /// Move up one screen line, restoring the remembered column.
    ///
    /// At the top row the view scrolls up one line first. Returns the
    /// resulting position.
    pub fn screenline_up(&mut self, id: CursorId) -> usize {
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        if self.cursors[idx].line.is_none() {
            return self.cursors[idx].pos;
        }
        let mut lastcol = self.cursors[idx].lastcol;
        if lastcol == 0 {
            lastcol = self.cursors[idx].col;
        }
        if self.cursors[idx].line == Some(0) {
            self.scroll_up(1);
        }
        if let Some(idx) = self.cursor_index(id)
            && let Some(row) = self.cursors[idx].line
            && row > 0
        {
            self.cursors_place(id, row - 1, lastcol);
        }
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        self.cursors[idx].lastcol = lastcol;
        self.cursors[idx].pos
    }

    /// Move down one screen line, restoring the remembered column.
    ///
    /// At the bottom row the view scrolls down one line first. Returns the
    /// resulting position.
    pub fn screenline_down(&mut self, id: CursorId) -> usize {
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        if self.cursors[idx].line.is_none() {
            return self.cursors[idx].pos;
        }
        let mut lastcol = self.cursors[idx].lastcol;
        if lastcol == 0 {
            lastcol = self.cursors[idx].col;
        }
        if self.cursors[idx].line == Some(self.height - 1) {
            self.scroll_down(1);
        }
        if let Some(idx) = self.cursor_index(id)
            && let Some(row) = self.cursors[idx].line
            && row + 1 < self.height
        {
            self.cursors_place(id, row + 1, lastcol);
        }
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        self.cursors[idx].lastcol = lastcol;
        self.cursors[idx].pos
    }

    /// Move to the previous logical line.
    ///
    /// When the neighborhood is free of soft wrap this equals a screen
    /// line motion and stays on the grid; otherwise the buffer supplies
    /// the target offset.
    pub fn line_up(&mut self, id: CursorId) -> usize {
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        if let Some(row) = self.cursors[idx].line
            && row >= 2
            && self.lines[row].lineno != self.lines[row - 1].lineno
            && self.lines[row - 1].lineno != self.lines[row - 2].lineno
        {
            return self.screenline_up(id);
        }
        let pos = {
            let current = self.cursors[idx].pos;
            self.text.borrow().line_up(current)
        };
        self.cursors_to(id, pos);
        pos
    }

    /// Move to the next logical line; the mirror of
    /// [`line_up`](View::line_up).
    pub fn line_down(&mut self, id: CursorId) -> usize {
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        if let Some(row) = self.cursors[idx].line
            && (row + 1 >= self.height || self.lines[row + 1].lineno != self.lines[row].lineno)
        {
            return self.screenline_down(id);
        }
        let pos = {
            let current = self.cursors[idx].pos;
            self.text.borrow().line_down(current)
        };
        self.cursors_to(id, pos);
        pos
    }

    /// Move to the first column of the cursor's screen line.
    pub fn screenline_begin(&mut self, id: CursorId) -> usize {
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        match self.cursors[idx].line {
            Some(row) => self.cursors_place(id, row, 0),
            None => self.cursors[idx].pos,
        }
    }

    /// Move to the middle column of the cursor's screen line.
    pub fn screenline_middle(&mut self, id: CursorId) -> usize {
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        match self.cursors[idx].line {
            Some(row) => {
                let col = self.lines[row].width / 2;
                self.cursors_place(id, row, col)
            }
            None => self.cursors[idx].pos,
        }
    }

    /// Move to the last used column of the cursor's screen line.
    pub fn screenline_end(&mut self, id: CursorId) -> usize {
        let Some(idx) = self.cursor_index(id) else {
            return 0;
        };
        match self.cursors[idx].line {
            Some(row) => {
                let col = self.lines[row].width.saturating_sub(1);
                self.cursors_place(id, row, col)
            }
            None => self.cursors[idx].pos,
        }
    }

    /// 1-based line and visual column of the primary cursor, accumulating
    /// the widths of preceding soft-wrap rows.
    #[must_use]
    pub fn cursor_getpos(&self) -> CursorPos {
        let (mut row, mut col) = self
            .cursor_ref(self.primary)
            .map_or((0, 0), |c| (c.line.unwrap_or(0), c.col));
        let lineno = self.lines[row].lineno;
        while row > 0 && self.lines[row - 1].lineno == lineno {
            row -= 1;
            col += self.lines[row].width;
        }
        CursorPos {
            line: lineno,
            col: col + 1,
        }
    }

    /// The single write point for a cursor position: rebind the mark,
    /// update the owning selection and reproject onto the grid.
    pub(crate) fn cursor_commit(&mut self, id: CursorId, pos: usize) {
        let text = Rc::clone(&self.text);
        let txt = text.borrow();
        let pos = pos.min(txt.size());
        let Some(idx) = self.cursor_index(id) else {
            return;
        };
        let mark = txt.mark_set(pos);
        {
            let cursor = &mut self.cursors[idx];
            cursor.mark = Some(mark);
            if pos != cursor.pos {
                // An explicit motion resets the remembered column.
                cursor.lastcol = 0;
            }
            cursor.pos = pos;
        }

        if let Some(sid) = self.cursors[idx].sel
            && let Some(sidx) = self.selection_index(sid)
        {
            let anchor = self.selections[sidx].anchor.and_then(|m| txt.mark_get(m));
            let head = self.selections[sidx].cursor.and_then(|m| txt.mark_get(m));
            if let (Some(mut anchor), Some(head)) = (anchor, head) {
                if pos < anchor && anchor < head {
                    // Rightward extension crossing the anchor flips to
                    // leftward; keep the originally covered character
                    // inside.
                    anchor = txt.char_next(anchor);
                    self.selections[sidx].anchor = Some(txt.mark_set(anchor));
                } else if head < anchor && anchor <= pos {
                    // Leftward extension flips to rightward.
                    anchor = txt.char_prev(anchor);
                    self.selections[sidx].anchor = Some(txt.mark_set(anchor));
                }
                let mut new_head = pos;
                if anchor <= new_head {
                    // Rightward: the glyph under the cursor is included.
                    new_head = txt.char_next(new_head);
                }
                self.selections[sidx].cursor = Some(txt.mark_set(new_head));
            }
        }
        drop(txt);

        match self.coord_get(pos) {
            Some((row, col)) => {
                let cursor = &mut self.cursors[idx];
                cursor.line = Some(row);
                cursor.row = row;
                cursor.col = col;
                self.draw();
            }
            None => {
                if self.primary == id {
                    let cursor = &mut self.cursors[idx];
                    cursor.line = Some(0);
                    cursor.row = 0;
                    cursor.col = 0;
                } else {
                    self.cursors[idx].line = None;
                }
            }
        }
    }

    pub(crate) fn cursor_index(&self, id: CursorId) -> Option<usize> {
        self.cursors.iter().position(|c| c.id == id)
    }

    pub(crate) fn cursor_ref(&self, id: CursorId) -> Option<&Cursor> {
        self.cursors.iter().find(|c| c.id == id)
    }
}
