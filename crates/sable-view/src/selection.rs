#![forbid(unsafe_code)]

//! Selections: anchored ranges that follow the text.
//!
//! A selection is a pair of marks. Their order encodes direction: with
//! `anchor <= cursor` the selection extends rightward and the owning
//! cursor sits one character before the `cursor` mark; reversed, it
//! extends leftward and the cursor sits exactly on it.
//!
//! Selections are stored in the view's selection set so the draw pass can
//! paint all of them; a cursor references at most one by id. Freeing a
//! selection stashes its endpoints on the referencing cursor so
//! [`selection_restore`](crate::View::selection_restore) can rebuild it.

use std::rc::Rc;

use sable_text::{ByteRange, Mark, TextBuffer};

use crate::cursor::CursorId;
use crate::view::View;

/// Stable handle for a selection owned by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionId(pub(crate) u64);

/// One selection: two marks whose order encodes direction.
#[derive(Debug)]
pub(crate) struct Selection {
    pub(crate) id: SelectionId,
    pub(crate) anchor: Option<Mark>,
    pub(crate) cursor: Option<Mark>,
}

impl<T: TextBuffer> View<T> {
    /// Create a detached, endpoint-less selection.
    pub fn selections_new(&mut self) -> SelectionId {
        let id = SelectionId(self.next_selection_id);
        self.next_selection_id += 1;
        self.selections.push(Selection {
            id,
            anchor: None,
            cursor: None,
        });
        id
    }

    /// Number of live selections.
    #[must_use]
    pub fn selections_count(&self) -> usize {
        self.selections.len()
    }

    /// Handles of all live selections, oldest first.
    #[must_use]
    pub fn selection_ids(&self) -> Vec<SelectionId> {
        self.selections.iter().map(|s| s.id).collect()
    }

    /// Free a selection. Cursors referencing it keep its endpoints for a
    /// later restore.
    pub fn selections_free(&mut self, sid: SelectionId) {
        let Some(idx) = self.selection_index(sid) else {
            return;
        };
        let sel = self.selections.remove(idx);
        for cursor in &mut self.cursors {
            if cursor.sel == Some(sid) {
                cursor.lastsel_anchor = sel.anchor;
                cursor.lastsel_cursor = sel.cursor;
                cursor.sel = None;
            }
        }
    }

    /// Free every selection and redraw.
    pub fn selections_clear(&mut self) {
        while let Some(sel) = self.selections.last() {
            let sid = sel.id;
            self.selections_free(sid);
        }
        self.draw();
    }

    /// The ordered byte range of a selection, `None` when either endpoint
    /// mark is dead.
    #[must_use]
    pub fn selections_get(&self, sid: SelectionId) -> Option<ByteRange> {
        let idx = self.selection_index(sid)?;
        let sel = &self.selections[idx];
        let txt = self.text.borrow();
        ByteRange::from_endpoints(
            sel.anchor.and_then(|m| txt.mark_get(m)),
            sel.cursor.and_then(|m| txt.mark_get(m)),
        )
    }

    /// Cover `range` with a selection, preserving its current direction:
    /// a leftward selection maps `range.end` to the anchor, a rightward
    /// one maps `range.start` there.
    pub fn selections_set(&mut self, sid: SelectionId, range: ByteRange) {
        let Some(idx) = self.selection_index(sid) else {
            return;
        };
        {
            let text = Rc::clone(&self.text);
            let txt = text.borrow();
            let anchor = self.selections[idx].anchor.and_then(|m| txt.mark_get(m));
            let head = self.selections[idx].cursor.and_then(|m| txt.mark_get(m));
            let left_extending = matches!((anchor, head), (Some(a), Some(h)) if h < a);
            let (anchor_pos, head_pos) = if left_extending {
                (range.end, range.start)
            } else {
                (range.start, range.end)
            };
            self.selections[idx].anchor = Some(txt.mark_set(anchor_pos));
            self.selections[idx].cursor = Some(txt.mark_set(head_pos));
        }
        self.draw();
    }

    /// Exchange a selection's endpoints without syncing any cursor.
    pub fn selections_swap(&mut self, sid: SelectionId) {
        if let Some(idx) = self.selection_index(sid) {
            let sel = &mut self.selections[idx];
            std::mem::swap(&mut sel.anchor, &mut sel.cursor);
        }
    }

    /// Begin a one-character rightward selection at the cursor.
    ///
    /// No-op when the cursor already owns a selection or its position is
    /// unknown.
    pub fn selection_start(&mut self, id: CursorId) {
        let Some(idx) = self.cursor_index(id) else {
            return;
        };
        if self.cursors[idx].sel.is_some() {
            return;
        }
        let Some(pos) = self.cursors_pos(id) else {
            return;
        };
        let sid = self.selections_new();
        {
            let text = Rc::clone(&self.text);
            let txt = text.borrow();
            if let Some(sidx) = self.selection_index(sid) {
                self.selections[sidx].anchor = Some(txt.mark_set(pos));
                self.selections[sidx].cursor = Some(txt.mark_set(txt.char_next(pos)));
            }
        }
        if let Some(idx) = self.cursor_index(id) {
            self.cursors[idx].sel = Some(sid);
        }
        self.draw();
    }

    /// Rebuild the cursor's previous selection from the endpoints stashed
    /// when it was freed.
    pub fn selection_restore(&mut self, id: CursorId) {
        let Some(idx) = self.cursor_index(id) else {
            return;
        };
        if self.cursors[idx].sel.is_some() {
            return;
        }
        let range = {
            let txt = self.text.borrow();
            ByteRange::from_endpoints(
                self.cursors[idx].lastsel_anchor.and_then(|m| txt.mark_get(m)),
                self.cursors[idx].lastsel_cursor.and_then(|m| txt.mark_get(m)),
            )
        };
        let Some(range) = range else {
            return;
        };
        let sid = self.selections_new();
        if let Some(idx) = self.cursor_index(id) {
            self.cursors[idx].sel = Some(sid);
        }
        self.selections_set(sid, range);
        self.selection_sync(id);
        self.draw();
    }

    /// Detach the cursor from its selection without freeing it.
    pub fn selection_stop(&mut self, id: CursorId) {
        if let Some(idx) = self.cursor_index(id) {
            self.cursors[idx].sel = None;
        }
    }

    /// Free the cursor's selection and redraw.
    pub fn selection_clear(&mut self, id: CursorId) {
        let sid = self.cursor_ref(id).and_then(|c| c.sel);
        if let Some(sid) = sid {
            self.selections_free(sid);
        }
        self.draw();
    }

    /// Swap the endpoints of the cursor's selection and move the cursor to
    /// the new cursor end.
    pub fn selection_swap(&mut self, id: CursorId) {
        let Some(sid) = self.cursor_ref(id).and_then(|c| c.sel) else {
            return;
        };
        self.selections_swap(sid);
        self.selection_sync(id);
    }

    /// Move the owning cursor to its selection's cursor end. A rightward
    /// selection puts the cursor on the last selected character.
    pub fn selection_sync(&mut self, id: CursorId) {
        let Some(sid) = self.cursor_ref(id).and_then(|c| c.sel) else {
            return;
        };
        let Some(sidx) = self.selection_index(sid) else {
            return;
        };
        let target = {
            let txt = self.text.borrow();
            let anchor = self.selections[sidx].anchor.and_then(|m| txt.mark_get(m));
            let head = self.selections[sidx].cursor.and_then(|m| txt.mark_get(m));
            match (anchor, head) {
                (Some(anchor), Some(head)) if anchor < head => Some(txt.char_prev(head)),
                (Some(_), Some(head)) => Some(head),
                _ => None,
            }
        };
        if let Some(target) = target {
            self.cursors_to(id, target);
        }
    }

    /// The ordered range of the cursor's selection.
    #[must_use]
    pub fn selection_get(&self, id: CursorId) -> Option<ByteRange> {
        let sid = self.cursor_ref(id).and_then(|c| c.sel)?;
        self.selections_get(sid)
    }

    /// Cover `range` with the cursor's selection, creating one when the
    /// cursor has none.
    pub fn selection_set(&mut self, id: CursorId, range: ByteRange) {
        let Some(idx) = self.cursor_index(id) else {
            return;
        };
        let sid = match self.cursors[idx].sel {
            Some(sid) => sid,
            None => {
                let sid = self.selections_new();
                if let Some(idx) = self.cursor_index(id) {
                    self.cursors[idx].sel = Some(sid);
                }
                sid
            }
        };
        self.selections_set(sid, range);
    }

    pub(crate) fn selection_index(&self, sid: SelectionId) -> Option<usize> {
        self.selections.iter().position(|s| s.id == sid)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use sable_text::{Buffer, ByteRange};

    use crate::view::View;

    fn view_of(text: &str, width: usize, height: usize) -> View<Buffer> {
        let buf = Rc::new(RefCell::new(Buffer::from(text)));
        let mut view = View::new(buf);
        view.resize(width, height);
        view
    }

    // ====== Start, stop, clear ======

    #[test]
    fn start_creates_one_character_rightward_selection() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 2);
        view.selection_start(id);
        assert_eq!(view.selection_get(id), Some(ByteRange::new(2, 3)));
        assert_eq!(view.selections_count(), 1);
    }

    #[test]
    fn start_is_idempotent() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.selection_start(id);
        view.selection_start(id);
        assert_eq!(view.selections_count(), 1);
    }

    #[test]
    fn stop_detaches_without_freeing() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.selection_start(id);
        view.selection_stop(id);
        assert_eq!(view.selection_get(id), None);
        assert_eq!(view.selections_count(), 1);
    }

    #[test]
    fn clear_frees_the_selection() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.selection_start(id);
        view.selection_clear(id);
        assert_eq!(view.selection_get(id), None);
        assert_eq!(view.selections_count(), 0);
    }

    // ====== Extension and orientation ======

    #[test]
    fn rightward_motion_extends_past_the_cursor() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 2);
        view.selection_start(id);
        view.cursors_to(id, 4);
        // The glyph under the cursor is included.
        assert_eq!(view.selection_get(id), Some(ByteRange::new(2, 5)));
    }

    #[test]
    fn crossing_the_anchor_flips_orientation() {
        let mut view = view_of("abcdefgh", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 5);
        view.selection_start(id);
        assert_eq!(view.selection_get(id), Some(ByteRange::new(5, 6)));
        view.cursors_to(id, 2);
        // The anchor steps right so the originally covered character
        // remains selected.
        assert_eq!(view.selection_get(id), Some(ByteRange::new(2, 6)));
    }

    #[test]
    fn flipping_back_rightward_restores_inclusion() {
        let mut view = view_of("abcdefgh", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 5);
        view.selection_start(id);
        view.cursors_to(id, 2);
        view.cursors_to(id, 7);
        // Left extension flipped back: anchor returns beside its origin.
        assert_eq!(view.selection_get(id), Some(ByteRange::new(5, 8)));
    }

    // ====== Swap and sync ======

    #[test]
    fn swap_moves_cursor_to_other_end() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 2);
        view.selection_start(id);
        view.cursors_to(id, 4);
        assert_eq!(view.cursor_pos(), Some(4));
        view.selection_swap(id);
        assert_eq!(view.cursor_pos(), Some(2));
        assert_eq!(view.selection_get(id), Some(ByteRange::new(2, 5)));
    }

    #[test]
    fn double_swap_is_identity() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 2);
        view.selection_start(id);
        view.cursors_to(id, 4);
        let range = view.selection_get(id);
        let pos = view.cursor_pos();
        view.selection_swap(id);
        view.selection_swap(id);
        assert_eq!(view.selection_get(id), range);
        assert_eq!(view.cursor_pos(), pos);
    }

    // ====== Set and restore ======

    #[test]
    fn set_preserves_direction() {
        let mut view = view_of("abcdefgh", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 5);
        view.selection_start(id);
        view.cursors_to(id, 2); // leftward now
        view.selection_set(id, ByteRange::new(1, 4));
        view.selection_sync(id);
        // Still leftward: the cursor sits at the start.
        assert_eq!(view.cursor_pos(), Some(1));
        assert_eq!(view.selection_get(id), Some(ByteRange::new(1, 4)));
    }

    #[test]
    fn set_creates_selection_when_missing() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.selection_set(id, ByteRange::new(1, 3));
        assert_eq!(view.selection_get(id), Some(ByteRange::new(1, 3)));
    }

    #[test]
    fn restore_rebuilds_from_stashed_endpoints() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 2);
        view.selection_start(id);
        view.cursors_to(id, 4);
        view.selection_clear(id);
        assert_eq!(view.selections_count(), 0);
        view.selection_restore(id);
        assert_eq!(view.selection_get(id), Some(ByteRange::new(2, 5)));
        assert_eq!(view.cursor_pos(), Some(4));
    }

    #[test]
    fn restore_is_noop_after_text_vanished() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 2);
        view.selection_start(id);
        view.selection_clear(id);
        view.text().borrow_mut().delete(0, 6);
        view.selection_restore(id);
        assert_eq!(view.selections_count(), 0);
    }

    #[test]
    fn selections_clear_drops_everything() {
        let mut view = view_of("abcdef", 10, 2);
        let first = view.cursors_primary();
        view.selection_start(first);
        let second = view.cursors_new();
        view.cursors_to(second, 3);
        view.selection_start(second);
        assert_eq!(view.selections_count(), 2);
        view.selections_clear();
        assert_eq!(view.selections_count(), 0);
        assert_eq!(view.selection_get(first), None);
        assert_eq!(view.selection_get(second), None);
    }

    // ====== Drawing ======

    #[test]
    fn selected_cells_are_flagged() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 1);
        view.selection_start(id);
        view.cursors_to(id, 3);
        let line = &view.lines()[0];
        for col in 0..6 {
            let selected = line.cell(col).unwrap().is_selected();
            assert_eq!(selected, (1..=3).contains(&col), "column {col}");
        }
    }

    #[test]
    fn dead_marks_make_selection_invisible() {
        let mut view = view_of("abcdef", 10, 2);
        let id = view.cursors_primary();
        view.cursors_to(id, 2);
        view.selection_start(id);
        view.text().borrow_mut().delete(1, 4);
        view.draw();
        assert_eq!(view.selection_get(id), None);
        assert!(view.lines()[0].cells().iter().all(|c| !c.is_selected()));
    }
}
