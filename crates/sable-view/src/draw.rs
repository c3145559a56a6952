#![forbid(unsafe_code)]

//! The draw pipeline: text bytes in, cell grid out.
//!
//! [`View::draw`] is the only writer of the grid. One pass reads a window
//! of bytes from the buffer, decodes UTF-8 incrementally, expands tabs,
//! newlines, controls and wide glyphs into cells, applies syntax styles
//! from cached regex matches, and finally projects selections and cursors
//! onto the finished rows.
//!
//! Cost per pass is `O(width * height + rules * regex)`.

use std::rc::Rc;

use unicode_width::UnicodeWidthChar;

use sable_text::{ByteRange, TextBuffer};

use crate::cell::{Cell, CellFlags, StyleId};
use crate::logging::trace;
use crate::syntax::SymbolKind;
use crate::view::View;

/// Outcome of decoding one character from the byte window.
enum Decode {
    /// A scalar value and the bytes it occupies.
    Char(char, usize),
    /// An invalid sequence; skip this many bytes and show U+FFFD.
    Invalid(usize),
    /// The window ends in the middle of a sequence.
    Incomplete,
}

/// Decode the first character of `bytes`.
fn decode(bytes: &[u8]) -> Decode {
    debug_assert!(!bytes.is_empty());
    let prefix = &bytes[..bytes.len().min(4)];
    match std::str::from_utf8(prefix) {
        Ok(s) => match s.chars().next() {
            Some(ch) => Decode::Char(ch, ch.len_utf8()),
            None => Decode::Invalid(1),
        },
        Err(err) if err.valid_up_to() > 0 => {
            let valid = &prefix[..err.valid_up_to()];
            match std::str::from_utf8(valid).ok().and_then(|s| s.chars().next()) {
                Some(ch) => Decode::Char(ch, ch.len_utf8()),
                None => Decode::Invalid(1),
            }
        }
        Err(err) if err.error_len().is_none() => Decode::Incomplete,
        Err(_) => Decode::Invalid(skip_malformed(bytes)),
    }
}

/// Bytes to skip past an invalid sequence: the offending byte plus any
/// continuation bytes up to the next leading byte.
fn skip_malformed(bytes: &[u8]) -> usize {
    let mut skip = 1;
    while skip < bytes.len() && bytes[skip] & 0xC0 == 0x80 {
        skip += 1;
    }
    skip
}

/// Most recent match of one syntax rule over the byte window.
#[derive(Clone, Copy)]
enum RuleMatch {
    /// Last known match at `[start, end)`; `0..0` before the first search.
    Pending { start: usize, end: usize },
    /// The rule has no further match in this window.
    Exhausted,
}

impl<T: TextBuffer> View<T> {
    /// Redraw the whole viewport from `start`, updating `end` and the
    /// screen-line chain, then hand the grid to the UI backend.
    pub fn draw(&mut self) {
        self.grid_reset();
        let text = Rc::clone(&self.text);
        let txt = text.borrow();

        let window_len = self.width * self.height;
        let mut window = vec![0u8; window_len];
        let mut filled = txt.bytes_get(self.start, &mut window);
        // Absolute offset of the next unconsumed byte.
        let mut pos = self.start;
        // Its offset inside the window.
        let mut off = 0usize;

        let rule_count = self.syntax.as_ref().map_or(0, |s| s.rules().len());
        let mut matches = vec![RuleMatch::Pending { start: 0, end: 0 }; rule_count];
        let mut matched: Option<usize> = None;
        let mut style = StyleId::DEFAULT;

        while off < filled {
            if let Some(syntax) = self.syntax.as_ref() {
                if let Some(idx) = matched
                    && let RuleMatch::Pending { end, .. } = matches[idx]
                    && off >= end
                {
                    // Past the applied match; forget it and re-arm every
                    // cached match overlapping the consumed region.
                    matched = None;
                    style = StyleId::DEFAULT;
                    for m in &mut matches {
                        if let RuleMatch::Pending { start, end } = *m
                            && start <= off
                            && off < end
                        {
                            *m = RuleMatch::Pending { start: 0, end: 0 };
                        }
                    }
                }

                if matched.is_none() {
                    for (idx, rule) in syntax.rules().iter().enumerate() {
                        match matches[idx] {
                            RuleMatch::Exhausted => continue,
                            RuleMatch::Pending { end, .. } if off >= end => {
                                // The cached match is behind; search again
                                // from the current position. Zero-length
                                // matches are discarded so they cannot pin
                                // the scanner.
                                match rule.regex.find(&window[off..filled]) {
                                    Some(m) if !m.is_empty() => {
                                        matches[idx] = RuleMatch::Pending {
                                            start: off + m.start(),
                                            end: off + m.end(),
                                        };
                                    }
                                    _ => {
                                        matches[idx] = RuleMatch::Exhausted;
                                        continue;
                                    }
                                }
                            }
                            RuleMatch::Pending { .. } => {}
                        }
                        if let RuleMatch::Pending { start, end } = matches[idx]
                            && start <= off
                            && off < end
                        {
                            // First rule covering the byte wins.
                            matched = Some(idx);
                            style = rule.style;
                            break;
                        }
                    }
                }
            }

            let mut cell = match decode(&window[off..filled]) {
                Decode::Char(ch, len) => {
                    let mut buf = [0u8; 4];
                    let glyph: &str = ch.encode_utf8(&mut buf);
                    let width = ch.width().map_or(1, |w| w.max(1));
                    Cell::new(glyph, len, width)
                }
                Decode::Invalid(skip) => Cell::new("\u{FFFD}", skip, 1),
                Decode::Incomplete => {
                    // Refill from the current offset; the window content
                    // now starts at `pos`, so cached match offsets and the
                    // consumed count no longer apply.
                    let had = filled - off;
                    filled = txt.bytes_get(pos, &mut window);
                    off = 0;
                    matches.fill(RuleMatch::Pending { start: 0, end: 0 });
                    matched = None;
                    style = StyleId::DEFAULT;
                    if filled > had {
                        continue;
                    }
                    // The text itself ends mid-sequence.
                    let skip = skip_malformed(&window[..filled]);
                    Cell::new("\u{FFFD}", skip, 1)
                }
            };

            if window[off] == b'\r' && off + 1 < filled && window[off + 1] == b'\n' {
                // CRLF renders as a single newline covering both bytes.
                cell = Cell::new("\n", 2, 1);
            }

            cell.style = style;
            let consumed = cell.len();
            if !self.addch(cell) {
                break;
            }
            debug_assert!(consumed > 0, "pipeline must always make progress");
            off += consumed;
            pos += consumed;
        }

        self.end = pos;
        trace!(start = self.start, end = self.end, "drew viewport");
        self.lastline = self.draw_row.unwrap_or(self.height - 1);
        if let Some(row) = self.draw_row {
            let line = &mut self.lines[row];
            for col in self.draw_col..self.width {
                line.cells[col] = Cell::BLANK;
            }
        }

        let eof_symbol = self.symbols[SymbolKind::Eof as usize].clone();
        for row in self.lastline + 1..self.height {
            let line = &mut self.lines[row];
            let mut cell = Cell::new(&eof_symbol.glyph, 0, 1);
            cell.style = eof_symbol.style;
            line.cells[0] = cell;
            for col in 1..self.width {
                line.cells[col] = Cell::BLANK;
            }
            line.width = 1;
            line.len = 0;
        }

        // Selections first, cursors second, so a cursor flag is never
        // hidden under a later selection pass.
        let ranges: Vec<ByteRange> = self
            .selections
            .iter()
            .filter_map(|s| {
                ByteRange::from_endpoints(
                    s.anchor.and_then(|m| txt.mark_get(m)),
                    s.cursor.and_then(|m| txt.mark_get(m)),
                )
            })
            .collect();
        for range in ranges {
            if range.start <= self.end && range.end >= self.start {
                // Endpoints outside the window clamp to its corners.
                let (start_row, start_col) = self.coord_get(range.start).unwrap_or((0, 0));
                let (end_row, end_col) = self
                    .coord_get(range.end)
                    .unwrap_or((self.lastline, self.lines[self.lastline].width));
                for row in start_row..=end_row {
                    let from = if row == start_row { start_col } else { 0 };
                    let to = if row == end_row {
                        end_col
                    } else {
                        self.lines[row].width
                    };
                    let line = &mut self.lines[row];
                    for col in from..to.min(line.cells.len()) {
                        line.cells[col].flags |= CellFlags::SELECTED;
                    }
                }
            }
            if let Some(events) = self.events.as_mut() {
                events.selection(range);
            }
        }

        let bracket_exclusion = self
            .syntax
            .as_ref()
            .map(|s| s.bracket_exclusion().to_string());
        for i in 0..self.cursors.len() {
            let cursor_pos = self.cursors[i].mark.and_then(|m| txt.mark_get(m));
            match cursor_pos.and_then(|p| self.coord_get(p)) {
                Some((row, col)) => {
                    {
                        let cursor = &mut self.cursors[i];
                        cursor.line = Some(row);
                        cursor.row = row;
                        cursor.col = col;
                    }
                    if col < self.width {
                        self.lines[row].cells[col].flags |= CellFlags::CURSOR;
                    }
                    if let (Some(exclude), Some(p)) = (bracket_exclusion.as_deref(), cursor_pos) {
                        let matched_pos = txt.bracket_match_except(p, exclude);
                        if matched_pos != p
                            && let Some((mrow, mcol)) = self.coord_get(matched_pos)
                            && mcol < self.width
                        {
                            self.lines[mrow].cells[mcol].flags |= CellFlags::SELECTED;
                        }
                    }
                }
                None => {
                    // The primary cursor's cached projection clamps to the
                    // top left corner; the mark itself is not moved.
                    if self.cursors[i].id == self.primary {
                        let cursor = &mut self.cursors[i];
                        cursor.line = Some(0);
                        cursor.row = 0;
                        cursor.col = 0;
                    } else {
                        self.cursors[i].line = None;
                    }
                }
            }
        }

        if let Some(ui) = self.ui.as_mut() {
            ui.draw_text(&self.lines[..self.height]);
        }
    }

    /// Reset the grid for a fresh pass and synchronize `start` with its
    /// anchoring mark.
    fn grid_reset(&mut self) {
        let text = Rc::clone(&self.text);
        let txt = text.borrow();
        if self.start == self.start_last {
            // Unchanged since the last bind: let the mark pull the start
            // along with any edits made above the viewport.
            if let Some(mark) = self.start_mark
                && let Some(start) = txt.mark_get(mark)
            {
                self.start = start;
            }
        } else {
            self.start_mark = Some(txt.mark_set(self.start));
            self.start_last = self.start;
        }
        for line in &mut self.lines {
            line.reset();
        }
        self.lines[0].lineno = txt.lineno_by_pos(self.start);
        self.lastline = 0;
        self.draw_row = Some(0);
        self.draw_col = 0;
    }

    /// Emit one decoded cell into the grid, expanding tabs, newlines,
    /// controls and wide glyphs. Returns whether there was room left.
    fn addch(&mut self, mut cell: Cell) -> bool {
        let Some(mut row) = self.draw_row else {
            return false;
        };
        let lineno = self.lines[row].lineno;

        match cell.first_byte() {
            b'\t' => {
                cell.flags |= CellFlags::TAB;
                cell.width = 1;
                let count = self.tabwidth - (self.draw_col % self.tabwidth);
                for i in 0..count {
                    if self.draw_col + 1 > self.width {
                        if row + 1 >= self.height {
                            self.draw_row = None;
                            return false;
                        }
                        row += 1;
                        self.draw_row = Some(row);
                        self.draw_col = 0;
                        self.lines[row].lineno = lineno;
                    }
                    let kind = if i == 0 {
                        SymbolKind::Tab
                    } else {
                        SymbolKind::TabFill
                    };
                    cell.len = if i == 0 { 1 } else { 0 };
                    let symbol = &self.symbols[kind as usize];
                    cell.set_glyph(&symbol.glyph);
                    cell.style = symbol.style;
                    let line = &mut self.lines[row];
                    line.cells[self.draw_col] = cell;
                    line.len += cell.len();
                    line.width += cell.width();
                    self.draw_col += 1;
                }
                true
            }
            b'\n' => {
                cell.width = 1;
                if self.draw_col + 1 > self.width {
                    if row + 1 >= self.height {
                        self.draw_row = None;
                        return false;
                    }
                    row += 1;
                    self.draw_row = Some(row);
                    self.draw_col = 0;
                    self.lines[row].lineno = lineno;
                }
                let symbol = &self.symbols[SymbolKind::Eol as usize];
                cell.set_glyph(&symbol.glyph);
                cell.style = symbol.style;
                let line = &mut self.lines[row];
                line.cells[self.draw_col] = cell;
                line.len += cell.len();
                line.width += cell.width();
                for col in self.draw_col + 1..self.width {
                    line.cells[col] = Cell::BLANK;
                }
                if row + 1 < self.height {
                    self.lines[row + 1].lineno = lineno + 1;
                    self.draw_row = Some(row + 1);
                } else {
                    self.draw_row = None;
                }
                self.draw_col = 0;
                true
            }
            first => {
                if first < 0x20 {
                    // Non-printable ASCII renders as ^X in two columns.
                    let rendered = [b'^', first + 64];
                    let glyph = std::str::from_utf8(&rendered).unwrap_or("^?");
                    let mut control = Cell::new(glyph, cell.len(), 2);
                    control.style = cell.style;
                    cell = control;
                }
                if first == b' ' {
                    let symbol = &self.symbols[SymbolKind::Space as usize];
                    cell.set_glyph(&symbol.glyph);
                    cell.style = symbol.style;
                }

                let width = cell.width().max(1);
                if self.draw_col + width > self.width {
                    // The glyph does not fit; blank the tail and wrap.
                    let line = &mut self.lines[row];
                    for col in self.draw_col..self.width {
                        line.cells[col] = Cell::BLANK;
                    }
                    if row + 1 >= self.height {
                        self.draw_row = None;
                        self.draw_col = 0;
                        return false;
                    }
                    row += 1;
                    self.draw_row = Some(row);
                    self.draw_col = 0;
                }
                let line = &mut self.lines[row];
                line.width += cell.width();
                line.len += cell.len();
                line.lineno = lineno;
                line.cells[self.draw_col] = cell;
                self.draw_col += 1;
                for _ in 1..cell.width() {
                    if self.draw_col >= self.width {
                        break;
                    }
                    line.cells[self.draw_col] = Cell::UNUSED;
                    self.draw_col += 1;
                }
                true
            }
        }
    }

    /// Map a byte position to its grid coordinates.
    ///
    /// Returns `None` when `pos` lies outside the displayed range. Columns
    /// occupied by the tail of a wide glyph resolve to the following
    /// boundary, matching the walk the grid readers use.
    pub(crate) fn coord_get(&self, pos: usize) -> Option<(usize, usize)> {
        if pos < self.start || pos > self.end {
            return None;
        }
        let mut cur = self.start;
        let mut row = 0;
        while row != self.lastline && cur < pos {
            let len = self.lines[row].len;
            if cur + len > pos {
                break;
            }
            cur += len;
            row += 1;
        }
        let line = &self.lines[row];
        let max_col = self.width.min(line.width);
        let mut col = 0;
        while cur < pos && col < max_col {
            cur += line.cells[col].len();
            col += 1;
            // Step over columns occupied by the same character.
            while col < max_col && line.cells[col].len() == 0 {
                col += 1;
            }
        }
        Some((row, col))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use sable_text::{Buffer, ByteRange};

    use super::{Decode, decode};
    use crate::view::View;

    fn view_of(text: &str, width: usize, height: usize) -> View<Buffer> {
        let buf = Rc::new(RefCell::new(Buffer::from(text)));
        let mut view = View::new(buf);
        view.resize(width, height);
        view
    }

    fn view_of_bytes(bytes: &[u8], width: usize, height: usize) -> View<Buffer> {
        let buf = Rc::new(RefCell::new(Buffer::from_bytes(bytes.to_vec())));
        let mut view = View::new(buf);
        view.resize(width, height);
        view
    }

    // ====== Decoding ======

    #[test]
    fn decode_ascii() {
        assert!(matches!(decode(b"abc"), Decode::Char('a', 1)));
    }

    #[test]
    fn decode_multibyte() {
        assert!(matches!(
            decode("\u{4E2D}x".as_bytes()),
            Decode::Char('\u{4E2D}', 3)
        ));
    }

    #[test]
    fn decode_invalid_skips_to_next_leading_byte() {
        // A leading byte followed by a non-continuation byte skips one.
        assert!(matches!(decode(&[0xC3, 0x28]), Decode::Invalid(1)));
        // Stray continuation bytes are swallowed with their leader.
        assert!(matches!(decode(&[0xE0, 0x80, 0x80, b'a']), Decode::Invalid(3)));
    }

    #[test]
    fn decode_incomplete_at_end() {
        assert!(matches!(decode(&[0xE4, 0xBD]), Decode::Incomplete));
    }

    #[test]
    fn decode_nul_is_a_char() {
        assert!(matches!(decode(&[0x00, b'a']), Decode::Char('\0', 1)));
    }

    // ====== Cell emission ======

    #[test]
    fn control_chars_render_as_caret_pairs() {
        let view = view_of("\u{1}x", 10, 1);
        let line = &view.lines()[0];
        assert_eq!(line.cell(0).unwrap().glyph(), "^A");
        assert_eq!(line.cell(0).unwrap().width(), 2);
        assert_eq!(line.cell(0).unwrap().len(), 1);
        // The caret pair occupies two columns; the payload follows.
        assert_eq!(line.cell(2).unwrap().glyph(), "x");
    }

    #[test]
    fn nul_byte_renders_as_caret_at() {
        let view = view_of_bytes(&[b'a', 0x00, b'b'], 10, 1);
        let line = &view.lines()[0];
        assert_eq!(line.cell(1).unwrap().glyph(), "^@");
        assert_eq!(line.cell(1).unwrap().len(), 1);
        assert_eq!(line.cell(3).unwrap().glyph(), "b");
    }

    #[test]
    fn carriage_return_alone_renders_as_caret_m() {
        let view = view_of("a\rb", 10, 1);
        let line = &view.lines()[0];
        assert_eq!(line.cell(1).unwrap().glyph(), "^M");
        assert_eq!(line.cell(3).unwrap().glyph(), "b");
    }

    #[test]
    fn replacement_char_consumes_all_skipped_bytes() {
        // Three malformed bytes collapse into one U+FFFD cell.
        let view = view_of_bytes(&[0xE0, 0x80, 0x80, b'y'], 10, 1);
        let line = &view.lines()[0];
        assert_eq!(line.cell(0).unwrap().glyph(), "\u{FFFD}");
        assert_eq!(line.cell(0).unwrap().len(), 3);
        assert_eq!(line.cell(1).unwrap().glyph(), "y");
        assert_eq!(line.len(), 4);
    }

    #[test]
    fn window_split_multibyte_char_is_refilled() {
        // The 8-byte window ends inside the third glyph; the pipeline
        // refills from the same offset and decodes it whole.
        let view = view_of("\u{4E2D}\u{4E2D}\u{4E2D}", 4, 2);
        assert_eq!(view.lines()[1].cell(0).unwrap().glyph(), "\u{4E2D}");
        assert_eq!(view.viewport().end, 9);
    }

    #[test]
    fn truncated_char_at_eof_shows_replacement() {
        let view = view_of_bytes(&[b'a', 0xE4, 0xBD], 10, 1);
        let line = &view.lines()[0];
        assert_eq!(line.cell(1).unwrap().glyph(), "\u{FFFD}");
        assert_eq!(line.cell(1).unwrap().len(), 2);
        assert_eq!(view.viewport().end, 3);
    }

    // ====== Viewport byte range ======

    #[test]
    fn end_tracks_consumed_bytes() {
        let view = view_of("ab\ncd", 10, 3);
        assert_eq!(view.viewport(), ByteRange::new(0, 5));
    }

    #[test]
    fn row_lengths_partition_the_window() {
        let view = view_of("ab\ncdefgh\nij", 4, 4);
        let total: usize = view.lines().iter().map(|l| l.len()).sum();
        let viewport = view.viewport();
        assert_eq!(total, viewport.end - viewport.start);
    }

    // ====== Selection projection ======

    #[test]
    fn selection_spanning_viewport_paints_every_row() {
        let text: String = (1..=10).map(|i| format!("row {i}\n")).collect();
        let mut view = view_of(&text, 10, 3);
        view.viewport_down(2);
        let id = view.cursors_primary();
        // Cover the whole buffer; both endpoints are off screen.
        view.selection_set(id, ByteRange::new(0, text.len()));
        view.draw();
        for line in view.lines().iter().take(view.lastline() + 1) {
            assert!(
                (0..line.width()).all(|col| line.cell(col).unwrap().is_selected()),
                "row should be fully selected"
            );
        }
    }

    #[test]
    fn selection_outside_viewport_paints_nothing() {
        let text: String = (1..=10).map(|i| format!("row {i}\n")).collect();
        let mut view = view_of(&text, 10, 2);
        let id = view.cursors_primary();
        let far = text.len() - 3;
        view.selection_set(id, ByteRange::new(far, text.len()));
        view.draw();
        assert!(
            view.lines()
                .iter()
                .all(|l| l.cells().iter().all(|c| !c.is_selected()))
        );
    }

    // ====== Cursor projection ======

    #[test]
    fn cursor_cell_is_flagged() {
        let mut view = view_of("abc", 10, 1);
        view.cursor_to(1);
        assert!(view.lines()[0].cell(1).unwrap().is_cursor());
        assert!(!view.lines()[0].cell(0).unwrap().is_cursor());
    }

    #[test]
    fn bracket_match_highlights_partner() {
        let mut view = view_of("(ab)", 10, 1);
        view.syntax_set(Some(crate::syntax::Syntax::new()));
        view.cursor_to(0);
        assert!(view.lines()[0].cell(3).unwrap().is_selected());
    }

    #[test]
    fn excluded_brackets_are_not_matched() {
        let mut view = view_of("<ab>", 10, 1);
        view.syntax_set(Some(crate::syntax::Syntax::new()));
        view.cursor_to(0);
        assert!(!view.lines()[0].cell(3).unwrap().is_selected());
    }

    #[test]
    fn invisible_primary_cursor_clamps_to_top_left() {
        let mut view = view_of("a\nb\nc\nd\ne\n", 10, 2);
        assert!(view.viewport_down(2));
        // The cursor mark still resolves to 0, outside the window.
        assert_eq!(view.cursor_pos(), Some(0));
        assert_eq!(view.cursors_coord(view.cursors_primary()), Some((0, 0)));
    }
}
