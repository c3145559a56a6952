#![forbid(unsafe_code)]

//! Cell types and invariants.
//!
//! The [`Cell`] is the atomic visual unit of the grid: a short UTF-8 glyph,
//! the number of source bytes it renders, its display width, a style
//! handle, and per-cell flags.
//!
//! # Invariants
//!
//! 1. `len == 0` marks a continuation: the column is occupied by a
//!    character whose head sits in an earlier column (the tail of a wide
//!    glyph, or the fill of an expanded tab).
//! 2. `width` is 0, 1 or 2. Tails of wide glyphs are all-zero "unused"
//!    cells.
//! 3. The glyph payload is at most 4 bytes (one scalar value, or the two
//!    ASCII bytes of a `^X` control rendering).

use bitflags::bitflags;

bitflags! {
    /// Per-cell state written during a draw pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        /// Part of an expanded tab (head and fill cells alike).
        const TAB = 1 << 0;
        /// A cursor rests on this cell.
        const CURSOR = 1 << 1;
        /// The cell lies inside a selection or is a matched bracket.
        const SELECTED = 1 << 2;
    }
}

/// Value-typed handle for a style slot shared with the UI backend.
///
/// Slot 0 is the default (unstyled) slot. Styles are registered under their
/// slot via [`UiBackend::syntax_style`](crate::UiBackend::syntax_style) when
/// a syntax is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleId(u16);

impl StyleId {
    /// The default style slot.
    pub const DEFAULT: Self = Self(0);

    /// Create a handle for `slot`.
    #[must_use]
    pub const fn new(slot: u16) -> Self {
        Self(slot)
    }

    /// The numeric slot, for indexing style tables.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

/// One column of a screen line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    data: [u8; 4],
    data_len: u8,
    pub(crate) len: u32,
    pub(crate) width: u8,
    pub(crate) style: StyleId,
    pub(crate) flags: CellFlags,
}

impl Cell {
    /// A blank filler cell: renders a space, consumes no source bytes and
    /// contributes no width.
    pub(crate) const BLANK: Self = Self {
        data: [b' ', 0, 0, 0],
        data_len: 1,
        len: 0,
        width: 0,
        style: StyleId::DEFAULT,
        flags: CellFlags::empty(),
    };

    /// An unused cell: the tail column of a wide glyph.
    pub(crate) const UNUSED: Self = Self {
        data: [0; 4],
        data_len: 0,
        len: 0,
        width: 0,
        style: StyleId::DEFAULT,
        flags: CellFlags::empty(),
    };

    /// Build a cell from a glyph, a source byte count and a display width.
    ///
    /// Glyphs longer than 4 bytes are truncated at the payload boundary;
    /// every glyph the pipeline produces fits.
    pub(crate) fn new(glyph: &str, len: usize, width: usize) -> Self {
        let mut cell = Self {
            len: u32::try_from(len).unwrap_or(u32::MAX),
            width: u8::try_from(width).unwrap_or(u8::MAX),
            ..Self::default()
        };
        cell.set_glyph(glyph);
        cell
    }

    /// Replace the glyph payload.
    pub(crate) fn set_glyph(&mut self, glyph: &str) {
        let bytes = glyph.as_bytes();
        let n = bytes.len().min(4);
        self.data = [0; 4];
        self.data[..n].copy_from_slice(&bytes[..n]);
        self.data_len = n as u8;
    }

    /// The rendered glyph.
    ///
    /// Payloads are written from `&str` slices, so they stay valid UTF-8;
    /// a malformed payload renders as empty rather than panicking.
    #[must_use]
    pub fn glyph(&self) -> &str {
        std::str::from_utf8(&self.data[..self.data_len as usize]).unwrap_or("")
    }

    /// First byte of the glyph payload, 0 for unused cells.
    #[inline]
    pub(crate) fn first_byte(&self) -> u8 {
        self.data[0]
    }

    /// Source bytes rendered into this cell. 0 for continuation cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether this is a continuation cell (`len == 0`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Display width in columns (0, 1 or 2).
    #[must_use]
    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// Style slot applied to this cell.
    #[must_use]
    pub fn style(&self) -> StyleId {
        self.style
    }

    /// The flags set on this cell.
    #[must_use]
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    /// Whether the cell belongs to an expanded tab.
    #[must_use]
    pub fn is_tab(&self) -> bool {
        self.flags.contains(CellFlags::TAB)
    }

    /// Whether a cursor rests on the cell.
    #[must_use]
    pub fn is_cursor(&self) -> bool {
        self.flags.contains(CellFlags::CURSOR)
    }

    /// Whether the cell is selected.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.flags.contains(CellFlags::SELECTED)
    }
}
