#![forbid(unsafe_code)]

//! Text buffer contract for the sable view engine.
//!
//! The view engine never owns text. It consumes a byte-addressed buffer
//! through the [`TextBuffer`] trait: raw byte access, line-number lookup,
//! character and line motions, bracket matching, reverse iteration, and
//! **marks**, stable handles that keep identifying the same position while
//! the text underneath is edited by other parties.
//!
//! [`Buffer`] is the reference implementation: a contiguous in-memory store
//! with a mark table that is adjusted on every edit. It is what the demos
//! and the test suites run against.
//!
//! # Example
//! ```
//! use sable_text::{Buffer, TextBuffer};
//!
//! let mut buf = Buffer::from("hello\nworld\n");
//! let mark = buf.mark_set(6); // start of "world"
//!
//! buf.insert(0, "intro\n");
//! assert_eq!(buf.mark_get(mark), Some(12)); // mark followed the edit
//!
//! buf.delete(12, 5);
//! assert_eq!(buf.mark_get(mark), None); // the marked range is gone
//! ```

pub mod buffer;
pub mod mark;
pub mod range;

pub use buffer::Buffer;
pub use mark::Mark;
pub use range::ByteRange;

/// Byte-addressed text store consumed by the view engine.
///
/// Positions are byte offsets in `0..=size()`. All methods are read-only
/// with respect to the text content; implementations that support marks use
/// interior mutability for the mark table so that views holding a shared
/// reference can still mint marks. Mutation of the text itself happens
/// outside this trait, between view operations.
pub trait TextBuffer {
    /// Total size of the text in bytes.
    fn size(&self) -> usize;

    /// Copy bytes starting at `pos` into `buf`.
    ///
    /// Returns the number of bytes actually copied, which may be less than
    /// `buf.len()` near the end of the text and is 0 when `pos` is past it.
    fn bytes_get(&self, pos: usize, buf: &mut [u8]) -> usize;

    /// 1-based line number of the line containing `pos`.
    fn lineno_by_pos(&self, pos: usize) -> usize;

    /// Create a mark identifying the position `pos` across future edits.
    fn mark_set(&self, pos: usize) -> Mark;

    /// Resolve a mark back to a byte offset.
    ///
    /// Returns `None` once the range covering the mark has been deleted.
    fn mark_get(&self, mark: Mark) -> Option<usize>;

    /// Offset of the character after the one at `pos`, clamped to `size()`.
    fn char_next(&self, pos: usize) -> usize;

    /// Offset of the character before `pos`, clamped to 0.
    fn char_prev(&self, pos: usize) -> usize;

    /// Offset of the first byte of the line containing `pos`.
    fn line_begin(&self, pos: usize) -> usize;

    /// Position in the previous line, preserving the byte column where the
    /// previous line is long enough and clamping to its end otherwise.
    /// Returns `pos` unchanged on the first line.
    fn line_up(&self, pos: usize) -> usize;

    /// Position in the next line, column-preserving like [`line_up`].
    /// Returns `pos` unchanged on the last line.
    ///
    /// [`line_up`]: TextBuffer::line_up
    fn line_down(&self, pos: usize) -> usize;

    /// Position of the bracket matching the one at `pos`, skipping bracket
    /// characters listed in `exclude`. Returns `pos` when the byte at `pos`
    /// is not a bracket, is excluded, or has no match.
    fn bracket_match_except(&self, pos: usize, exclude: &str) -> usize;

    /// Iterate bytes in reverse starting at `pos` (inclusive) down to 0.
    fn bytes_rev(&self, pos: usize) -> impl Iterator<Item = u8> + '_;
}
