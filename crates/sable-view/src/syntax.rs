#![forbid(unsafe_code)]

//! Syntax definitions: highlighting rules, symbol glyphs and style specs.
//!
//! A [`Syntax`] is an ordered list of [`SyntaxRule`]s (compiled regexes
//! paired with style slots), a table of style specifications indexed by
//! slot, and optional overrides for the whitespace/EOL/EOF glyphs. Rule
//! order is priority order: during a draw the first rule whose match covers
//! the current byte wins.
//!
//! Rules match on raw bytes (`regex::bytes`) because the visible window is
//! read straight from the buffer and may contain invalid UTF-8.

use bitflags::bitflags;
use regex::bytes::Regex;

use crate::cell::StyleId;

/// Number of symbol kinds.
pub const SYMBOL_COUNT: usize = 5;

/// The displayable symbol classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A space character.
    Space = 0,
    /// The first cell of an expanded tab.
    Tab = 1,
    /// The remaining cells of an expanded tab.
    TabFill = 2,
    /// End of line.
    Eol = 3,
    /// Rows past the end of the file.
    Eof = 4,
}

impl SymbolKind {
    pub(crate) const ALL: [Self; SYMBOL_COUNT] = [
        Self::Space,
        Self::Tab,
        Self::TabFill,
        Self::Eol,
        Self::Eof,
    ];
}

bitflags! {
    /// Selects which symbol classes render their visible glyph instead of
    /// a blank.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SymbolFlags: u8 {
        /// Show spaces as a visible glyph.
        const SPACE = 1 << 0;
        /// Show the tab head glyph.
        const TAB = 1 << 1;
        /// Show the tab fill glyph.
        const TAB_FILL = 1 << 2;
        /// Show an end-of-line glyph.
        const EOL = 1 << 3;
        /// Show the end-of-file glyph.
        const EOF = 1 << 4;
    }
}

impl SymbolFlags {
    pub(crate) fn for_kind(kind: SymbolKind) -> Self {
        Self::from_bits_truncate(1 << kind as u8)
    }
}

/// A glyph plus the style it renders with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxSymbol {
    /// The glyph, at most one scalar value.
    pub glyph: String,
    /// Style slot applied to the symbol's cells.
    pub style: StyleId,
}

impl SyntaxSymbol {
    /// Create a symbol with the default style.
    #[must_use]
    pub fn new(glyph: impl Into<String>) -> Self {
        Self {
            glyph: glyph.into(),
            style: StyleId::DEFAULT,
        }
    }

    /// Create a symbol rendering with `style`.
    #[must_use]
    pub fn styled(glyph: impl Into<String>, style: StyleId) -> Self {
        Self {
            glyph: glyph.into(),
            style,
        }
    }
}

/// Symbols used when a class is not set to visible: everything blank except
/// the end-of-file tilde.
pub(crate) fn symbols_blank() -> [SyntaxSymbol; SYMBOL_COUNT] {
    [
        SyntaxSymbol::new(" "),
        SyntaxSymbol::new(" "),
        SyntaxSymbol::new(" "),
        SyntaxSymbol::new(" "),
        SyntaxSymbol::new("~"),
    ]
}

/// Default visible glyphs: middle dot, arrow head, blank fill, return sign,
/// tilde.
pub(crate) fn symbols_visible() -> [SyntaxSymbol; SYMBOL_COUNT] {
    [
        SyntaxSymbol::new("\u{00B7}"),
        SyntaxSymbol::new("\u{25B6}"),
        SyntaxSymbol::new(" "),
        SyntaxSymbol::new("\u{23CE}"),
        SyntaxSymbol::new("~"),
    ]
}

/// One highlighting rule: a compiled pattern and the style slot its matches
/// render with.
#[derive(Debug, Clone)]
pub struct SyntaxRule {
    /// The compiled pattern, matched against the raw byte window.
    pub regex: Regex,
    /// Style slot for matched bytes.
    pub style: StyleId,
}

impl SyntaxRule {
    /// Create a rule from an already compiled regex.
    #[must_use]
    pub fn new(regex: Regex, style: StyleId) -> Self {
        Self { regex, style }
    }
}

/// A complete syntax definition attachable to a view.
#[derive(Debug, Clone)]
pub struct Syntax {
    rules: Vec<SyntaxRule>,
    symbols: [Option<SyntaxSymbol>; SYMBOL_COUNT],
    styles: Vec<String>,
    bracket_exclusion: String,
}

impl Default for Syntax {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax {
    /// Create an empty definition.
    ///
    /// Style slot 0 is reserved for the default style; the bracket
    /// exclusion set starts as `"<>"` so stray angle brackets in prose and
    /// comparison operators do not produce match highlights.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            symbols: [const { None }; SYMBOL_COUNT],
            styles: vec![String::new()],
            bracket_exclusion: "<>".to_string(),
        }
    }

    /// Register a style specification, returning its slot.
    pub fn add_style(&mut self, spec: impl Into<String>) -> StyleId {
        let slot = u16::try_from(self.styles.len()).unwrap_or(u16::MAX);
        self.styles.push(spec.into());
        StyleId::new(slot)
    }

    /// Append a rule. Later rules lose against earlier ones wherever their
    /// matches overlap.
    pub fn add_rule(&mut self, pattern: &str, style: StyleId) -> Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        self.rules.push(SyntaxRule::new(regex, style));
        Ok(())
    }

    /// Override the glyph for a symbol class.
    pub fn set_symbol(&mut self, kind: SymbolKind, symbol: SyntaxSymbol) {
        self.symbols[kind as usize] = Some(symbol);
    }

    /// Replace the bracket characters excluded from match highlighting.
    pub fn set_bracket_exclusion(&mut self, exclude: impl Into<String>) {
        self.bracket_exclusion = exclude.into();
    }

    /// The rules in priority order.
    #[must_use]
    pub fn rules(&self) -> &[SyntaxRule] {
        &self.rules
    }

    /// The override for a symbol class, if any.
    #[must_use]
    pub fn symbol(&self, kind: SymbolKind) -> Option<&SyntaxSymbol> {
        self.symbols[kind as usize].as_ref()
    }

    /// Style specifications indexed by slot.
    #[must_use]
    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    /// Brackets excluded from match highlighting.
    #[must_use]
    pub fn bracket_exclusion(&self) -> &str {
        &self.bracket_exclusion
    }
}
