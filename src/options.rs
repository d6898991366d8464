//! Configuration options for ISON parsing and writing.
//!
//! - [`ParseOptions`]: constant spelling, Infinity/NaN acceptance, import
//!   directives and the constructor registry
//! - [`WriteOptions`]: indentation mode, key sorting, identity guard, constant
//!   spelling and short-list layout
//! - [`ConstantStyle`]: how `true`/`false`/`null`/Infinity/NaN are spelled
//!
//! ## Examples
//!
//! ```rust
//! use serde_ison::{parse_str_with_options, write_to_string, ConstantStyle, ParseOptions, WriteOptions};
//!
//! let options = ParseOptions::new().with_constants(ConstantStyle::TitleCase);
//! let value = parse_str_with_options("flag: True\nlimit: inf\n", "<doc>", &options).unwrap();
//!
//! let text = write_to_string(&value, &WriteOptions::pretty()).unwrap();
//! assert_eq!(text, "flag: true\nlimit: Infinity");
//! ```

use crate::registry::ConstructorRegistry;

/// Spelling of the boolean, null and non-finite constants.
///
/// # Examples
///
/// ```rust
/// use serde_ison::ConstantStyle;
///
/// assert_eq!(ConstantStyle::Json.null(), "null");
/// assert_eq!(ConstantStyle::TitleCase.infinity(), "inf");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConstantStyle {
    /// `true`, `false`, `null`, `Infinity`, `NaN`
    #[default]
    Json,
    /// `True`, `False`, `None`, `inf`, `nan`
    TitleCase,
}

impl ConstantStyle {
    #[must_use]
    pub const fn true_(&self) -> &'static str {
        match self {
            ConstantStyle::Json => "true",
            ConstantStyle::TitleCase => "True",
        }
    }

    #[must_use]
    pub const fn false_(&self) -> &'static str {
        match self {
            ConstantStyle::Json => "false",
            ConstantStyle::TitleCase => "False",
        }
    }

    #[must_use]
    pub const fn null(&self) -> &'static str {
        match self {
            ConstantStyle::Json => "null",
            ConstantStyle::TitleCase => "None",
        }
    }

    #[must_use]
    pub const fn infinity(&self) -> &'static str {
        match self {
            ConstantStyle::Json => "Infinity",
            ConstantStyle::TitleCase => "inf",
        }
    }

    #[must_use]
    pub const fn nan(&self) -> &'static str {
        match self {
            ConstantStyle::Json => "NaN",
            ConstantStyle::TitleCase => "nan",
        }
    }

    /// Returns `true` if `word`, ignoring a leading sign and a trailing `j`,
    /// is a constant spelling in either style.
    #[must_use]
    pub fn is_reserved(word: &str) -> bool {
        let unsigned = word.trim_start_matches(['+', '-']);
        let base = unsigned
            .strip_suffix(['j', 'J'])
            .unwrap_or(unsigned);
        [ConstantStyle::Json, ConstantStyle::TitleCase]
            .iter()
            .any(|style| {
                [
                    style.true_(),
                    style.false_(),
                    style.null(),
                    style.infinity(),
                    style.nan(),
                ]
                .iter()
                .any(|reserved| *reserved == unsigned || *reserved == base)
            })
    }
}

/// Configuration for the parser.
///
/// # Examples
///
/// ```rust
/// use serde_ison::{ConstructorRegistry, ParseOptions};
///
/// let options = ParseOptions::new()
///     .with_inf_nan(false)
///     .with_imports(false)
///     .with_registry(ConstructorRegistry::new());
/// assert!(!options.allow_inf_nan);
/// ```
#[derive(Clone, Debug)]
pub struct ParseOptions {
    pub constants: ConstantStyle,
    /// When `false`, Infinity/NaN spellings are read as plain strings.
    pub allow_inf_nan: bool,
    /// When `false`, `import`/`from` lines are ordinary document content.
    pub allow_imports: bool,
    pub registry: ConstructorRegistry,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            constants: ConstantStyle::default(),
            allow_inf_nan: true,
            allow_imports: true,
            registry: ConstructorRegistry::with_builtins(),
        }
    }
}

impl ParseOptions {
    /// Creates default options: JSON spellings, Infinity/NaN and imports
    /// enabled, built-in constructors registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_constants(mut self, constants: ConstantStyle) -> Self {
        self.constants = constants;
        self
    }

    #[must_use]
    pub fn with_inf_nan(mut self, allow: bool) -> Self {
        self.allow_inf_nan = allow;
        self
    }

    #[must_use]
    pub fn with_imports(mut self, allow: bool) -> Self {
        self.allow_imports = allow;
        self
    }

    /// Replaces the constructor registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ConstructorRegistry) -> Self {
        self.registry = registry;
        self
    }
}

/// Configuration for the writer.
///
/// `indent` selects the layout: `None` writes everything on one line,
/// `Some(0)` puts every element on its own line without indentation, and
/// `Some(n)` indents nested levels by `n` spaces and writes a top-level
/// mapping as unbracketed `key: value` lines.
///
/// # Examples
///
/// ```rust
/// use serde_ison::WriteOptions;
///
/// let options = WriteOptions::new();
/// assert_eq!(options.indent, None);
///
/// let options = WriteOptions::pretty().with_indent(2).with_sort_keys(true);
/// assert_eq!(options.indent, Some(2));
/// ```
#[derive(Clone, Debug)]
pub struct WriteOptions {
    pub indent: Option<usize>,
    pub sort_keys: bool,
    /// Render a repeated constructed instance as `...`.
    pub check_circular: bool,
    pub constants: ConstantStyle,
    /// When `false`, non-finite floats are an error.
    pub allow_inf_nan: bool,
    /// Lists whose scalar elements all render within this many characters
    /// stay on one line in indented layouts. `0` disables the heuristic.
    pub short_list_width: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            indent: None,
            sort_keys: false,
            check_circular: true,
            constants: ConstantStyle::default(),
            allow_inf_nan: true,
            short_list_width: 0,
        }
    }
}

impl WriteOptions {
    /// Creates default options (compact, insertion order, identity guard on).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for indented output with 4-space indentation.
    #[must_use]
    pub fn pretty() -> Self {
        WriteOptions {
            indent: Some(4),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    /// Switches back to single-line output.
    #[must_use]
    pub fn compact(mut self) -> Self {
        self.indent = None;
        self
    }

    #[must_use]
    pub fn with_sort_keys(mut self, sort: bool) -> Self {
        self.sort_keys = sort;
        self
    }

    #[must_use]
    pub fn with_check_circular(mut self, check: bool) -> Self {
        self.check_circular = check;
        self
    }

    #[must_use]
    pub fn with_constants(mut self, constants: ConstantStyle) -> Self {
        self.constants = constants;
        self
    }

    #[must_use]
    pub fn with_inf_nan(mut self, allow: bool) -> Self {
        self.allow_inf_nan = allow;
        self
    }

    #[must_use]
    pub fn with_short_list_width(mut self, width: usize) -> Self {
        self.short_list_width = width;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_spellings() {
        for word in ["true", "None", "-Infinity", "+nan", "NaNj", "infJ", "False"] {
            assert!(ConstantStyle::is_reserved(word), "{word}");
        }
        for word in ["truth", "Null", "name", "j"] {
            assert!(!ConstantStyle::is_reserved(word), "{word}");
        }
    }

    #[test]
    fn test_builders() {
        let options = WriteOptions::pretty().compact().with_check_circular(false);
        assert_eq!(options.indent, None);
        assert!(!options.check_circular);

        let options = ParseOptions::new().with_constants(ConstantStyle::TitleCase);
        assert_eq!(options.constants.true_(), "True");
        assert!(options.allow_imports);
    }
}
