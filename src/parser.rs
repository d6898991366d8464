//! Recursive-descent parser from tokens to [`Value`].
//!
//! The parser works on a [`TokenCursor`] and disambiguates the grammar by
//! probing ahead: [`Parser::test`] matches a run of token patterns and always
//! rewinds, [`Parser::eat`] keeps the tokens on success. References are
//! resolved against a [`ScopeChain`] that grows as keys and list elements are
//! parsed, and named calls are dispatched through the [`ConstructorRegistry`]
//! held by the [`ParseOptions`].
//!
//! Line structure matters outside brackets: mappings and bullet lists nest by
//! indentation. Inside `()`, `[]` and `{}` elements are separated by commas or
//! line breaks and indentation is ignored.
//!
//! [`ConstructorRegistry`]: crate::registry::ConstructorRegistry

use crate::cursor::TokenCursor;
use crate::error::{Error, ErrorKind, Result};
use crate::literal;
use crate::options::ParseOptions;
use crate::registry::{self, ImportScope};
use crate::scope::ScopeChain;
use crate::token::{Token, TokenKind};
use crate::value::{Complex, Value};
use crate::{Map, Set};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Parses a token sequence into a value.
///
/// `source_name` names the input in error messages.
///
/// # Errors
///
/// Returns the first structural violation as an [`Error::Parse`] positioned at
/// the offending token.
///
/// # Examples
///
/// ```rust
/// use serde_ison::lexer::tokenize;
/// use serde_ison::{parse, ParseOptions, Value};
///
/// let tokens = tokenize("a: 1\nb: 2\n").unwrap();
/// let value = parse(tokens, "<doc>", &ParseOptions::default()).unwrap();
/// assert_eq!(value.get("b"), Some(&Value::from(2)));
/// ```
pub fn parse(tokens: Vec<Token>, source_name: &str, options: &ParseOptions) -> Result<Value> {
    debug!(source_name, tokens = tokens.len(), "parsing document");
    Parser::new(tokens, source_name, options).parse_document()
}

/// A token pattern for [`Parser::test`] and [`Parser::eat`].
#[derive(Clone, Copy, Debug)]
enum Pat {
    Kind(TokenKind),
    Op(&'static str),
    /// A name token with exactly this text.
    Word(&'static str),
    /// Anything usable as a key: a name, string or number.
    Key,
    /// A dash marker: `-`, `--` or `---`.
    Dash,
    /// A marker that can open a bullet list: a dash or `1.`.
    Bullet,
}

const CLOSERS: [&str; 4] = [",", "}", "]", ")"];

#[derive(Clone, Debug, PartialEq)]
enum Marker {
    Dash(String),
    Numbered(u64),
}

enum BodyEnd {
    Dedent,
    EndOfInput,
}

/// Elements of a bracketed sequence, set, or argument list.
struct Collector {
    items: Vec<Value>,
    /// Reject structurally equal elements.
    unique: bool,
    /// The last element is a mapping built from consecutive `key: value`
    /// elements and can take more keys.
    grouping: bool,
}

impl Collector {
    fn new(unique: bool) -> Self {
        Collector {
            items: Vec::new(),
            unique,
            grouping: false,
        }
    }
}

/// The value of a numbered list marker such as `2.`.
fn numbered_marker(token: &Token) -> Option<u64> {
    if token.kind != TokenKind::Number {
        return None;
    }
    let digits: String = token.text.strip_suffix('.')?.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn matches(token: &Token, pat: Pat) -> bool {
    match pat {
        Pat::Kind(kind) => token.kind == kind,
        Pat::Op(text) => token.is_op(text),
        Pat::Word(text) => token.is_name(text),
        Pat::Key => matches!(
            token.kind,
            TokenKind::Name | TokenKind::String | TokenKind::Number
        ),
        Pat::Dash => ["-", "--", "---"].iter().any(|d| token.is_op(d)),
        Pat::Bullet => matches(token, Pat::Dash) || numbered_marker(token) == Some(1),
    }
}

pub(crate) struct Parser<'a> {
    cursor: TokenCursor,
    source_name: &'a str,
    options: &'a ParseOptions,
    scopes: ScopeChain,
    imports: ImportScope,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: Vec<Token>, source_name: &'a str, options: &'a ParseOptions) -> Self {
        Parser {
            cursor: TokenCursor::new(tokens),
            source_name,
            options,
            scopes: ScopeChain::new(),
            imports: ImportScope::default(),
        }
    }

    // Token matching

    fn current(&self) -> &Token {
        self.cursor.current()
    }

    fn test(&mut self, pats: &[Pat]) -> bool {
        self.cursor.push_marker();
        let matched = self.advance_over(pats);
        self.cursor.pop_marker(true);
        matched
    }

    fn eat(&mut self, pats: &[Pat]) -> bool {
        self.cursor.push_marker();
        let matched = self.advance_over(pats);
        self.cursor.pop_marker(!matched);
        matched
    }

    fn advance_over(&mut self, pats: &[Pat]) -> bool {
        for &pat in pats {
            if !matches(self.current(), pat) {
                return false;
            }
            self.cursor.advance();
        }
        true
    }

    fn expect(&mut self, pats: &[Pat], what: &str) -> Result<()> {
        if self.eat(pats) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn error_at(&self, kind: ErrorKind, token: &Token, message: impl Into<String>) -> Error {
        Error::at(kind, self.source_name, token, message)
    }

    fn unexpected(&self, what: &str) -> Error {
        let token = self.current();
        self.error_at(
            ErrorKind::UnexpectedToken,
            token,
            format!("expected {what}, found {}", token.describe()),
        )
    }

    /// Skips line breaks inside brackets. Returns `true` if any were skipped.
    fn skip_blanks(&mut self) -> bool {
        let mut skipped = false;
        while self.current().kind == TokenKind::Nl {
            self.cursor.advance();
            skipped = true;
        }
        skipped
    }

    /// Consumes the end of a logical line. A line that just closed an
    /// indented block has already ended.
    fn eat_line_break(&mut self) -> bool {
        if self.cursor.last().map_or(false, |t| t.kind == TokenKind::Dedent) {
            return true;
        }
        self.eat(&[Pat::Kind(TokenKind::Newline)])
    }

    /// Whether the current token ends the value at this position.
    fn at_value_end(&self) -> bool {
        let token = self.current();
        matches!(
            token.kind,
            TokenKind::Newline | TokenKind::Nl | TokenKind::Dedent | TokenKind::EndMarker
        ) || CLOSERS.iter().any(|c| token.is_op(c))
    }

    /// Runs `body` inside a scope level named `name`, publishing its result.
    fn scoped(&mut self, name: String, body: impl FnOnce(&mut Self) -> Result<Value>) -> Result<Value> {
        self.scopes.enter(name);
        let result = body(self);
        self.scopes.exit(result.as_ref().ok());
        result
    }

    // Document

    fn parse_document(&mut self) -> Result<Value> {
        if self.cursor.at_end() {
            return Ok(Value::Mapping(Map::new()));
        }
        if self.options.allow_imports {
            while self.test(&[Pat::Word("import"), Pat::Kind(TokenKind::Name)])
                || self.test(&[Pat::Word("from"), Pat::Kind(TokenKind::Name)])
            {
                self.parse_import()?;
            }
            if self.cursor.at_end() {
                return Ok(Value::Mapping(Map::new()));
            }
        }
        if self.test(&[Pat::Key, Pat::Op(":")]) {
            let map = self.parse_mapping_body(Map::new(), HashSet::new(), BodyEnd::EndOfInput)?;
            return Ok(Value::Mapping(map));
        }
        // A lone `1.` is a float, not an empty numbered list.
        let numbered_alone = numbered_marker(self.current()).is_some()
            && self.cursor.look_ahead(1).kind == TokenKind::Newline;
        let value = if self.test(&[Pat::Bullet]) && !numbered_alone {
            self.parse_list_block(false)?
        } else {
            self.parse_value()?
        };
        self.eat_line_break();
        self.expect(&[Pat::Kind(TokenKind::EndMarker)], "end of input")?;
        Ok(value)
    }

    // Imports

    fn parse_import(&mut self) -> Result<()> {
        if self.eat(&[Pat::Word("import")]) {
            loop {
                let token = self.current().clone();
                let module = self.parse_import_name()?;
                let alias = self.parse_import_alias()?;
                if !self.options.registry.contains(&module) && !self.options.registry.has_module(&module) {
                    return Err(self.error_at(
                        ErrorKind::UnresolvableConstructor,
                        &token,
                        format!("no registered constructors under {module:?}"),
                    ));
                }
                let bound = alias.unwrap_or_else(|| module.clone());
                self.check_unbound(&bound, &token)?;
                debug!(module = module.as_str(), alias = bound.as_str(), "import");
                self.imports.bind_module(bound, module);
                if !self.eat(&[Pat::Op(",")]) {
                    break;
                }
            }
        } else {
            self.expect(&[Pat::Word("from")], "'import' or 'from'")?;
            let module = self.parse_import_name()?;
            self.expect(&[Pat::Word("import")], "'import'")?;
            if self.eat(&[Pat::Op("(")]) {
                self.parse_delimited(")", |p| p.parse_import_from_name(&module))?;
            } else {
                loop {
                    self.parse_import_from_name(&module)?;
                    if !self.eat(&[Pat::Op(",")]) {
                        break;
                    }
                }
            }
        }
        if !self.eat_line_break() {
            return Err(self.unexpected("end of line"));
        }
        Ok(())
    }

    fn parse_import_name(&mut self) -> Result<String> {
        let token = self.current().clone();
        self.expect(&[Pat::Kind(TokenKind::Name)], "an import name")?;
        Ok(token.text)
    }

    fn parse_import_alias(&mut self) -> Result<Option<String>> {
        if self.eat(&[Pat::Word("as")]) {
            return self.parse_import_name().map(Some);
        }
        Ok(None)
    }

    fn parse_import_from_name(&mut self, module: &str) -> Result<()> {
        let token = self.current().clone();
        let name = self.parse_import_name()?;
        let alias = self.parse_import_alias()?;
        let qualified = format!("{module}.{name}");
        if !self.options.registry.contains(&qualified) {
            return Err(self.error_at(
                ErrorKind::UnresolvableConstructor,
                &token,
                format!("no constructor named {qualified:?} is registered"),
            ));
        }
        let bound = alias.unwrap_or(name);
        self.check_unbound(&bound, &token)?;
        debug!(name = qualified.as_str(), alias = bound.as_str(), "import");
        self.imports.bind_name(bound, qualified);
        Ok(())
    }

    fn check_unbound(&self, alias: &str, token: &Token) -> Result<()> {
        if self.imports.is_bound(alias) {
            return Err(self.error_at(
                ErrorKind::DuplicateImport,
                token,
                format!("duplicate import name {alias:?}"),
            ));
        }
        Ok(())
    }

    // Mappings

    /// Parses `key: value` lines until the end of the block.
    fn parse_mapping_body(&mut self, mut map: Map, mut explicit: HashSet<String>, end: BodyEnd) -> Result<Map> {
        let end_pat = match end {
            BodyEnd::Dedent => Pat::Kind(TokenKind::Dedent),
            BodyEnd::EndOfInput => Pat::Kind(TokenKind::EndMarker),
        };
        loop {
            self.parse_mapping_entry(&mut map, &mut explicit)?;
            self.eat(&[Pat::Op(",")]);
            if !self.eat_line_break() || self.test(&[end_pat]) {
                break;
            }
        }
        match end {
            BodyEnd::Dedent => self.expect(&[end_pat], "the end of the indented block")?,
            BodyEnd::EndOfInput => self.expect(&[end_pat], "a new line or end of input")?,
        }
        Ok(map)
    }

    fn parse_mapping_entry(&mut self, map: &mut Map, explicit: &mut HashSet<String>) -> Result<()> {
        let start = self.current().clone();
        if self.test(&[Pat::Op("**")]) {
            let spread = self.parse_mapping_spread()?;
            spread_into(map, spread);
        } else if self.test(&[Pat::Op("*")]) {
            return Err(self.error_at(
                ErrorKind::UnexpectedToken,
                &start,
                "'*' spreads are not allowed in a mapping",
            ));
        } else {
            let (key, value) = self.parse_key_value(true)?;
            self.insert_entry(map, explicit, key, value, &start)?;
        }
        Ok(())
    }

    /// Adds an explicitly written entry. Entries that came from a `**` spread
    /// are replaced; explicit duplicates are an error.
    fn insert_entry(
        &self,
        map: &mut Map,
        explicit: &mut HashSet<String>,
        key: String,
        value: Value,
        start: &Token,
    ) -> Result<()> {
        if !explicit.insert(key.clone()) {
            return Err(self.error_at(
                ErrorKind::DuplicateKey,
                start,
                format!("duplicate key {key:?}"),
            ));
        }
        map.insert(key, value);
        Ok(())
    }

    /// Parses `**name` and checks that it names a mapping.
    fn parse_mapping_spread(&mut self) -> Result<Map> {
        let start = self.current().clone();
        match self.parse_reference()? {
            Value::Mapping(map) => Ok(map),
            Value::Constructed(c) if c.value().is_mapping() => match c.value().deep_copy() {
                Value::Mapping(map) => Ok(map),
                _ => Ok(Map::new()),
            },
            other => Err(self.error_at(
                ErrorKind::SpreadTypeMismatch,
                &start,
                format!("element after ** must be a mapping, not {}", other.kind_name()),
            )),
        }
    }

    /// Parses `*name` and returns the elements it splices.
    fn parse_iterable_spread(&mut self) -> Result<Vec<Value>> {
        let start = self.current().clone();
        let value = self.parse_reference()?;
        value.elements().ok_or_else(|| {
            self.error_at(
                ErrorKind::SpreadTypeMismatch,
                &start,
                format!("element after * must be iterable, not {}", value.kind_name()),
            )
        })
    }

    fn parse_key(&mut self) -> Result<String> {
        let token = self.current().clone();
        let key = match token.kind {
            TokenKind::Name | TokenKind::Number => token.text.clone(),
            TokenKind::String => match self.decode_string(&token)? {
                Value::String(s) => s,
                _ => {
                    return Err(self.error_at(
                        ErrorKind::InvalidKey,
                        &token,
                        "byte strings cannot be used as keys",
                    ))
                }
            },
            _ => return Err(self.unexpected("a key")),
        };
        self.cursor.advance();
        Ok(key)
    }

    /// Parses `key: value` in a block, returning the key and its value.
    fn parse_key_value(&mut self, allow_typed_block: bool) -> Result<(String, Value)> {
        let key = self.parse_key()?;
        self.expect(&[Pat::Op(":")], "':'")?;
        let value = self.scoped(key.clone(), |p| p.parse_key_value_rest(allow_typed_block))?;
        Ok((key, value))
    }

    fn parse_key_value_rest(&mut self, allow_typed_block: bool) -> Result<Value> {
        let name = Pat::Kind(TokenKind::Name);
        let newline = Pat::Kind(TokenKind::Newline);
        let indent = Pat::Kind(TokenKind::Indent);

        if (allow_typed_block && self.test(&[name, newline, indent, Pat::Key, Pat::Op(":")]))
            || self.test(&[name, newline, indent, Pat::Bullet])
        {
            let name_token = self.current().clone();
            self.cursor.advance();
            let block = self.parse_section_block(false, Map::new(), HashSet::new())?;
            return self.call_constructor(&name_token, vec![block], Map::new());
        }

        if self.test(&[Pat::Op("@")]) {
            let referenced = self.parse_reference()?;
            let start = self.current().clone();
            let merges = if self.current().kind == TokenKind::Newline {
                self.test(&[newline, indent]) || self.test(&[newline, Pat::Bullet])
            } else {
                !self.at_value_end()
            };
            if merges {
                let literal = self.parse_key_value_rest(true)?;
                return self.merge(literal, referenced, &start);
            }
            return Ok(referenced);
        }

        if self.test(&[newline, Pat::Bullet]) {
            self.cursor.advance();
            return self.parse_list_block(false);
        }

        if self.eat(&[newline, indent]) {
            if self.test(&[Pat::Key, Pat::Op(":")]) || self.test(&[Pat::Bullet]) || self.test(&[Pat::Op("**")]) {
                return self.parse_section_block(true, Map::new(), HashSet::new());
            }
            if self.test(&[Pat::Op("*")]) {
                return Err(self.unexpected("a key, a list marker or a value"));
            }
            let value = self.parse_value()?;
            if !self.eat_line_break() {
                return Err(self.unexpected("end of line"));
            }
            self.expect(&[Pat::Kind(TokenKind::Dedent)], "the end of the indented block")?;
            return Ok(value);
        }

        if self.test(&[Pat::Key, Pat::Op(":")]) {
            let key = self.parse_key()?;
            self.expect(&[Pat::Op(":")], "':'")?;
            let value = self.scoped(key.clone(), |p| p.parse_key_value_rest(true))?;
            let mut map = Map::new();
            map.insert(key, value);
            return Ok(Value::Mapping(map));
        }

        if self.test(&[newline, Pat::Op("{")]) || self.test(&[newline, Pat::Op("[")]) || self.test(&[newline, Pat::Op("(")]) {
            self.cursor.advance();
        }
        self.parse_value()
    }

    /// Parses an indented block holding either `key: value` lines or a bullet
    /// list. `seed` holds entries that precede the block on the same line.
    fn parse_section_block(&mut self, ate_indent: bool, seed: Map, explicit: HashSet<String>) -> Result<Value> {
        if !ate_indent {
            self.expect(
                &[Pat::Kind(TokenKind::Newline), Pat::Kind(TokenKind::Indent)],
                "an indented block",
            )?;
        }
        if seed.is_empty() && self.test(&[Pat::Bullet]) {
            return self.parse_list_block(true);
        }
        self.parse_mapping_body(seed, explicit, BodyEnd::Dedent)
            .map(Value::Mapping)
    }

    // Bullet lists

    /// Parses a bullet list. With `indented`, the list ends at a dedent that
    /// is consumed; otherwise it ends before the first line that does not
    /// carry the next marker.
    fn parse_list_block(&mut self, indented: bool) -> Result<Value> {
        let first = self.current().clone();
        let mut marker = if numbered_marker(&first) == Some(1) {
            Marker::Numbered(1)
        } else if matches(&first, Pat::Dash) {
            Marker::Dash(first.text.clone())
        } else {
            return Err(self.unexpected("a list marker"));
        };
        self.cursor.advance();

        let mut items = Vec::new();
        self.parse_bullet_element(&mut items)?;
        loop {
            if let Marker::Numbered(n) = marker {
                marker = Marker::Numbered(n + 1);
            }
            self.cursor.push_marker();
            if self.eat_line_break() && self.eat_marker(&marker)? {
                self.cursor.pop_marker(false);
                self.parse_bullet_element(&mut items)?;
            } else {
                self.cursor.pop_marker(true);
                break;
            }
        }
        if indented {
            self.eat_line_break();
            self.expect(&[Pat::Kind(TokenKind::Dedent)], "the end of the list")?;
        }
        Ok(Value::Sequence(items))
    }

    fn eat_marker(&mut self, marker: &Marker) -> Result<bool> {
        let token = self.current().clone();
        match marker {
            Marker::Dash(dash) => {
                if token.is_op(dash) {
                    self.cursor.advance();
                    return Ok(true);
                }
                Ok(false)
            }
            Marker::Numbered(expected) => match numbered_marker(&token) {
                Some(found) if !self.cursor.look_ahead(1).is_op(":") => {
                    if found != *expected {
                        return Err(self.error_at(
                            ErrorKind::InvalidNumberedList,
                            &token,
                            format!("expected list item {expected}., found {}", token.text),
                        ));
                    }
                    self.cursor.advance();
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }

    fn parse_bullet_element(&mut self, items: &mut Vec<Value>) -> Result<()> {
        if self.test(&[Pat::Op("*")]) {
            items.extend(self.parse_iterable_spread()?);
            return Ok(());
        }
        let index = items.len().to_string();
        let value = self.scoped(index, |p| p.parse_bullet_value())?;
        items.push(value);
        Ok(())
    }

    fn parse_bullet_value(&mut self) -> Result<Value> {
        let newline_indent = [Pat::Kind(TokenKind::Newline), Pat::Kind(TokenKind::Indent)];
        if self.test(&[Pat::Kind(TokenKind::Newline)]) {
            return self.parse_section_block(false, Map::new(), HashSet::new());
        }
        if self.test(&[Pat::Key, Pat::Op(":")]) {
            let (key, value) = self.parse_key_value(false)?;
            let mut map = Map::new();
            map.insert(key.clone(), value);
            if self.test(&newline_indent) {
                return self.parse_section_block(false, map, HashSet::from([key]));
            }
            return Ok(Value::Mapping(map));
        }
        if self.test(&[Pat::Op("**")]) {
            let map = self.parse_mapping_spread()?;
            if self.test(&newline_indent) {
                return self.parse_section_block(false, map, HashSet::new());
            }
            return Ok(Value::Mapping(map));
        }
        if self.test(&[Pat::Dash]) {
            return self.parse_nested_bullets();
        }
        if self.test(&[Pat::Op("@")]) {
            let referenced = self.parse_reference()?;
            if self.at_value_end() {
                return Ok(referenced);
            }
            let start = self.current().clone();
            let literal = self.parse_value()?;
            return self.merge(literal, referenced, &start);
        }
        self.parse_value()
    }

    /// A list opened by a dash right after another bullet (`- - 1`). Its
    /// further elements sit on indented lines below.
    fn parse_nested_bullets(&mut self) -> Result<Value> {
        let marker = Marker::Dash(self.current().text.clone());
        self.cursor.advance();
        let mut inner = Vec::new();
        self.parse_bullet_element(&mut inner)?;
        if self.eat(&[Pat::Kind(TokenKind::Newline), Pat::Kind(TokenKind::Indent)]) {
            if !self.eat_marker(&marker)? {
                return Err(self.unexpected("the same list marker"));
            }
            self.parse_bullet_element(&mut inner)?;
            loop {
                self.cursor.push_marker();
                if self.eat_line_break() && self.eat_marker(&marker)? {
                    self.cursor.pop_marker(false);
                    self.parse_bullet_element(&mut inner)?;
                } else {
                    self.cursor.pop_marker(true);
                    break;
                }
            }
            self.eat_line_break();
            self.expect(&[Pat::Kind(TokenKind::Dedent)], "the end of the list")?;
        }
        Ok(Value::Sequence(inner))
    }

    // Values

    /// Parses a single value: a reference, call, bracketed literal or scalar.
    fn parse_value(&mut self) -> Result<Value> {
        if self.test(&[Pat::Op("@")]) {
            let referenced = self.parse_reference()?;
            if self.at_value_end() {
                return Ok(referenced);
            }
            let start = self.current().clone();
            let literal = self.parse_value()?;
            return self.merge(literal, referenced, &start);
        }
        if self.test(&[Pat::Kind(TokenKind::Name), Pat::Op("(")]) {
            return self.parse_call();
        }
        if self.test(&[Pat::Op("{")]) {
            return self.parse_braces();
        }
        if self.test(&[Pat::Op("[")]) {
            self.cursor.advance();
            let mut items = Collector::new(false);
            self.parse_delimited("]", |p| p.parse_sequence_element(&mut items))?;
            return Ok(Value::Sequence(items.items));
        }
        if self.test(&[Pat::Op("(")]) {
            self.cursor.advance();
            let mut items = Collector::new(false);
            self.parse_delimited(")", |p| p.parse_sequence_element(&mut items))?;
            return Ok(Value::Tuple(items.items));
        }
        self.parse_simple_value()
    }

    /// Parses bracketed elements up to and including `close`. Elements are
    /// separated by commas, line breaks, or both.
    fn parse_delimited(
        &mut self,
        close: &'static str,
        mut element: impl FnMut(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.skip_blanks();
        if self.eat(&[Pat::Op(",")]) {
            self.skip_blanks();
            return self.expect(&[Pat::Op(close)], &format!("'{close}'"));
        }
        loop {
            if self.eat(&[Pat::Op(close)]) {
                return Ok(());
            }
            element(self)?;
            let broke = self.skip_blanks();
            if self.eat(&[Pat::Op(",")]) {
                self.skip_blanks();
            } else if !broke {
                return self.expect(&[Pat::Op(close)], &format!("',' or '{close}'"));
            }
        }
    }

    fn parse_braces(&mut self) -> Result<Value> {
        self.cursor.advance();
        self.skip_blanks();
        if self.eat(&[Pat::Op("}")]) {
            return Ok(Value::Mapping(Map::new()));
        }
        if self.eat(&[Pat::Op(",")]) {
            self.skip_blanks();
            self.expect(&[Pat::Op("}")], "'}'")?;
            return Ok(Value::Set(Set::new()));
        }
        if self.test(&[Pat::Op("**")]) || self.test(&[Pat::Key, Pat::Op(":")]) {
            let mut map = Map::new();
            let mut explicit = HashSet::new();
            self.parse_delimited("}", |p| p.parse_inline_entry(&mut map, &mut explicit))?;
            return Ok(Value::Mapping(map));
        }
        let mut items = Collector::new(true);
        self.parse_delimited("}", |p| p.parse_sequence_element(&mut items))?;
        Ok(Value::Set(items.items.into_iter().collect()))
    }

    fn parse_inline_entry(&mut self, map: &mut Map, explicit: &mut HashSet<String>) -> Result<()> {
        let start = self.current().clone();
        if self.test(&[Pat::Op("**")]) {
            let spread = self.parse_mapping_spread()?;
            spread_into(map, spread);
            return Ok(());
        }
        if self.test(&[Pat::Op("*")]) {
            return Err(self.error_at(
                ErrorKind::UnexpectedToken,
                &start,
                "'*' spreads are not allowed in a mapping",
            ));
        }
        let (key, value) = self.parse_inline_key_value()?;
        self.insert_entry(map, explicit, key, value, &start)
    }

    /// Parses `key: value` inside brackets. The key and its colon share a line.
    fn parse_inline_key_value(&mut self) -> Result<(String, Value)> {
        let key = self.parse_key()?;
        self.expect(&[Pat::Op(":")], "':'")?;
        self.skip_blanks();
        let value = self.scoped(key.clone(), |p| p.parse_inline_key_value_rest())?;
        Ok((key, value))
    }

    fn parse_inline_key_value_rest(&mut self) -> Result<Value> {
        if self.test(&[Pat::Op("@")]) {
            let referenced = self.parse_reference()?;
            if self.at_value_end() {
                return Ok(referenced);
            }
            let start = self.current().clone();
            let literal = self.parse_inline_key_value_rest()?;
            return self.merge(literal, referenced, &start);
        }
        if self.test(&[Pat::Key, Pat::Op(":")]) {
            let (key, value) = self.parse_inline_key_value()?;
            let mut map = Map::new();
            map.insert(key, value);
            return Ok(Value::Mapping(map));
        }
        self.parse_value()
    }

    /// Parses one element of a list, tuple, set or positional argument list.
    fn parse_sequence_element(&mut self, items: &mut Collector) -> Result<()> {
        let start = self.current().clone();
        if self.test(&[Pat::Key, Pat::Op(":")]) {
            let index = if items.grouping {
                items.items.len() - 1
            } else {
                items.items.len()
            };
            self.scopes.enter(index.to_string());
            let result = self.parse_grouped_entry(items, &start);
            self.scopes.exit(result.as_ref().ok().and_then(|_| items.items.last()));
            return result;
        }
        items.grouping = false;
        if self.test(&[Pat::Op("*")]) {
            for element in self.parse_iterable_spread()? {
                self.collect(items, element, &start)?;
            }
            return Ok(());
        }
        if self.test(&[Pat::Op("**")]) {
            return Err(self.error_at(
                ErrorKind::UnexpectedToken,
                &start,
                "'**' spreads are not allowed in a sequence",
            ));
        }
        self.scopes.enter(items.items.len().to_string());
        let result = self.parse_value();
        self.scopes.exit(result.as_ref().ok());
        self.collect(items, result?, &start)
    }

    /// Adds a `key: value` element, extending the preceding grouped mapping
    /// unless it already holds the key.
    fn parse_grouped_entry(&mut self, items: &mut Collector, start: &Token) -> Result<()> {
        let (key, value) = self.parse_inline_key_value()?;
        if items.grouping {
            if let Some(Value::Mapping(group)) = items.items.last_mut() {
                if !group.contains_key(&key) {
                    group.insert(key, value);
                    return Ok(());
                }
            }
        }
        let mut group = Map::new();
        group.insert(key, value);
        self.collect(items, Value::Mapping(group), start)?;
        items.grouping = true;
        Ok(())
    }

    fn collect(&self, items: &mut Collector, value: Value, start: &Token) -> Result<()> {
        if items.unique && items.items.contains(&value) {
            return Err(self.error_at(
                ErrorKind::DuplicateSetElement,
                start,
                format!("duplicate set element {value}"),
            ));
        }
        items.items.push(value);
        Ok(())
    }

    // Named calls

    fn parse_call(&mut self) -> Result<Value> {
        let name_token = self.current().clone();
        self.cursor.advance();
        self.cursor.advance();

        let mut args = Collector::new(false);
        let mut kwargs = Map::new();
        let mut explicit = HashSet::new();
        let mut keywords = false;
        self.scopes.detach();
        let parsed = self.parse_delimited(")", |p| {
            let start = p.current().clone();
            if p.test(&[Pat::Op("**")]) {
                let spread = p.parse_mapping_spread()?;
                spread_into(&mut kwargs, spread);
                keywords = true;
                return Ok(());
            }
            if p.test(&[Pat::Kind(TokenKind::Name), Pat::Op("=")]) {
                let name = start.text.clone();
                p.cursor.advance();
                p.cursor.advance();
                p.skip_blanks();
                let value = p.scoped(name.clone(), Self::parse_value)?;
                if !explicit.insert(name.clone()) {
                    return Err(p.error_at(
                        ErrorKind::DuplicateKey,
                        &start,
                        format!("duplicate keyword argument {name:?}"),
                    ));
                }
                kwargs.insert(name, value);
                keywords = true;
                return Ok(());
            }
            if keywords {
                return Err(p.error_at(
                    ErrorKind::UnexpectedToken,
                    &start,
                    "positional argument follows keyword argument",
                ));
            }
            p.parse_sequence_element(&mut args)
        });
        self.scopes.reattach();
        parsed?;
        self.call_constructor(&name_token, args.items, kwargs)
    }

    fn call_constructor(&mut self, name_token: &Token, args: Vec<Value>, kwargs: Map) -> Result<Value> {
        let name = name_token.text.as_str();
        let qualified = self.imports.qualify(name);
        let Some(factory) = self.options.registry.resolve(&qualified) else {
            return Err(self.error_at(
                ErrorKind::UnresolvableConstructor,
                name_token,
                format!("no constructor named {name:?} is registered"),
            ));
        };
        trace!(name = qualified.as_str(), args = args.len(), kwargs = kwargs.len(), "calling constructor");
        registry::invoke(&qualified, factory, args, kwargs).map_err(|err| {
            self.error_at(
                ErrorKind::FactoryInvocation,
                name_token,
                format!("constructor {name:?} failed: {err}"),
            )
            .with_cause(err)
        })
    }

    // References

    /// Parses `@name`, `*name` or `**name` and returns a deep copy of the
    /// value it refers to.
    fn parse_reference(&mut self) -> Result<Value> {
        let op = self.current().clone();
        self.cursor.advance();
        let token = self.current().clone();
        let name = match token.kind {
            TokenKind::Name | TokenKind::Number => token.text.clone(),
            TokenKind::String => match self.decode_string(&token)? {
                Value::String(s) => s,
                _ => return Err(self.unexpected("a reference name")),
            },
            _ => return Err(self.unexpected("a reference name")),
        };
        self.cursor.advance();
        match self.resolve(&name) {
            Some(value) => {
                trace!(name = name.as_str(), op = op.text.as_str(), "resolved reference");
                Ok(value)
            }
            None => Err(self.error_at(
                ErrorKind::UndefinedReference,
                &op,
                format!("undefined reference to {name:?}"),
            )),
        }
    }

    /// Looks `name` up exactly, then walks the dotted suffix from the longest
    /// bound prefix down to the shortest.
    fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.scopes.lookup(name) {
            return Some(value.deep_copy());
        }
        let mut end = name.len();
        while let Some(dot) = name[..end].rfind('.') {
            if let Some(base) = self.scopes.lookup(&name[..dot]) {
                if let Some(found) = walk(base, &name[dot + 1..]) {
                    return Some(found);
                }
            }
            end = dot;
        }
        None
    }

    /// Combines literal content written after `@name` with the referenced
    /// value. Literal entries win; referenced elements are appended.
    fn merge(&self, literal: Value, referenced: Value, start: &Token) -> Result<Value> {
        let referenced = match referenced {
            Value::Constructed(c) => c.value().deep_copy(),
            other => other,
        };
        trace!(
            literal = literal.kind_name(),
            referenced = referenced.kind_name(),
            "merging reference"
        );
        match (literal, referenced) {
            (Value::Mapping(mut map), Value::Mapping(from)) => {
                spread_into(&mut map, from);
                Ok(Value::Mapping(map))
            }
            (Value::Sequence(mut items), Value::Sequence(more)) => {
                items.extend(more);
                Ok(Value::Sequence(items))
            }
            (Value::Tuple(mut items), Value::Tuple(more)) => {
                items.extend(more);
                Ok(Value::Tuple(items))
            }
            (Value::Set(mut set), Value::Set(more)) => {
                for element in more {
                    set.insert(element);
                }
                Ok(Value::Set(set))
            }
            (literal, referenced) => Err(self.error_at(
                ErrorKind::MergeTypeMismatch,
                start,
                format!(
                    "cannot merge {} into {}",
                    literal.kind_name(),
                    referenced.kind_name()
                ),
            )),
        }
    }

    // Scalars

    fn decode_string(&self, token: &Token) -> Result<Value> {
        literal::decode_string(&token.text)
            .map_err(|msg| self.error_at(ErrorKind::InvalidLiteral, token, msg))
    }

    fn parse_simple_value(&mut self) -> Result<Value> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number => {
                self.cursor.advance();
                let value = literal::decode_number(&token.text)
                    .map_err(|msg| self.error_at(ErrorKind::InvalidLiteral, &token, msg))?;
                Ok(self.parse_imaginary_rest(value, &token))
            }
            TokenKind::String => {
                self.cursor.advance();
                self.decode_string(&token)
            }
            TokenKind::Name => {
                self.cursor.advance();
                let constants = self.options.constants;
                let text = token.text.as_str();
                if text == constants.true_() {
                    return Ok(Value::Bool(true));
                }
                if text == constants.false_() {
                    return Ok(Value::Bool(false));
                }
                if text == constants.null() {
                    return Ok(Value::Null);
                }
                match self.non_finite(text) {
                    Some((value, true)) => Ok(Value::Complex(Complex::new(0.0, value))),
                    Some((value, false)) => Ok(self.parse_imaginary_rest(Value::Float(value), &token)),
                    None => Ok(Value::String(token.text)),
                }
            }
            _ => Err(self.unexpected("a value")),
        }
    }

    /// Reads an Infinity/NaN spelling with optional sign and `j` suffix.
    /// Returns the magnitude and whether it is imaginary.
    fn non_finite(&self, text: &str) -> Option<(f64, bool)> {
        if !self.options.allow_inf_nan {
            return None;
        }
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (body, imaginary) = match unsigned.strip_suffix(['j', 'J']) {
            Some(body) => (body, true),
            None => (unsigned, false),
        };
        let constants = self.options.constants;
        let magnitude = if body == constants.infinity() {
            f64::INFINITY
        } else if body == constants.nan() {
            f64::NAN
        } else {
            return None;
        };
        Some((if negative { -magnitude } else { magnitude }, imaginary))
    }

    /// Joins a real number with a directly adjacent signed imaginary term
    /// (`3+4j`, `1-NaNj`) into a complex value.
    fn parse_imaginary_rest(&mut self, value: Value, real_token: &Token) -> Value {
        if value.is_complex() {
            return value;
        }
        let next = self.current().clone();
        if next.start != real_token.end || !next.text.starts_with(['+', '-']) {
            return value;
        }
        let im = match next.kind {
            TokenKind::Number if next.text.ends_with(['j', 'J']) => {
                match literal::decode_number(&next.text) {
                    Ok(Value::Complex(c)) => c.im,
                    _ => return value,
                }
            }
            TokenKind::Name => match self.non_finite(&next.text) {
                Some((im, true)) => im,
                _ => return value,
            },
            _ => return value,
        };
        let re = literal::parse_float(&real_token.text)
            .ok()
            .or_else(|| value.as_f64())
            .unwrap_or(f64::NAN);
        let re = match self.non_finite(&real_token.text) {
            Some((re, false)) => re,
            _ => re,
        };
        self.cursor.advance();
        Value::Complex(Complex::new(re, im))
    }
}

/// Copies entries of a spread or referenced mapping into `map` without
/// replacing keys it already holds.
fn spread_into(map: &mut Map, from: Map) {
    for (key, value) in from {
        map.insert_if_absent(key, value);
    }
}

/// Walks a dotted path into `value`: mapping keys, sequence, tuple and set
/// indices (negative from the end), string characters and byte values.
fn walk(value: &Value, path: &str) -> Option<Value> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let next = step(value, head)?;
    match rest {
        Some(rest) => walk(&next, rest),
        None => Some(next.into_owned().deep_copy()),
    }
}

fn step<'v>(value: &'v Value, segment: &str) -> Option<Cow<'v, Value>> {
    let index = |len: usize| -> Option<usize> {
        let i: i64 = segment.parse().ok()?;
        let i = if i < 0 { i + i64::try_from(len).ok()? } else { i };
        usize::try_from(i).ok().filter(|&i| i < len)
    };
    match value {
        Value::Mapping(map) => map.get(segment).map(Cow::Borrowed),
        Value::Sequence(items) | Value::Tuple(items) => items.get(index(items.len())?).map(Cow::Borrowed),
        Value::Set(set) => set.get(index(set.len())?).map(Cow::Borrowed),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let c = chars.get(index(chars.len())?)?;
            Some(Cow::Owned(Value::String(c.to_string())))
        }
        Value::Bytes(bytes) => {
            let b = bytes.get(index(bytes.len())?)?;
            Some(Cow::Owned(Value::from(*b)))
        }
        Value::Constructed(c) => step(c.value(), segment),
        _ => None,
    }
}
