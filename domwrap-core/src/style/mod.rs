//! Inline style codec.
//!
//! `encode` turns an ordered [`StyleMap`] into a `style` attribute string and
//! `decode` parses one back. The two are deliberately asymmetric: composite
//! values such as `transform:scale(3)rotate(10deg)` can be written but are
//! read back as plain text, since decoding only exists to merge new
//! declarations into the ones already on a node.
//!
//! Declarations are tokenized with `cssparser`'s `DeclarationParser`, so a
//! `;` inside `url(...)` or a quoted string does not split a declaration.

use std::fmt;

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
};
use indexmap::IndexMap;
use smallvec::SmallVec;

/// Value of a single style property.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// Written as `key:value`.
    Value(String),
    /// Dropped from the output, and from the node when merged with `set_style`.
    Remove,
    /// Written as `key:name(args)name(args)...`.
    Functions(StyleFunctions),
}

/// Ordered `name(args)` list making up a composite value like a transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleFunctions(IndexMap<String, FunctionArgs>);

/// Arguments of one style function, joined with `,` when written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionArgs(SmallVec<[String; 2]>);

/// Ordered mapping of property name to value. Re-inserting a key keeps its
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleMap(IndexMap<String, StyleValue>);

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StyleMap::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Option<StyleValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, StyleValue> {
        self.0.iter()
    }

    /// Overlays `other` on top of `self`: existing keys are replaced in
    /// place, new keys are appended.
    pub fn merge(&mut self, other: &StyleMap) {
        for (key, value) in other {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl<'a> IntoIterator for &'a StyleMap {
    type Item = (&'a String, &'a StyleValue);
    type IntoIter = indexmap::map::Iter<'a, String, StyleValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<StyleValue>> FromIterator<(K, V)> for StyleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = StyleMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl StyleFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, args: impl Into<FunctionArgs>) -> Self {
        self.0.insert(name.into(), args.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StyleFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, args) in &self.0 {
            write!(f, "{name}({args})")?;
        }
        Ok(())
    }
}

impl fmt::Display for FunctionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl From<&str> for FunctionArgs {
    fn from(value: &str) -> Self {
        FunctionArgs(SmallVec::from_elem(value.to_string(), 1))
    }
}

impl From<String> for FunctionArgs {
    fn from(value: String) -> Self {
        FunctionArgs(SmallVec::from_elem(value, 1))
    }
}

impl From<f64> for FunctionArgs {
    fn from(value: f64) -> Self {
        FunctionArgs(SmallVec::from_elem(value.to_string(), 1))
    }
}

impl From<i32> for FunctionArgs {
    fn from(value: i32) -> Self {
        FunctionArgs(SmallVec::from_elem(value.to_string(), 1))
    }
}

impl<const N: usize> From<[&str; N]> for FunctionArgs {
    fn from(values: [&str; N]) -> Self {
        FunctionArgs(values.iter().map(|v| v.to_string()).collect())
    }
}

impl From<Vec<String>> for FunctionArgs {
    fn from(values: Vec<String>) -> Self {
        FunctionArgs(values.into_iter().collect())
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Value(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Value(value)
    }
}

impl From<&String> for StyleValue {
    fn from(value: &String) -> Self {
        StyleValue::Value(value.clone())
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Value(value.to_string())
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        StyleValue::Value(value.to_string())
    }
}

/// `false` removes the property; `true` is written literally.
impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        if value {
            StyleValue::Value("true".to_string())
        } else {
            StyleValue::Remove
        }
    }
}

impl From<StyleFunctions> for StyleValue {
    fn from(value: StyleFunctions) -> Self {
        StyleValue::Functions(value)
    }
}

/// Serializes `map` as `key:value` pairs joined with `;`. Entries set to
/// [`StyleValue::Remove`] are skipped entirely.
pub fn encode(map: &StyleMap) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            StyleValue::Value(v) => parts.push(format!("{key}:{v}")),
            StyleValue::Functions(functions) => parts.push(format!("{key}:{functions}")),
            StyleValue::Remove => {}
        }
    }
    parts.join(";")
}

/// Parses a `style` attribute into scalar declarations in source order.
/// `None` (no attribute) gives an empty map; malformed declarations are
/// skipped.
pub fn decode(style: Option<&str>) -> StyleMap {
    let Some(style) = style else {
        return StyleMap::new();
    };

    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);
    let mut declarations = InlineDeclarations;

    RuleBodyParser::new(&mut parser, &mut declarations)
        .flatten()
        .collect()
}

struct InlineDeclarations;

impl<'i> DeclarationParser<'i> for InlineDeclarations {
    type Declaration = (String, String);
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<(String, String), ParseError<'i, ()>> {
        let start = input.position();
        while input.next().is_ok() {}
        let value = input.slice_from(start).trim();
        Ok((name.as_ref().to_owned(), value.to_owned()))
    }
}

impl<'i> AtRuleParser<'i> for InlineDeclarations {
    type Prelude = ();
    type AtRule = (String, String);
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for InlineDeclarations {
    type Prelude = ();
    type QualifiedRule = (String, String);
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, (String, String), ()> for InlineDeclarations {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}
