use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::field::{FieldDef, FieldKind, Visibility};

/// Marker prefix for an exclusion token (`!name`)
pub const EXCLUDE_MARKER: char = '!';
/// Marker prefix for an exclusive-select token (`^name`)
pub const ONLY_MARKER: char = '^';
/// Separator between a relation name and the token applied beneath it
pub const PATH_SEPARATOR: char = '.';

static EMPTY: FieldSelector = FieldSelector::new();

/// A parsed field-selector expression.
///
/// The wire form is a set of string tokens (`name`, `!name`, `^name`,
/// `parent.rest`). Parsing happens once and yields one `FieldSelector` per
/// nesting level, so recursion never re-splits dotted strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
    only: BTreeSet<String>,
    nested: BTreeMap<String, FieldSelector>,
}

/// A field chosen for emission at one level, with the selector for the level beneath it
#[derive(Debug, Clone, Copy)]
pub struct Selected<'a> {
    pub def: &'a FieldDef,
    pub nested: &'a FieldSelector,
}

impl FieldSelector {
    pub const fn new() -> Self {
        Self {
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
            only: BTreeSet::new(),
            nested: BTreeMap::new(),
        }
    }

    /// The shared empty selector
    pub fn empty() -> &'static FieldSelector {
        &EMPTY
    }

    /// Parse a token list. Malformed tokens are inert.
    pub fn parse<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selector = Self::new();
        for token in tokens {
            selector.insert(token.as_ref().trim());
        }
        selector
    }

    /// Parse the comma-separated query parameter form (`^id,^items,items.^id`)
    pub fn from_query(raw: &str) -> Self {
        Self::parse(raw.split(','))
    }

    /// Union of a handler's default expression and caller overrides
    pub fn merge(defaults: &FieldSelector, overrides: &FieldSelector) -> Self {
        let mut merged = defaults.clone();
        merged.absorb(overrides);
        merged
    }

    fn absorb(&mut self, other: &FieldSelector) {
        self.include.extend(other.include.iter().cloned());
        self.exclude.extend(other.exclude.iter().cloned());
        self.only.extend(other.only.iter().cloned());
        for (parent, child) in &other.nested {
            self.nested.entry(parent.clone()).or_default().absorb(child);
        }
    }

    fn insert(&mut self, token: &str) {
        if let Some((parent, rest)) = token.split_once(PATH_SEPARATOR) {
            if parent.is_empty() || rest.is_empty() {
                return;
            }
            self.nested.entry(parent.to_string()).or_default().insert(rest);
            return;
        }

        let (set, name) = if let Some(name) = token.strip_prefix(EXCLUDE_MARKER) {
            (&mut self.exclude, name)
        } else if let Some(name) = token.strip_prefix(ONLY_MARKER) {
            (&mut self.only, name)
        } else {
            (&mut self.include, token)
        };

        if !name.is_empty() {
            set.insert(name.to_string());
        }
    }

    /// True when no token applies at this level or below
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
            && self.exclude.is_empty()
            && self.only.is_empty()
            && self.nested.is_empty()
    }

    /// Selector applying beneath `field`; empty when no token names it
    pub fn child(&self, field: &str) -> &FieldSelector {
        self.nested.get(field).unwrap_or(&EMPTY)
    }

    /// The single `^` name when this level consists of exactly that token
    pub fn exclusive_target(&self) -> Option<&str> {
        if self.only.len() == 1
            && self.include.is_empty()
            && self.exclude.is_empty()
            && self.nested.is_empty()
        {
            self.only.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    pub fn includes(&self, name: &str) -> bool {
        self.include.contains(name)
    }

    pub fn excludes(&self, name: &str) -> bool {
        self.exclude.contains(name)
    }

    /// Choose the fields to emit at this level, in declaration order.
    ///
    /// Hidden fields are removed first and never re-added. Private fields
    /// need `allow_private` or a plain inclusion token. Exclusion runs after
    /// inclusion, and any `^` token narrows the level to the `^` names.
    pub fn resolve<'a>(&'a self, declared: &'a [FieldDef], allow_private: bool) -> Vec<Selected<'a>> {
        declared
            .iter()
            .filter(|def| def.visibility != Visibility::Hidden)
            .filter(|def| {
                def.visibility != Visibility::Private || allow_private || self.includes(def.name)
            })
            .filter(|def| !self.excludes(def.name))
            .filter(|def| self.only.is_empty() || self.only.contains(def.name))
            .map(|def| Selected {
                def,
                nested: match def.kind {
                    FieldKind::Scalar => &EMPTY,
                    FieldKind::One | FieldKind::Many => self.child(def.name),
                },
            })
            .collect()
    }

    /// Flatten back to the wire token form
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        self.collect_tokens("", &mut tokens);
        tokens
    }

    fn collect_tokens(&self, prefix: &str, out: &mut Vec<String>) {
        out.extend(self.include.iter().map(|n| format!("{prefix}{n}")));
        out.extend(self.exclude.iter().map(|n| format!("{prefix}{EXCLUDE_MARKER}{n}")));
        out.extend(self.only.iter().map(|n| format!("{prefix}{ONLY_MARKER}{n}")));
        for (parent, child) in &self.nested {
            child.collect_tokens(&format!("{prefix}{parent}{PATH_SEPARATOR}"), out);
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tokens().join(","))
    }
}

impl<S: AsRef<str>> FromIterator<S> for FieldSelector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::parse(iter)
    }
}
