use std::borrow::Cow;

use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::JsonCodec;
use crate::constants::PATH_SEPARATOR;
use crate::error::ErrorCode;
use crate::form::FormTree;

/// Owns a parsed JSON body so that sources can borrow from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonInput {
    Absent,
    Parsed(Value),
    Malformed,
}

impl JsonInput {
    /// Zero-length input is absent rather than malformed.
    #[must_use]
    pub fn parse(codec: &dyn JsonCodec, bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Absent;
        }
        match codec.parse(bytes) {
            Ok(value) => Self::Parsed(value),
            Err(e) => {
                debug!(error = %e, len = bytes.len(), "json input is malformed");
                Self::Malformed
            }
        }
    }

    #[must_use]
    pub const fn source(&self) -> Source<'_> {
        match self {
            Self::Absent => Source::empty(),
            Self::Parsed(value) => Source::json(value),
            Self::Malformed => Source::malformed(),
        }
    }
}

#[derive(Debug, Clone)]
enum Node<'a> {
    Empty,
    Json(&'a Value),
    Map(&'a Map<String, Value>),
    Form(&'a FormTree),
    Merged(Vec<Source<'a>>),
}

/// A position in an input tree, reached by successive `get` calls from the root.
///
/// Lookups never fail: a missing key yields an empty source, and a lookup
/// that contradicts the input's shape yields a malformed one. Malformation is
/// inherited by every descendant.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    node: Node<'a>,
    path: String,
    malformed: bool,
}

impl<'a> Source<'a> {
    #[must_use]
    pub const fn empty() -> Self {
        Self::root(Node::Empty)
    }

    const fn malformed() -> Self {
        Self {
            node: Node::Empty,
            path: String::new(),
            malformed: true,
        }
    }

    #[must_use]
    pub const fn json(value: &'a Value) -> Self {
        Self::root(Node::Json(value))
    }

    #[must_use]
    pub const fn map(map: &'a Map<String, Value>) -> Self {
        Self::root(Node::Map(map))
    }

    #[must_use]
    pub const fn form(tree: &'a FormTree) -> Self {
        Self::root(Node::Form(tree))
    }

    /// Overlays sources; earlier ones take precedence.
    #[must_use]
    pub const fn merged(sources: Vec<Self>) -> Self {
        Self::root(Node::Merged(sources))
    }

    const fn root(node: Node<'a>) -> Self {
        Self {
            node,
            path: String::new(),
            malformed: false,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Self {
        let (node, malformed) = match self.node {
            Node::Empty => (Node::Empty, false),
            Node::Json(value) => lookup(value, key),
            Node::Map(map) => lookup_object(map, key),
            Node::Form(tree) => (tree.child(key).map_or(Node::Empty, Node::Form), false),
            Node::Merged(ref sources) => (
                Node::Merged(sources.iter().map(|source| source.get(key)).collect()),
                false,
            ),
        };

        Self {
            node,
            path: join_path(&self.path, key),
            malformed: self.malformed || malformed,
        }
    }

    /// True when nothing was supplied at this position. An explicit JSON
    /// `null` is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.node {
            Node::Empty => true,
            Node::Json(_) | Node::Map(_) => false,
            Node::Form(tree) => tree.is_empty(),
            Node::Merged(sources) => sources.iter().all(Self::is_empty),
        }
    }

    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.malformed
            || matches!(&self.node, Node::Merged(sources) if sources.iter().any(Self::is_malformed))
    }

    pub fn value(&self) -> Result<Cow<'a, Value>, ErrorCode> {
        if self.malformed {
            return Err(ErrorCode::Emalformed);
        }
        match self.node {
            Node::Empty => Err(ErrorCode::Eblank),
            Node::Json(value) => Ok(Cow::Borrowed(value)),
            Node::Map(map) => Ok(Cow::Owned(Value::Object(map.clone()))),
            Node::Form(tree) if !tree.is_valid_utf8() => Err(ErrorCode::Eutf8),
            Node::Form(tree) => Ok(Cow::Owned(Value::String(tree.first_value().to_string()))),
            Node::Merged(ref sources) => {
                for source in sources {
                    if source.is_malformed() {
                        return Err(ErrorCode::Emalformed);
                    }
                    if !source.is_empty() {
                        return source.value();
                    }
                }
                Err(ErrorCode::Eblank)
            }
        }
    }

    /// Immediate children as an untyped map. Merged sources keep the first
    /// value seen for a key.
    #[must_use]
    pub fn value_map(&self) -> Map<String, Value> {
        if self.malformed {
            return Map::new();
        }
        match self.node {
            Node::Empty => Map::new(),
            Node::Json(value) => value.as_object().cloned().unwrap_or_default(),
            Node::Map(map) => map.clone(),
            Node::Form(tree) => tree.to_map(),
            Node::Merged(ref sources) => {
                let mut merged = Map::new();
                for source in sources {
                    for (key, value) in source.value_map() {
                        merged.entry(key).or_insert(value);
                    }
                }
                merged
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{key}")
    }
}

fn is_index(key: &str) -> bool {
    key.parse::<usize>().is_ok()
}

fn lookup<'a>(value: &'a Value, key: &str) -> (Node<'a>, bool) {
    match value {
        Value::Null => (Node::Empty, false),
        Value::Object(map) => lookup_object(map, key),
        Value::Array(items) => key.parse::<usize>().map_or((Node::Empty, true), |index| {
            (items.get(index).map_or(Node::Empty, Node::Json), false)
        }),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => (Node::Empty, true),
    }
}

fn lookup_object<'a>(map: &'a Map<String, Value>, key: &str) -> (Node<'a>, bool) {
    if is_index(key) {
        return (Node::Empty, true);
    }
    (map.get(key).map_or(Node::Empty, Node::Json), false)
}
