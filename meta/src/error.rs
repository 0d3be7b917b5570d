use std::collections::{BTreeMap, btree_map};
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::MALFORMED_KEY;
use crate::tags::InvalidTags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Emalformed,
    Eblank,
    Erequired,
    Eminrunes,
    Emaxrunes,
    Emaxbytes,
    Eutf8,
    Ebool,
    Etime,
    Eint,
    Eintrange,
    Estring,
    Efloat,
    Efloatrange,
    Emin,
    Emax,
    Ein,
    Eminlength,
    Emaxlength,
}

const CODE_NAMES: &[&str] = &[
    "malformed_json",
    "blank",
    "required",
    "min_runes",
    "max_runes",
    "max_bytes",
    "utf8",
    "bool",
    "time",
    "int",
    "int_range",
    "string",
    "float",
    "float_range",
    "min",
    "max",
    "in",
    "min_length",
    "max_length",
];

impl ErrorCode {
    pub const ALL: [Self; 19] = [
        Self::Emalformed,
        Self::Eblank,
        Self::Erequired,
        Self::Eminrunes,
        Self::Emaxrunes,
        Self::Emaxbytes,
        Self::Eutf8,
        Self::Ebool,
        Self::Etime,
        Self::Eint,
        Self::Eintrange,
        Self::Estring,
        Self::Efloat,
        Self::Efloatrange,
        Self::Emin,
        Self::Emax,
        Self::Ein,
        Self::Eminlength,
        Self::Emaxlength,
    ];

    /// Wire name of the code, as rendered in error maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emalformed => "malformed_json",
            Self::Eblank => "blank",
            Self::Erequired => "required",
            Self::Eminrunes => "min_runes",
            Self::Emaxrunes => "max_runes",
            Self::Emaxbytes => "max_bytes",
            Self::Eutf8 => "utf8",
            Self::Ebool => "bool",
            Self::Etime => "time",
            Self::Eint => "int",
            Self::Eintrange => "int_range",
            Self::Estring => "string",
            Self::Efloat => "float",
            Self::Efloatrange => "float_range",
            Self::Emin => "min",
            Self::Emax => "max",
            Self::Ein => "in",
            Self::Eminlength => "min_length",
            Self::Emaxlength => "max_length",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or(())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ErrorCodeVisitor;

        impl Visitor<'_> for ErrorCodeVisitor {
            type Value = ErrorCode;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid error code string")
            }

            fn visit_str<E>(self, value: &str) -> Result<ErrorCode, E>
            where
                E: de::Error,
            {
                ErrorCode::from_str(value).map_err(|()| de::Error::unknown_variant(value, CODE_NAMES))
            }
        }

        deserializer.deserialize_str(ErrorCodeVisitor)
    }
}

/// A decode failure, shaped like the input that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorTree {
    Atom(ErrorCode),
    Map(ErrorMap),
    List(ErrorList),
}

impl ErrorTree {
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Atom(code) => Some(*code),
            Self::Map(_) | Self::List(_) => None,
        }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(code) => code.fmt(f),
            Self::Map(map) => map.fmt(f),
            Self::List(list) => list.fmt(f),
        }
    }
}

impl std::error::Error for ErrorTree {}

impl From<ErrorCode> for ErrorTree {
    fn from(code: ErrorCode) -> Self {
        Self::Atom(code)
    }
}

impl From<ErrorMap> for ErrorTree {
    fn from(map: ErrorMap) -> Self {
        Self::Map(map)
    }
}

impl From<ErrorList> for ErrorTree {
    fn from(list: ErrorList) -> Self {
        Self::List(list)
    }
}

/// Field errors keyed by external field name, rendered in sorted key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, ErrorTree>);

impl ErrorMap {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// The single top-level error reported for structurally broken input.
    #[must_use]
    pub fn malformed() -> Self {
        Self::single(MALFORMED_KEY, ErrorCode::Emalformed)
    }

    #[must_use]
    pub fn single(key: impl Into<String>, error: impl Into<ErrorTree>) -> Self {
        let mut map = Self::new();
        map.insert(key, error);
        map
    }

    pub fn insert(&mut self, key: impl Into<String>, error: impl Into<ErrorTree>) {
        self.0.insert(key.into(), error.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ErrorTree> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.0.len() == 1
            && self.get(MALFORMED_KEY) == Some(&ErrorTree::Atom(ErrorCode::Emalformed))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ErrorTree> {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for ErrorMap
where
    K: Into<String>,
    V: Into<ErrorTree>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, error)| (key.into(), error.into()))
                .collect(),
        )
    }
}

impl IntoIterator for ErrorMap {
    type Item = (String, ErrorTree);
    type IntoIter = btree_map::IntoIter<String, ErrorTree>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorMap {
    type Item = (&'a String, &'a ErrorTree);
    type IntoIter = btree_map::Iter<'a, String, ErrorTree>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ErrorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl std::error::Error for ErrorMap {}

/// Element errors aligned to input positions; `None` marks an element that decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorList(Vec<Option<ErrorTree>>);

impl ErrorList {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: Option<ErrorTree>) {
        self.0.push(error);
    }

    /// Number of positions that actually failed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.0.iter().filter(|error| error.is_some()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ErrorTree> {
        self.0.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Option<ErrorTree>> {
        self.0.iter()
    }
}

impl<V> FromIterator<Option<V>> for ErrorList
where
    V: Into<ErrorTree>,
{
    fn from_iter<I: IntoIterator<Item = Option<V>>>(iter: I) -> Self {
        Self(iter.into_iter().map(|error| error.map(Into::into)).collect())
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl std::error::Error for ErrorList {}

/// A tag value that a field type could not interpret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value {value:?} for `{key}`")]
pub struct InvalidOption {
    pub key: String,
    pub value: String,
}

/// Raised while building a schema, never while decoding.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{type_name}.{field}: {source}")]
    Tags {
        type_name: &'static str,
        field: String,
        source: InvalidTags,
    },
    #[error("{type_name}.{field}: {source}")]
    Option {
        type_name: &'static str,
        field: String,
        source: InvalidOption,
    },
    #[error("{type_name} declares more than one catch-all field")]
    DuplicateCatchAll { type_name: &'static str },
    #[error("{type_name} cannot embed itself")]
    RecursiveEmbed { type_name: &'static str },
}
