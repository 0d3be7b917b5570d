use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::{TAG_IN, TAG_MAX, TAG_MIN};
use crate::decoder::DecoderOptions;
use crate::error::{ErrorCode, ErrorTree, InvalidOption};
use crate::tags::Tags;
use crate::valuer::{BlankOptions, Valuer};

/// Integer types an [`Int`] can hold.
pub trait Integer:
    FromStr<Err = ParseIntError>
    + Copy
    + PartialOrd
    + Default
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl Integer for i64 {}
impl Integer for u64 {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Int<N> {
    pub val: N,
    pub null: bool,
    pub present: bool,
    pub path: String,
}

pub type Int64 = Int<i64>;
pub type Uint64 = Int<u64>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntOptions<N> {
    pub blank: BlankOptions,
    pub min: Option<N>,
    pub max: Option<N>,
    pub allowed: Vec<N>,
}

impl<N: Integer> IntOptions<N> {
    pub fn from_tags(tags: &Tags) -> Result<Self, InvalidOption> {
        Ok(Self {
            blank: BlankOptions::from_tags(tags),
            min: tags.parse(TAG_MIN)?,
            max: tags.parse(TAG_MAX)?,
            allowed: tags.list(TAG_IN)?,
        })
    }

    fn check(&self, n: N) -> Result<(), ErrorCode> {
        if self.min.is_some_and(|min| n < min) {
            return Err(ErrorCode::Emin);
        }
        if self.max.is_some_and(|max| n > max) {
            return Err(ErrorCode::Emax);
        }
        if !self.allowed.is_empty() && !self.allowed.contains(&n) {
            return Err(ErrorCode::Ein);
        }
        Ok(())
    }
}

fn parse_int<N: Integer>(value: &str) -> Result<N, ErrorCode> {
    value.parse().map_err(|e: ParseIntError| {
        if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) {
            ErrorCode::Eintrange
        } else {
            ErrorCode::Eint
        }
    })
}

impl<N: Integer> Int<N> {
    #[must_use]
    pub fn new(val: N) -> Self {
        Self {
            val,
            present: true,
            null: false,
            path: String::new(),
        }
    }

    #[must_use]
    pub fn null() -> Self {
        Self {
            val: N::default(),
            present: true,
            null: true,
            path: String::new(),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<N> {
        (self.present && !self.null).then_some(self.val)
    }

    pub fn form_value(&mut self, value: &str, options: &IntOptions<N>) -> Result<(), ErrorTree> {
        if value.is_empty() {
            return options.blank.accept(&mut self.present, &mut self.null);
        }
        let n = parse_int(value)?;
        options.check(n)?;
        self.val = n;
        self.present = true;
        Ok(())
    }
}

impl<N: Integer> Valuer for Int<N> {
    type Options = IntOptions<N>;

    fn parse_options(tags: &Tags, _decoder: &DecoderOptions) -> Result<IntOptions<N>, InvalidOption> {
        IntOptions::from_tags(tags)
    }

    fn json_value(&mut self, path: &str, value: &Value, options: &IntOptions<N>) -> Result<(), ErrorTree> {
        path.clone_into(&mut self.path);
        match value {
            Value::Null => self.form_value("", options),
            Value::Number(n) => self.form_value(&n.to_string(), options),
            Value::String(s) => self.form_value(s, options),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(ErrorCode::Eint.into()),
        }
    }
}

impl<N: Integer> Serialize for Int<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.get().serialize(serializer)
    }
}

impl<'de, N: Integer> Deserialize<'de> for Int<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<N>::deserialize(deserializer)?.map_or_else(Self::null, Self::new))
    }
}
