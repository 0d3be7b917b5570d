use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::{TAG_IN, TAG_MAX, TAG_MIN};
use crate::decoder::DecoderOptions;
use crate::error::{ErrorCode, ErrorTree, InvalidOption};
use crate::tags::Tags;
use crate::valuer::{BlankOptions, Valuer};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Float64 {
    pub val: f64,
    pub null: bool,
    pub present: bool,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloatOptions {
    pub blank: BlankOptions,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed: Vec<f64>,
}

impl FloatOptions {
    fn check(&self, n: f64) -> Result<(), ErrorCode> {
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

/// Infinity is accepted only when spelled out; otherwise it means the input overflowed.
fn parse_float(value: &str) -> Result<f64, ErrorCode> {
    let n: f64 = value.parse().map_err(|_| ErrorCode::Efloat)?;
    if n.is_infinite() {
        let unsigned = value.trim_start_matches(['+', '-']);
        if !unsigned.eq_ignore_ascii_case("inf") && !unsigned.eq_ignore_ascii_case("infinity") {
            return Err(ErrorCode::Efloatrange);
        }
    }
    Ok(n)
}

impl Float64 {
    #[must_use]
    pub fn new(val: f64) -> Self {
        Self {
            val,
            present: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn null() -> Self {
        Self {
            null: true,
            present: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn get(&self) -> Option<f64> {
        if self.present && !self.null {
            Some(self.val)
        } else {
            None
        }
    }

    pub fn form_value(&mut self, value: &str, options: &FloatOptions) -> Result<(), ErrorTree> {
        if value.is_empty() {
            return options.blank.accept(&mut self.present, &mut self.null);
        }
        let n = parse_float(value)?;
        options.check(n)?;
        self.val = n;
        self.present = true;
        Ok(())
    }
}

impl Valuer for Float64 {
    type Options = FloatOptions;

    fn parse_options(tags: &Tags, _decoder: &DecoderOptions) -> Result<FloatOptions, InvalidOption> {
        Ok(FloatOptions {
            blank: BlankOptions::from_tags(tags),
            min: tags.parse(TAG_MIN)?,
            max: tags.parse(TAG_MAX)?,
            allowed: tags.list(TAG_IN)?,
        })
    }

    fn json_value(&mut self, path: &str, value: &Value, options: &FloatOptions) -> Result<(), ErrorTree> {
        path.clone_into(&mut self.path);
        match value {
            Value::Null => self.form_value("", options),
            Value::Number(n) => self.form_value(&n.to_string(), options),
            Value::String(s) => self.form_value(s, options),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(ErrorCode::Efloat.into()),
        }
    }
}

impl Serialize for Float64 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.get().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Float64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?.map_or_else(Self::null, Self::new))
    }
}
