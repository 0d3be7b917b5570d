use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::decoder::DecoderOptions;
use crate::error::{ErrorCode, ErrorTree, InvalidOption};
use crate::tags::Tags;
use crate::valuer::{BlankOptions, Valuer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bool {
    pub val: bool,
    pub null: bool,
    pub present: bool,
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolOptions {
    pub blank: BlankOptions,
}

impl Bool {
    #[must_use]
    pub fn new(val: bool) -> Self {
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

    /// The value, unless it was omitted or null.
    #[must_use]
    pub const fn get(&self) -> Option<bool> {
        if self.present && !self.null {
            Some(self.val)
        } else {
            None
        }
    }

    pub fn form_value(&mut self, value: &str, options: &BoolOptions) -> Result<(), ErrorTree> {
        if value.is_empty() {
            return options.blank.accept(&mut self.present, &mut self.null);
        }
        self.val = parse_bool(value).ok_or(ErrorCode::Ebool)?;
        self.present = true;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl Valuer for Bool {
    type Options = BoolOptions;

    fn parse_options(tags: &Tags, _decoder: &DecoderOptions) -> Result<BoolOptions, InvalidOption> {
        Ok(BoolOptions {
            blank: BlankOptions::from_tags(tags),
        })
    }

    fn json_value(&mut self, path: &str, value: &Value, options: &BoolOptions) -> Result<(), ErrorTree> {
        path.clone_into(&mut self.path);
        match value {
            Value::Null => options.blank.accept(&mut self.present, &mut self.null),
            Value::Bool(b) => {
                self.val = *b;
                self.present = true;
                Ok(())
            }
            Value::String(s) => self.form_value(s, options),
            Value::Number(n) => self.form_value(&n.to_string(), options),
            Value::Array(_) | Value::Object(_) => Err(ErrorCode::Ebool.into()),
        }
    }
}

impl Serialize for Bool {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.get().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<bool>::deserialize(deserializer)?.map_or_else(Self::null, Self::new))
    }
}
