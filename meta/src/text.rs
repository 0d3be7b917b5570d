use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::{TAG_BLANK, TAG_IN, TAG_MAX_BYTES, TAG_MAX_RUNES, TAG_MIN_RUNES, TAG_STRIP};
use crate::decoder::DecoderOptions;
use crate::error::{ErrorCode, ErrorTree, InvalidOption};
use crate::tags::Tags;
use crate::valuer::{BlankOptions, Valuer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    pub val: String,
    pub null: bool,
    pub present: bool,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    pub blank: BlankOptions,
    /// Trim surrounding whitespace before validating.
    pub strip: bool,
    /// Accept an empty string as a present, non-null value.
    pub allow_blank: bool,
    pub min_runes: Option<usize>,
    pub max_runes: Option<usize>,
    pub max_bytes: Option<usize>,
    pub allowed: Vec<String>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            blank: BlankOptions::default(),
            strip: true,
            allow_blank: false,
            min_runes: None,
            max_runes: None,
            max_bytes: None,
            allowed: Vec::new(),
        }
    }
}

impl TextOptions {
    pub(crate) fn from_tags(tags: &Tags, allow_blank: bool) -> Result<Self, InvalidOption> {
        Ok(Self {
            blank: BlankOptions::from_tags(tags),
            strip: !tags.is_false(TAG_STRIP),
            allow_blank: if allow_blank {
                !tags.is_false(TAG_BLANK)
            } else {
                tags.is_true(TAG_BLANK)
            },
            min_runes: tags.parse(TAG_MIN_RUNES)?,
            max_runes: tags.parse(TAG_MAX_RUNES)?,
            max_bytes: tags.parse(TAG_MAX_BYTES)?,
            allowed: tags.list(TAG_IN)?,
        })
    }

    fn check(&self, value: &str, runes: usize) -> Result<(), ErrorCode> {
        if self.min_runes.is_some_and(|min| runes < min) {
            return Err(ErrorCode::Eminrunes);
        }
        if self.max_runes.is_some_and(|max| runes > max) {
            return Err(ErrorCode::Emaxrunes);
        }
        if self.max_bytes.is_some_and(|max| value.len() > max) {
            return Err(ErrorCode::Emaxbytes);
        }
        if !self.allowed.is_empty() && !self.allowed.iter().any(|allowed| allowed == value) {
            return Err(ErrorCode::Ein);
        }
        Ok(())
    }
}

impl Text {
    #[must_use]
    pub fn new(val: impl Into<String>) -> Self {
        Self {
            val: val.into(),
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
    pub fn get(&self) -> Option<&str> {
        (self.present && !self.null).then_some(self.val.as_str())
    }

    pub fn form_value(&mut self, value: &str, options: &TextOptions) -> Result<(), ErrorTree> {
        let value = if options.strip { value.trim() } else { value };
        let runes = value.chars().count();

        if runes == 0 {
            if options.allow_blank {
                self.present = true;
                return Ok(());
            }
            return options.blank.accept(&mut self.present, &mut self.null);
        }

        options.check(value, runes)?;
        value.clone_into(&mut self.val);
        self.present = true;
        Ok(())
    }
}

impl Valuer for Text {
    type Options = TextOptions;

    fn parse_options(tags: &Tags, _decoder: &DecoderOptions) -> Result<TextOptions, InvalidOption> {
        TextOptions::from_tags(tags, false)
    }

    fn json_value(&mut self, path: &str, value: &Value, options: &TextOptions) -> Result<(), ErrorTree> {
        path.clone_into(&mut self.path);
        match value {
            Value::Null if options.blank.null => {
                self.present = true;
                self.null = true;
                Ok(())
            }
            Value::Null => self.form_value("", options),
            Value::String(s) => self.form_value(s, options),
            Value::Bool(b) => self.form_value(if *b { "true" } else { "false" }, options),
            Value::Number(n) => self.form_value(&n.to_string(), options),
            Value::Array(_) | Value::Object(_) => Err(ErrorCode::Estring.into()),
        }
    }
}

impl Serialize for Text {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.get().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.map_or_else(Self::null, Self::new))
    }
}
