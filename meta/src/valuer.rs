use serde::Serialize;
use serde_json::Value;

use crate::constants::{
    TAG_DISCARD_BLANK, TAG_MAX_LENGTH, TAG_MIN_LENGTH, TAG_NULL, TAG_REQUIRED,
};
use crate::decoder::DecoderOptions;
use crate::error::{ErrorCode, ErrorTree, InvalidOption};
use crate::tags::Tags;

/// A field type that can be filled from one raw input value.
///
/// Options are resolved from the field's tags once, when the schema is built,
/// and handed back on every decode.
pub trait Valuer: Default + Send + Sync + 'static {
    type Options: Send + Sync + 'static;

    fn parse_options(tags: &Tags, decoder: &DecoderOptions) -> Result<Self::Options, InvalidOption>;

    /// Parses `value`, recording `path` as the value's location in the input.
    fn json_value(
        &mut self,
        path: &str,
        value: &Value,
        options: &Self::Options,
    ) -> Result<(), ErrorTree>;
}

/// How a scalar treats empty input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankOptions {
    pub required: bool,
    pub discard_blank: bool,
    pub null: bool,
}

impl Default for BlankOptions {
    fn default() -> Self {
        Self {
            required: false,
            discard_blank: true,
            null: false,
        }
    }
}

impl BlankOptions {
    #[must_use]
    pub fn from_tags(tags: &Tags) -> Self {
        Self {
            required: tags.is_true(TAG_REQUIRED),
            discard_blank: !tags.is_false(TAG_DISCARD_BLANK),
            null: tags.is_true(TAG_NULL),
        }
    }

    /// Resolves blank input against these options, updating the presence flags.
    pub(crate) fn accept(self, present: &mut bool, null: &mut bool) -> Result<(), ErrorTree> {
        if self.null {
            *present = true;
            *null = true;
            return Ok(());
        }
        if self.required {
            return Err(ErrorCode::Eblank.into());
        }
        if !self.discard_blank {
            *present = true;
            return Err(ErrorCode::Eblank.into());
        }
        Ok(())
    }
}

/// Cardinality bounds for slice fields. An absent tag means unbounded; a
/// present one is enforced as written, zero included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SliceOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl SliceOptions {
    pub fn from_tags(tags: &Tags) -> Result<Self, InvalidOption> {
        Ok(Self {
            min_length: tags.parse(TAG_MIN_LENGTH)?,
            max_length: tags.parse(TAG_MAX_LENGTH)?,
        })
    }

    pub fn check(self, len: usize) -> Result<(), ErrorCode> {
        if self.min_length.is_some_and(|min| len < min) {
            return Err(ErrorCode::Eminlength);
        }
        if self.max_length.is_some_and(|max| len > max) {
            return Err(ErrorCode::Emaxlength);
        }
        Ok(())
    }

    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some()
    }
}
