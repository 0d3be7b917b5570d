pub const MALFORMED_KEY: &str = "error";
pub const CATCH_ALL_NAME: &str = "*";
pub const SKIP_NAME: &str = "-";
pub const PATH_SEPARATOR: char = '.';
pub const LIST_SEPARATOR: char = ',';

pub const RFC3339_FORMAT: &str = "rfc3339";
pub const EXPRESSION_FORMAT: &str = "expression";
pub const DEFAULT_TIME_FORMATS: [&str; 2] = [RFC3339_FORMAT, EXPRESSION_FORMAT];

pub const TAG_NAME: &str = "meta";
pub const TAG_REQUIRED: &str = "meta_required";
pub const TAG_DISCARD_BLANK: &str = "meta_discard_blank";
pub const TAG_NULL: &str = "meta_null";
pub const TAG_MIN: &str = "meta_min";
pub const TAG_MAX: &str = "meta_max";
pub const TAG_IN: &str = "meta_in";
pub const TAG_MIN_RUNES: &str = "meta_min_runes";
pub const TAG_MAX_RUNES: &str = "meta_max_runes";
pub const TAG_MAX_BYTES: &str = "meta_max_bytes";
pub const TAG_STRIP: &str = "meta_strip";
pub const TAG_BLANK: &str = "meta_blank";
pub const TAG_FORMAT: &str = "meta_format";
pub const TAG_MIN_LENGTH: &str = "meta_min_length";
pub const TAG_MAX_LENGTH: &str = "meta_max_length";
pub const TAG_DEFAULT: &str = "meta_default";
pub const TAG_DISCARD_INVALID: &str = "meta_discard_invalid";
pub const TAG_DOC: &str = "doc";
pub const TAG_DOC_PATTERN: &str = "doc_pattern";
