use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::LIST_SEPARATOR;
use crate::decoder::DecoderOptions;
use crate::error::{ErrorCode, ErrorList, ErrorTree, InvalidOption};
use crate::tags::Tags;
use crate::text::{Text, TextOptions};
use crate::valuer::{SliceOptions, Valuer};

/// A list of strings given as a JSON array or a comma separated string.
///
/// Blank entries are accepted and dropped unless `meta_blank:"false"` or
/// `meta_discard_blank:"false"` says otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSlice {
    pub val: Vec<String>,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSliceOptions {
    pub element: TextOptions,
    pub slice: SliceOptions,
}

impl TextSlice {
    #[must_use]
    pub const fn new(val: Vec<String>) -> Self {
        Self {
            val,
            path: String::new(),
        }
    }

    pub fn form_value(&mut self, value: &str, options: &TextSliceOptions) -> Result<(), ErrorTree> {
        self.val.clear();
        if value.is_empty() {
            return Err(ErrorCode::Eblank.into());
        }
        let parts: Vec<&str> = value.split(LIST_SEPARATOR).collect();
        self.fill(&parts, options, |element, part| {
            element.form_value(part, &options.element)
        })
    }

    fn fill<T, F>(&mut self, items: &[T], options: &TextSliceOptions, mut parse: F) -> Result<(), ErrorTree>
    where
        F: FnMut(&mut Text, &T) -> Result<(), ErrorTree>,
    {
        if items.is_empty() {
            return Err(ErrorCode::Eblank.into());
        }
        options.slice.check(items.len())?;

        let keep_blank = !options.element.blank.discard_blank;
        let mut errors = ErrorList::new();
        for item in items {
            let mut element = Text::default();
            match parse(&mut element, item) {
                // A dropped blank entry takes no position in the error list.
                Ok(()) => {
                    if keep_blank || !element.val.is_empty() {
                        self.val.push(element.val);
                        errors.push(None);
                    }
                }
                Err(e) => {
                    if keep_blank && e.code() == Some(ErrorCode::Eblank) {
                        self.val.push(element.val);
                    }
                    errors.push(Some(e));
                }
            }
        }

        if errors.live_count() > 0 {
            return Err(errors.into());
        }
        Ok(())
    }
}

impl Valuer for TextSlice {
    type Options = TextSliceOptions;

    fn parse_options(tags: &Tags, _decoder: &DecoderOptions) -> Result<TextSliceOptions, InvalidOption> {
        Ok(TextSliceOptions {
            element: TextOptions::from_tags(tags, true)?,
            slice: SliceOptions::from_tags(tags)?,
        })
    }

    fn json_value(&mut self, path: &str, value: &Value, options: &TextSliceOptions) -> Result<(), ErrorTree> {
        path.clone_into(&mut self.path);
        match value {
            Value::Null => {
                self.val.clear();
                Err(ErrorCode::Eblank.into())
            }
            Value::String(s) => self.form_value(s, options),
            Value::Array(items) => {
                self.val.clear();
                self.fill(items, options, |element, item| {
                    element.json_value("", item, &options.element)
                })
            }
            Value::Bool(_) | Value::Number(_) => {
                self.val.clear();
                self.fill(std::slice::from_ref(value), options, |element, item| {
                    element.json_value("", item, &options.element)
                })
            }
            Value::Object(_) => Err(ErrorCode::Estring.into()),
        }
    }
}

impl Serialize for TextSlice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.val.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TextSlice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn options(tags: &str) -> TextSliceOptions {
        TextSlice::parse_options(&Tags::try_from(tags).unwrap(), &DecoderOptions::default())
            .unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_text_slice_form_value() {
        let mut s = TextSlice::default();
        assert!(s.form_value("a, b ,c", &options("")).is_ok());
        assert_eq!(s.val, strings(&["a", "b", "c"]));
    }

    #[test]
    fn test_text_slice_json_array() {
        let mut s = TextSlice::default();
        assert!(s.json_value("tags", &json!(["x", 1, true]), &options("")).is_ok());
        assert_eq!(s.val, strings(&["x", "1", "true"]));
        assert_eq!(s.path, "tags");
    }

    #[test]
    fn test_text_slice_blank_entries_dropped() {
        let mut s = TextSlice::default();
        assert!(s.json_value("a", &json!(["a", "", null, " ", "b"]), &options("")).is_ok());
        assert_eq!(s.val, strings(&["a", "b"]));
    }

    #[test]
    fn test_text_slice_blank_entries_kept() {
        let mut s = TextSlice::default();
        assert!(s
            .json_value("a", &json!(["a", "", "b"]), &options(r#"meta_discard_blank:"false""#))
            .is_ok());
        assert_eq!(s.val, strings(&["a", "", "b"]));
    }

    #[test]
    fn test_text_slice_blank_entries_rejected() {
        let mut s = TextSlice::default();
        let result = s.json_value(
            "a",
            &json!(["a", "b", "", null, " ", "c"]),
            &options(r#"meta_blank:"false" meta_discard_blank:"false" meta_required:"true""#),
        );
        assert_eq!(
            result,
            Err(ErrorList::from_iter([
                None,
                None,
                Some(ErrorCode::Eblank),
                Some(ErrorCode::Eblank),
                Some(ErrorCode::Eblank),
                None
            ])
            .into())
        );
        assert_eq!(s.val, strings(&["a", "b", "", "", "", "c"]));
    }

    #[test]
    fn test_text_slice_blank() {
        let mut s = TextSlice::default();
        assert_eq!(s.form_value("", &options("")), Err(ErrorCode::Eblank.into()));
        assert_eq!(s.json_value("a", &json!([]), &options("")), Err(ErrorCode::Eblank.into()));
        assert_eq!(s.json_value("a", &Value::Null, &options("")), Err(ErrorCode::Eblank.into()));
    }

    #[test]
    fn test_text_slice_element_rules() {
        let mut s = TextSlice::default();
        let result = s.form_value("red,blue", &options(r#"meta_in:"red,green""#));
        assert_eq!(
            result,
            Err(ErrorList::from_iter([None, Some(ErrorCode::Ein)]).into())
        );
        assert_eq!(s.val, strings(&["red"]));
    }

    #[test]
    fn test_text_slice_dropped_blanks_take_no_error_slot() {
        let mut s = TextSlice::default();
        let result = s.form_value(",,toolong,ok", &options(r#"meta_max_runes:"3""#));
        assert_eq!(
            result,
            Err(ErrorList::from_iter([Some(ErrorCode::Emaxrunes), None]).into())
        );
        assert_eq!(s.val, strings(&["ok"]));
    }

    #[test]
    fn test_text_slice_length() {
        let options = options(r#"meta_max_length:"2""#);
        let mut s = TextSlice::default();
        assert_eq!(s.form_value("a,b,c", &options), Err(ErrorCode::Emaxlength.into()));
        assert!(s.val.is_empty());
    }

    #[test]
    fn test_text_slice_object_is_invalid() {
        let mut s = TextSlice::default();
        assert_eq!(
            s.json_value("a", &json!({"x": 1}), &options("")),
            Err(ErrorCode::Estring.into())
        );
    }

    #[test]
    fn test_text_slice_serde_roundtrip() {
        let s = TextSlice::new(strings(&["a", "b"]));
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
        assert_eq!(serde_json::from_str::<TextSlice>(&json).unwrap(), s);
    }
}
