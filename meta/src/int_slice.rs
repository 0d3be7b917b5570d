use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::LIST_SEPARATOR;
use crate::decoder::DecoderOptions;
use crate::error::{ErrorCode, ErrorList, ErrorTree, InvalidOption};
use crate::int::{Int, IntOptions, Integer};
use crate::tags::Tags;
use crate::valuer::{SliceOptions, Valuer};

/// A list of integers given as a JSON array or a comma separated string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntSlice<N> {
    pub val: Vec<N>,
    pub path: String,
}

pub type Int64Slice = IntSlice<i64>;
pub type Uint64Slice = IntSlice<u64>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntSliceOptions<N> {
    pub element: IntOptions<N>,
    pub slice: SliceOptions,
}

impl<N: Integer> IntSlice<N> {
    #[must_use]
    pub const fn new(val: Vec<N>) -> Self {
        Self {
            val,
            path: String::new(),
        }
    }

    pub fn form_value(&mut self, value: &str, options: &IntSliceOptions<N>) -> Result<(), ErrorTree> {
        self.val.clear();
        if value.is_empty() {
            return Err(ErrorCode::Eblank.into());
        }
        let parts: Vec<&str> = value.split(LIST_SEPARATOR).collect();
        self.fill(&parts, options, |element, part| {
            element.form_value(part, &options.element)
        })
    }

    fn fill<T, F>(&mut self, items: &[T], options: &IntSliceOptions<N>, mut parse: F) -> Result<(), ErrorTree>
    where
        F: FnMut(&mut Int<N>, &T) -> Result<(), ErrorTree>,
    {
        if items.is_empty() {
            return Err(ErrorCode::Eblank.into());
        }
        options.slice.check(items.len())?;

        let mut errors = ErrorList::new();
        for item in items {
            let mut element = Int::default();
            match parse(&mut element, item) {
                Ok(()) => {
                    if let Some(n) = element.get() {
                        self.val.push(n);
                    }
                    errors.push(None);
                }
                Err(e) => errors.push(Some(e)),
            }
        }

        if errors.live_count() > 0 {
            return Err(errors.into());
        }
        Ok(())
    }
}

impl<N: Integer> Valuer for IntSlice<N> {
    type Options = IntSliceOptions<N>;

    fn parse_options(tags: &Tags, _decoder: &DecoderOptions) -> Result<IntSliceOptions<N>, InvalidOption> {
        Ok(IntSliceOptions {
            element: IntOptions::from_tags(tags)?,
            slice: SliceOptions::from_tags(tags)?,
        })
    }

    fn json_value(&mut self, path: &str, value: &Value, options: &IntSliceOptions<N>) -> Result<(), ErrorTree> {
        path.clone_into(&mut self.path);
        match value {
            Value::Null => {
                self.val.clear();
                Err(ErrorCode::Eblank.into())
            }
            Value::String(s) => self.form_value(s, options),
            Value::Number(n) => self.form_value(&n.to_string(), options),
            Value::Array(items) => {
                self.val.clear();
                self.fill(items, options, |element, item| {
                    element.json_value("", item, &options.element)
                })
            }
            Value::Bool(_) | Value::Object(_) => Err(ErrorCode::Eint.into()),
        }
    }
}

impl<N: Integer> Serialize for IntSlice<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.val.serialize(serializer)
    }
}

impl<'de, N: Integer> Deserialize<'de> for IntSlice<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<N>::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn options(tags: &str) -> IntSliceOptions<i64> {
        Int64Slice::parse_options(&Tags::try_from(tags).unwrap(), &DecoderOptions::default())
            .unwrap()
    }

    #[test]
    fn test_int_slice_form_value() {
        let mut s = Int64Slice::default();
        assert!(s.form_value("1,2,3", &options("")).is_ok());
        assert_eq!(s.val, vec![1, 2, 3]);
    }

    #[test]
    fn test_int_slice_json_array() {
        let mut s = Int64Slice::default();
        assert!(s.json_value("ids", &json!([4, "5", 6]), &options("")).is_ok());
        assert_eq!(s.val, vec![4, 5, 6]);
        assert_eq!(s.path, "ids");
    }

    #[test]
    fn test_int_slice_single_number() {
        let mut s = Int64Slice::default();
        assert!(s.json_value("ids", &json!(9), &options("")).is_ok());
        assert_eq!(s.val, vec![9]);
    }

    #[test]
    fn test_int_slice_blank() {
        let mut s = Int64Slice::default();
        assert_eq!(s.form_value("", &options("")), Err(ErrorCode::Eblank.into()));
        assert_eq!(s.json_value("a", &json!([]), &options("")), Err(ErrorCode::Eblank.into()));
        assert_eq!(s.json_value("a", &Value::Null, &options("")), Err(ErrorCode::Eblank.into()));
    }

    #[test]
    fn test_int_slice_element_errors() {
        let mut s = Int64Slice::default();
        let result = s.form_value("1,x,3,99999999999999999999", &options(""));
        assert_eq!(
            result,
            Err(ErrorList::from_iter([
                None,
                Some(ErrorCode::Eint),
                None,
                Some(ErrorCode::Eintrange)
            ])
            .into())
        );
        assert_eq!(s.val, vec![1, 3]);
    }

    #[test]
    fn test_int_slice_element_bounds() {
        let mut s = Int64Slice::default();
        let result = s.json_value("a", &json!([1, 10]), &options(r#"meta_max:"5""#));
        assert_eq!(
            result,
            Err(ErrorList::from_iter([None, Some(ErrorCode::Emax)]).into())
        );
    }

    #[test]
    fn test_int_slice_length() {
        let options = options(r#"meta_min_length:"2" meta_max_length:"3""#);
        let mut s = Int64Slice::default();
        assert_eq!(s.form_value("1", &options), Err(ErrorCode::Eminlength.into()));
        assert_eq!(s.form_value("1,2,3,4", &options), Err(ErrorCode::Emaxlength.into()));
        assert!(s.val.is_empty());
        assert!(s.form_value("1,2", &options).is_ok());
    }

    #[test]
    fn test_int_slice_blank_entries_skipped() {
        let mut s = Int64Slice::default();
        assert!(s.form_value("1,,2", &options("")).is_ok());
        assert_eq!(s.val, vec![1, 2]);

        let mut s = Int64Slice::default();
        assert_eq!(
            s.form_value("1,,2", &options(r#"meta_discard_blank:"false""#)),
            Err(ErrorList::from_iter([None, Some(ErrorCode::Eblank), None]).into())
        );
    }

    #[test]
    fn test_int_slice_serde_roundtrip() {
        let s = Uint64Slice::new(vec![1, 2]);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "[1,2]");
        assert_eq!(serde_json::from_str::<Uint64Slice>(&json).unwrap(), s);
    }
}
