use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, btree_map};

use percent_encoding::percent_decode;
use serde_json::{Map, Value};

use crate::constants::PATH_SEPARATOR;

/// Multi-valued form input, as found in query strings and urlencoded bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: BTreeMap<String, Vec<String>>,
    /// Keys whose first value was not valid UTF-8 once percent-decoded. The
    /// stored value is its lossy rendering.
    invalid: BTreeSet<String>,
}

impl FormValues {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            invalid: BTreeSet::new(),
        }
    }

    /// Parses `application/x-www-form-urlencoded` input.
    #[must_use]
    pub fn parse(input: impl AsRef<[u8]>) -> Self {
        let mut form = Self::new();
        for pair in input.as_ref().split(|b| *b == b'&').filter(|pair| !pair.is_empty()) {
            let mut parts = pair.splitn(2, |b| *b == b'=');
            let key = url_decode(parts.next().unwrap_or_default());
            let value = url_decode(parts.next().unwrap_or_default());
            let key = key.unwrap_or_else(|lossy| lossy);
            form.append_decoded(key, value);
        }
        form
    }

    fn append_decoded(&mut self, key: String, value: Result<String, String>) {
        let values = self.values.entry(key.clone()).or_default();
        match value {
            Ok(value) => values.push(value),
            Err(lossy) => {
                if values.is_empty() {
                    self.invalid.insert(key);
                }
                values.push(lossy);
            }
        }
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.append_decoded(key.into(), Ok(value.into()));
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.invalid.remove(&key);
        self.values.insert(key, vec![value.into()]);
    }

    /// Appends every value of `other` after the values already held.
    pub fn merge(&mut self, other: &Self) {
        for (key, values) in &other.values {
            let held = self.values.entry(key.clone()).or_default();
            if held.is_empty() && other.invalid.contains(key) {
                self.invalid.insert(key.clone());
            }
            held.extend(values.iter().cloned());
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map_or(&[], Vec::as_slice)
    }

    /// False when the first value of `key` was not valid UTF-8.
    #[must_use]
    pub fn is_valid_utf8(&self, key: &str) -> bool {
        !self.invalid.contains(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<String>> {
        self.values.iter()
    }
}

/// Decodes `+` and percent escapes. Invalid UTF-8 gives the lossy text as
/// the error.
fn url_decode(raw: &[u8]) -> Result<String, String> {
    let spaced: Cow<'_, [u8]> = if raw.contains(&b'+') {
        Cow::Owned(raw.iter().map(|b| if *b == b'+' { b' ' } else { *b }).collect())
    } else {
        Cow::Borrowed(raw)
    };
    let decoded = percent_decode(&spaced);
    decoded
        .clone()
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| decoded.decode_utf8_lossy().into_owned())
}

impl<K, V> FromIterator<(K, V)> for FormValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (key, value) in iter {
            values.append(key, value);
        }
        values
    }
}

/// Form values regrouped by their dotted keys: `a.b.0.c` becomes nested nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormTree {
    values: Vec<String>,
    invalid_utf8: bool,
    children: BTreeMap<String, Self>,
}

impl FormTree {
    #[must_use]
    pub fn new(form: &FormValues) -> Self {
        let mut root = Self::default();
        for (key, values) in form.iter() {
            let mut node = &mut root;
            for segment in key.split(PATH_SEPARATOR) {
                node = node.children.entry(segment.to_string()).or_default();
            }
            node.invalid_utf8 = !form.is_valid_utf8(key);
            node.values.extend(values.iter().cloned());
        }
        root
    }

    pub(crate) fn child(&self, key: &str) -> Option<&Self> {
        self.children.get(key)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.is_empty()
    }

    pub(crate) const fn is_valid_utf8(&self) -> bool {
        !self.invalid_utf8
    }

    pub(crate) fn first_value(&self) -> &str {
        self.values.first().map_or("", String::as_str)
    }

    pub(crate) fn to_map(&self) -> Map<String, Value> {
        self.children
            .iter()
            .map(|(key, child)| (key.clone(), child.to_value()))
            .collect()
    }

    fn to_value(&self) -> Value {
        if !self.children.is_empty() {
            return Value::Object(self.to_map());
        }
        match self.values.as_slice() {
            [] => Value::String(String::new()),
            [single] => Value::String(single.clone()),
            many => Value::Array(many.iter().cloned().map(Value::String).collect()),
        }
    }
}

impl From<&FormValues> for FormTree {
    fn from(form: &FormValues) -> Self {
        Self::new(form)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_form_values_parse() {
        let form = FormValues::parse("a=1&b=hello+world&a=2&c=%C3%A9");
        assert_eq!(form.get("a"), Some("1"));
        assert_eq!(form.get_all("a"), ["1".to_string(), "2".to_string()]);
        assert_eq!(form.get("b"), Some("hello world"));
        assert_eq!(form.get("c"), Some("é"));
        assert_eq!(form.get("d"), None);
        assert!(form.is_valid_utf8("c"));
    }

    #[test]
    fn test_form_values_parse_invalid_utf8() {
        let form = FormValues::parse("name=%FF%FE&name=ok&plain=a%2Bb&&flag");
        assert!(!form.is_valid_utf8("name"));
        assert_eq!(form.get("name"), Some("\u{FFFD}\u{FFFD}"));
        assert_eq!(form.get_all("name").len(), 2);
        assert_eq!(form.get("plain"), Some("a+b"));
        assert_eq!(form.get("flag"), Some(""));
        assert!(form.is_valid_utf8("plain"));

        let tree = FormTree::new(&form);
        assert!(!tree.child("name").unwrap().is_valid_utf8());
        assert!(tree.child("plain").unwrap().is_valid_utf8());

        let mut later = FormValues::parse("name=%C3%A9");
        later.merge(&form);
        assert!(later.is_valid_utf8("name"));
        let mut form = form;
        form.set("name", "fixed");
        assert!(form.is_valid_utf8("name"));
    }

    #[test]
    fn test_form_values_set_and_merge() {
        let mut form = FormValues::from_iter([("a", "body")]);
        form.merge(&FormValues::from_iter([("a", "query"), ("b", "query")]));
        assert_eq!(form.get("a"), Some("body"));
        assert_eq!(form.get_all("a").len(), 2);
        assert_eq!(form.get("b"), Some("query"));

        form.set("a", "override");
        assert_eq!(form.get_all("a"), ["override".to_string()]);
    }

    #[test]
    fn test_form_tree_nesting() {
        let form = FormValues::from_iter([("a.b.0.c", "x"), ("a.b.1.c", "y"), ("d", "z")]);
        let tree = FormTree::new(&form);

        let c = tree
            .child("a")
            .and_then(|a| a.child("b"))
            .and_then(|b| b.child("1"))
            .and_then(|one| one.child("c"))
            .unwrap();
        assert_eq!(c.first_value(), "y");
        assert!(tree.child("e").is_none());
        assert!(!tree.is_empty());
        assert!(FormTree::default().is_empty());
    }

    #[test]
    fn test_form_tree_to_map() {
        let form = FormValues::from_iter([("x", "1"), ("x", "2"), ("y.z", "3"), ("w", "")]);
        let tree = FormTree::new(&form);
        assert_eq!(
            Value::Object(tree.to_map()),
            json!({"x": ["1", "2"], "y": {"z": "3"}, "w": ""})
        );
    }
}
