use std::fmt;
use std::str::FromStr;

use crate::constants::{LIST_SEPARATOR, TAG_NAME};
use crate::error::InvalidOption;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTags(pub String);

impl fmt::Display for InvalidTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for InvalidTags {}

/// Field configuration written as `key:"value"` pairs separated by spaces,
/// e.g. `meta:"email" meta_required:"true" meta_max_bytes:"255"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(Vec<(String, String)>);

impl Tags {
    /// First value recorded for `key`. Empty values count as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get(TAG_NAME)
    }

    #[must_use]
    pub fn is_true(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    #[must_use]
    pub fn is_false(&self, key: &str) -> bool {
        self.get(key) == Some("false")
    }

    pub fn parse<N: FromStr>(&self, key: &str) -> Result<Option<N>, InvalidOption> {
        self.get(key)
            .map(|raw| parse_option(key, raw.trim()))
            .transpose()
    }

    /// Comma separated values, each trimmed.
    pub fn list<N: FromStr>(&self, key: &str) -> Result<Vec<N>, InvalidOption> {
        self.get(key).map_or_else(
            || Ok(Vec::new()),
            |raw| {
                raw.split(LIST_SEPARATOR)
                    .map(|item| parse_option(key, item.trim()))
                    .collect()
            },
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

fn parse_option<N: FromStr>(key: &str, raw: &str) -> Result<N, InvalidOption> {
    raw.parse().map_err(|_| InvalidOption {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Reads a quoted value up to its closing quote, returning it with the rest of the input.
fn unquote(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '"' => {
                let rest = input.get(index..)?.strip_prefix('"')?;
                return Some((value, rest));
            }
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            other => value.push(other),
        }
    }
    None
}

impl TryFrom<&str> for Tags {
    type Error = InvalidTags;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        let mut entries = Vec::new();
        let mut rest = input.trim_start();

        while !rest.is_empty() {
            let name_end = rest
                .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
                .unwrap_or(rest.len());
            let (name, tail) = rest.split_at(name_end);
            if name.is_empty() {
                return Err(InvalidTags(format!("Tag key expected near: {rest}")));
            }

            let Some(tail) = tail.strip_prefix(":\"") else {
                return Err(InvalidTags(format!(
                    "Tag key `{name}` must be followed by a quoted value"
                )));
            };

            let Some((value, tail)) = unquote(tail) else {
                return Err(InvalidTags(format!(
                    "Tag value for `{name}` is not terminated"
                )));
            };

            entries.push((name.to_string(), value));
            rest = tail.trim_start();
        }

        Ok(Self(entries))
    }
}

impl TryFrom<String> for Tags {
    type Error = InvalidTags;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Self::try_from(input.as_str())
    }
}

impl FromStr for Tags {
    type Err = InvalidTags;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{name}:{value:?}")?;
        }
        Ok(())
    }
}
