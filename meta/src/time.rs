use std::sync::LazyLock;

use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::{DEFAULT_TIME_FORMATS, EXPRESSION_FORMAT, RFC3339_FORMAT, TAG_FORMAT};
use crate::decoder::DecoderOptions;
use crate::error::{ErrorCode, ErrorTree, InvalidOption};
use crate::tags::Tags;
use crate::valuer::{BlankOptions, Valuer};

static RELATIVE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(\d+)_(year|month|week|day|hour|minute|second|nanosecond)s?_(ago|from_now)$",
    )
    .ok()
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Time {
    pub val: DateTime<Utc>,
    pub null: bool,
    pub present: bool,
    pub path: String,
}

/// `formats` are tried in order. Each is `rfc3339`, `expression`, or a
/// chrono strftime pattern such as `%m/%d/%Y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeOptions {
    pub blank: BlankOptions,
    pub formats: Vec<String>,
}

impl Default for TimeOptions {
    fn default() -> Self {
        Self {
            blank: BlankOptions::default(),
            formats: DEFAULT_TIME_FORMATS.map(String::from).to_vec(),
        }
    }
}

fn midnight(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Some(now.date_naive().and_hms_opt(0, 0, 0)?.and_utc())
}

fn shift(now: DateTime<Utc>, amount: u64, unit: &str, forward: bool) -> Option<DateTime<Utc>> {
    match unit {
        "year" | "month" => {
            let months = if unit == "year" {
                amount.checked_mul(12)?
            } else {
                amount
            };
            let months = Months::new(u32::try_from(months).ok()?);
            if forward {
                now.checked_add_months(months)
            } else {
                now.checked_sub_months(months)
            }
        }
        "week" | "day" => {
            let days = if unit == "week" {
                amount.checked_mul(7)?
            } else {
                amount
            };
            if forward {
                now.checked_add_days(Days::new(days))
            } else {
                now.checked_sub_days(Days::new(days))
            }
        }
        _ => {
            let amount = i64::try_from(amount).ok()?;
            let delta = match unit {
                "hour" => TimeDelta::try_hours(amount)?,
                "minute" => TimeDelta::try_minutes(amount)?,
                "second" => TimeDelta::try_seconds(amount)?,
                "nanosecond" => TimeDelta::nanoseconds(amount),
                _ => return None,
            };
            if forward {
                now.checked_add_signed(delta)
            } else {
                now.checked_sub_signed(delta)
            }
        }
    }
}

/// Relative expressions: `now`, `today`, `yesterday`, `tomorrow`,
/// `<n>_<unit>[s]_ago` and `<n>_<unit>[s]_from_now`. Days start at midnight UTC.
fn parse_expression(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match value {
        "now" => return Some(now),
        "today" => return midnight(now),
        "yesterday" => return midnight(now)?.checked_sub_days(Days::new(1)),
        "tomorrow" => return midnight(now)?.checked_add_days(Days::new(1)),
        _ => {}
    }

    let captures = RELATIVE.as_ref()?.captures(value)?;
    let amount = captures.get(1)?.as_str().parse::<u64>().ok()?;
    let unit = captures.get(2)?.as_str();
    let forward = captures.get(3)?.as_str() == "from_now";
    shift(now, amount, unit, forward)
}

fn parse_time(value: &str, format: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match format {
        EXPRESSION_FORMAT => parse_expression(value, now),
        RFC3339_FORMAT => DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        pattern => DateTime::parse_from_str(value, pattern)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(value, pattern).map(|t| t.and_utc()))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, pattern)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|t| t.and_utc())
            }),
    }
}

impl Time {
    #[must_use]
    pub fn new(val: DateTime<Utc>) -> Self {
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
    pub const fn get(&self) -> Option<DateTime<Utc>> {
        if self.present && !self.null {
            Some(self.val)
        } else {
            None
        }
    }

    pub fn form_value(&mut self, value: &str, options: &TimeOptions) -> Result<(), ErrorTree> {
        if value.is_empty() {
            return options.blank.accept(&mut self.present, &mut self.null);
        }

        let now = Utc::now();
        let parsed = options
            .formats
            .iter()
            .find_map(|format| parse_time(value, format, now))
            .ok_or(ErrorCode::Etime)?;

        self.val = parsed;
        self.present = true;
        Ok(())
    }
}

impl Valuer for Time {
    type Options = TimeOptions;

    /// Decoder-wide formats, when set, replace a field's own `meta_format`.
    fn parse_options(tags: &Tags, decoder: &DecoderOptions) -> Result<TimeOptions, InvalidOption> {
        let formats = if decoder.time_formats.is_empty() {
            tags.get(TAG_FORMAT).map_or_else(
                || DEFAULT_TIME_FORMATS.map(String::from).to_vec(),
                |format| vec![format.to_string()],
            )
        } else {
            decoder.time_formats.clone()
        };

        Ok(TimeOptions {
            blank: BlankOptions::from_tags(tags),
            formats,
        })
    }

    fn json_value(&mut self, path: &str, value: &Value, options: &TimeOptions) -> Result<(), ErrorTree> {
        path.clone_into(&mut self.path);
        match value {
            Value::Null => self.form_value("", options),
            Value::String(s) => self.form_value(s, options),
            Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                Err(ErrorCode::Etime.into())
            }
        }
    }
}

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.get().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<DateTime<Utc>>::deserialize(deserializer)?.map_or_else(Self::null, Self::new))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Datelike, TimeZone, Timelike};
    use serde_json::json;

    use super::*;

    fn options(tags: &str) -> TimeOptions {
        Time::parse_options(&Tags::try_from(tags).unwrap(), &DecoderOptions::default()).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 30).unwrap()
    }

    #[test]
    fn test_time_rfc3339() {
        let mut t = Time::default();
        assert!(t.form_value("2006-01-02T15:04:05+07:00", &options("")).is_ok());
        assert_eq!(
            t.get(),
            Some(Utc.with_ymd_and_hms(2006, 1, 2, 8, 4, 5).unwrap())
        );
    }

    #[test]
    fn test_time_custom_format() {
        let mut t = Time::default();
        assert!(t.form_value("01/02/2006", &options(r#"meta_format:"%m/%d/%Y""#)).is_ok());
        assert_eq!(t.get(), Some(Utc.with_ymd_and_hms(2006, 1, 2, 0, 0, 0).unwrap()));

        let mut t = Time::default();
        assert!(t
            .form_value("2006-01-02 15:04", &options(r#"meta_format:"%Y-%m-%d %H:%M""#))
            .is_ok());
        assert_eq!(t.get(), Some(Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 0).unwrap()));
    }

    #[test]
    fn test_time_custom_format_replaces_defaults() {
        let mut t = Time::default();
        assert_eq!(
            t.form_value("2006-01-02T15:04:05Z", &options(r#"meta_format:"%m/%d/%Y""#)),
            Err(ErrorCode::Etime.into())
        );
        assert_eq!(
            t.form_value("now", &options(r#"meta_format:"%m/%d/%Y""#)),
            Err(ErrorCode::Etime.into())
        );
    }

    #[test]
    fn test_time_decoder_formats() {
        let decoder = DecoderOptions {
            time_formats: vec!["%d.%m.%Y".to_string()],
        };
        let options = Time::parse_options(&Tags::default(), &decoder).unwrap();
        assert_eq!(options.formats, vec!["%d.%m.%Y".to_string()]);

        let mut t = Time::default();
        assert!(t.form_value("24.12.2020", &options).is_ok());
        assert_eq!(t.get(), Some(Utc.with_ymd_and_hms(2020, 12, 24, 0, 0, 0).unwrap()));

        let field = Time::parse_options(&Tags::try_from(r#"meta_format:"rfc3339""#).unwrap(), &decoder)
            .unwrap();
        assert_eq!(field.formats, vec!["%d.%m.%Y".to_string()]);

        let field = Time::parse_options(
            &Tags::try_from(r#"meta_format:"rfc3339""#).unwrap(),
            &DecoderOptions::default(),
        )
        .unwrap();
        assert_eq!(field.formats, vec!["rfc3339".to_string()]);
    }

    #[test]
    fn test_time_invalid() {
        let mut t = Time::default();
        assert_eq!(t.form_value("tuesday", &options("")), Err(ErrorCode::Etime.into()));
        assert_eq!(
            t.json_value("a", &json!(1_136_214_245), &options("")),
            Err(ErrorCode::Etime.into())
        );
        assert!(!t.present);
    }

    #[test]
    fn test_time_keywords() {
        let now = fixed_now();
        assert_eq!(parse_expression("now", now), Some(now));
        assert_eq!(
            parse_expression("today", now),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_expression("yesterday", now),
            Some(Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_expression("tomorrow", now),
            Some(Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_time_relative_expressions() {
        let now = fixed_now();
        let cases = [
            ("99_nanoseconds_ago", now - TimeDelta::nanoseconds(99)),
            ("31_seconds_ago", now - TimeDelta::seconds(31)),
            ("1_minute_ago", now - TimeDelta::minutes(1)),
            ("48_hours_ago", now - TimeDelta::hours(48)),
            ("2_days_ago", Utc.with_ymd_and_hms(2024, 3, 13, 13, 45, 30).unwrap()),
            ("1_week_from_now", Utc.with_ymd_and_hms(2024, 3, 22, 13, 45, 30).unwrap()),
            ("1_month_ago", Utc.with_ymd_and_hms(2024, 2, 15, 13, 45, 30).unwrap()),
            ("2_years_from_now", Utc.with_ymd_and_hms(2026, 3, 15, 13, 45, 30).unwrap()),
            ("5_minutes_from_now", now + TimeDelta::minutes(5)),
        ];
        for (expression, expected) in cases {
            assert_eq!(parse_expression(expression, now), Some(expected), "{expression}");
        }
    }

    #[test]
    fn test_time_relative_rejects_garbage() {
        let now = fixed_now();
        assert_eq!(parse_expression("1_fortnight_ago", now), None);
        assert_eq!(parse_expression("1_day_later", now), None);
        assert_eq!(parse_expression("-1_day_ago", now), None);
        assert_eq!(parse_expression("99999999999999999999_years_ago", now), None);
    }

    #[test]
    fn test_time_today_through_form() {
        let before = Utc::now();
        let mut t = Time::default();
        assert!(t.form_value("today", &options("")).is_ok());
        let after = Utc::now();

        let val = t.get().unwrap();
        assert_eq!((val.hour(), val.minute(), val.second()), (0, 0, 0));
        assert!(val.day() == before.day() || val.day() == after.day());
    }

    #[test]
    fn test_time_json_null() {
        let mut t = Time::default();
        assert!(t
            .json_value("a", &Value::Null, &options(r#"meta_null:"true""#))
            .is_ok());
        assert!(t.present);
        assert!(t.null);

        let mut t = Time::default();
        assert_eq!(
            t.json_value("a", &Value::Null, &options(r#"meta_discard_blank:"false""#)),
            Err(ErrorCode::Eblank.into())
        );
        assert!(t.present);
    }

    #[test]
    fn test_time_serde_roundtrip() {
        let value = Time::new(Utc.with_ymd_and_hms(2020, 5, 6, 7, 8, 9).unwrap());
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"2020-05-06T07:08:09Z\"");
        assert_eq!(serde_json::from_str::<Time>(&json).unwrap(), value);
        assert_eq!(serde_json::from_str::<Time>("null").unwrap(), Time::null());
    }
}
