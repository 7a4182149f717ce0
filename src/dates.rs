use chrono::{Duration, NaiveDate};

use crate::error::{Error, Result};

pub const FORMAT: &str = "%Y-%m-%d";

/// Parses a strict `YYYY-MM-DD` date. Single-digit months or days are
/// rejected even though chrono itself would accept them.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let bytes = s.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shape_ok {
        return Err(Error::InvalidFormat(s.to_string()));
    }
    NaiveDate::parse_from_str(s, FORMAT).map_err(|_| Error::InvalidFormat(s.to_string()))
}

/// Every calendar day from `start` to `end`, both inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    if end < start {
        return Err(Error::InvalidRange { start, end });
    }
    let days = (end - start).num_days();
    Ok((0..=days).map(|i| start + Duration::days(i)).collect())
}

pub fn day_before(date: NaiveDate, n: u32) -> NaiveDate {
    date - Duration::days(i64::from(n))
}

pub mod date_format {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(super::FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_date(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_strict_dates() {
        assert_eq!(parse_date("2020-03-01").unwrap(), ymd(2020, 3, 1));
    }

    #[test]
    fn rejects_loose_dates() {
        for s in &["2020-3-01", "2020-03-1", "20-03-01", "2020/03/01", "2020-13-01", "", "2020-03-01 "] {
            match parse_date(s) {
                Err(Error::InvalidFormat(raw)) => assert_eq!(raw, *s),
                other => panic!("expected InvalidFormat for {:?}, got {:?}", s, other),
            }
        }
    }

    #[test]
    fn range_is_inclusive() {
        let range = date_range(ymd(2020, 3, 1), ymd(2020, 3, 3)).unwrap();
        assert_eq!(range, vec![ymd(2020, 3, 1), ymd(2020, 3, 2), ymd(2020, 3, 3)]);
    }

    #[test]
    fn range_of_one_day() {
        assert_eq!(date_range(ymd(2020, 2, 29), ymd(2020, 2, 29)).unwrap(), vec![ymd(2020, 2, 29)]);
    }

    #[test]
    fn reversed_range_fails() {
        assert!(matches!(
            date_range(ymd(2020, 3, 3), ymd(2020, 3, 1)),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn day_before_crosses_month() {
        assert_eq!(day_before(ymd(2020, 3, 1), 1), ymd(2020, 2, 29));
        assert_eq!(day_before(ymd(2020, 3, 1), 0), ymd(2020, 3, 1));
    }
}
