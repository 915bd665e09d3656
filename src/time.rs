use chrono::NaiveDateTime;
use serde::Serializer;

/// Date format used by NovaDAX history exports.
const NOVADAX_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Date format expected by the Koinly universal CSV.
const KOINLY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn parse_date_time(raw: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), NOVADAX_FORMAT)
}

// serialize function for writing NaiveDateTime in the Koinly format
pub(crate) fn serialize_date_time<S: Serializer>(date: &NaiveDateTime, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&date.format(KOINLY_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_date_time() {
        let parsed = parse_date_time("15/03/1970 23:45:56").unwrap();
        let expected = NaiveDate::from_ymd_opt(1970, 3, 15)
            .unwrap()
            .and_hms_opt(23, 45, 56)
            .unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_date_time_invalid() {
        assert!(parse_date_time("1970-03-15 23:45:56").is_err());
        assert!(parse_date_time("not a date").is_err());
    }
}
