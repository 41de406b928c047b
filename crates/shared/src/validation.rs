//! Common validation utilities.

use chrono::{NaiveDate, NaiveTime};
use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates that a string is not empty after trimming.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("blank", "Value cannot be blank"))
    } else {
        Ok(())
    }
}

/// Validates that a latitude value is within -90 to 90.
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(error("latitude_range", "Latitude must be between -90 and 90"))
    }
}

/// Validates that a longitude value is within -180 to 180.
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(error("longitude_range", "Longitude must be between -180 and 180"))
    }
}

/// Parses a wall-clock time in `HH:MM` form.
///
/// Seconds are rejected: times are stored and returned at minute precision.
pub fn parse_clock_time(value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| error("clock_time", "Time must be in HH:MM format"))
}

/// Validates a wall-clock time string.
pub fn validate_clock_time(value: &str) -> Result<(), ValidationError> {
    parse_clock_time(value).map(|_| ())
}

/// Validates that an optional end date is not before the start date.
pub fn validate_date_order(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match end {
        Some(end) if end < start => Err(error(
            "date_order",
            "End date must be on or after start date",
        )),
        _ => Ok(()),
    }
}

/// Serde helpers for optional `HH:MM` times.
pub mod optional_clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_some(&time.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| super::parse_clock_time(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("please attach the certificate").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   \n").is_err());
    }

    #[test]
    fn test_coordinate_ranges() {
        assert!(validate_latitude(45.4642).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_longitude(9.19).is_ok());
        assert!(validate_longitude(-180.5).is_err());
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(
            parse_clock_time("08:30").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_clock_time(" 17:05 ").unwrap(),
            NaiveTime::from_hms_opt(17, 5, 0).unwrap()
        );
        assert!(parse_clock_time("25:00").is_err());
        assert!(parse_clock_time("8am").is_err());
    }

    #[test]
    fn test_clock_time_with_seconds_is_rejected() {
        for value in ["09:00:30", "17:05:00"] {
            let err = parse_clock_time(value).unwrap_err();
            assert_eq!(err.code, "clock_time", "{value}");
        }
    }

    #[test]
    fn test_validate_clock_time_error_message() {
        let err = validate_clock_time("noon").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Time must be in HH:MM format"
        );
    }

    #[test]
    fn test_validate_date_order() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert!(validate_date_order(start, None).is_ok());
        assert!(validate_date_order(start, Some(start)).is_ok());
        assert!(validate_date_order(start, NaiveDate::from_ymd_opt(2024, 1, 12)).is_ok());

        let err = validate_date_order(start, NaiveDate::from_ymd_opt(2024, 1, 9)).unwrap_err();
        assert_eq!(err.code, "date_order");
    }

    #[derive(Serialize, Deserialize)]
    struct Slot {
        #[serde(with = "optional_clock_time", default)]
        start: Option<NaiveTime>,
    }

    #[test]
    fn test_optional_clock_time_serde() {
        let slot: Slot = serde_json::from_str(r#"{"start":"09:15"}"#).unwrap();
        assert_eq!(slot.start, NaiveTime::from_hms_opt(9, 15, 0));
        assert_eq!(serde_json::to_string(&slot).unwrap(), r#"{"start":"09:15"}"#);

        let empty: Slot = serde_json::from_str(r#"{"start":null}"#).unwrap();
        assert!(empty.start.is_none());

        let missing: Slot = serde_json::from_str("{}").unwrap();
        assert!(missing.start.is_none());

        assert!(serde_json::from_str::<Slot>(r#"{"start":"later"}"#).is_err());
        assert!(serde_json::from_str::<Slot>(r#"{"start":"09:15:30"}"#).is_err());
    }
}
