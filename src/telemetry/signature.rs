//! Telemetry readings and payload decoding.

use crate::error::{Result, ServiceError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Lowest safe battery temperature (inclusive), in degrees Celsius
pub const SAFE_TEMPERATURE_MIN: f64 = 20.0;

/// Highest safe battery temperature (inclusive), in degrees Celsius
pub const SAFE_TEMPERATURE_MAX: f64 = 80.0;

/// Longest payload excerpt quoted in an error record
const PAYLOAD_PREVIEW_CHARS: usize = 256;

/// One accepted battery temperature reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Producer timestamp (Unix timestamp in milliseconds)
    pub timestamp: i64,
    /// Battery temperature in degrees Celsius
    pub temperature: f64,
    /// Whether the temperature was inside the safe band when accepted
    pub is_safe: bool,
}

/// Wire shape of an inbound reading.
#[derive(Debug, Deserialize)]
struct RawReading {
    battery_temperature: f64,
    timestamp: i64,
}

impl Signature {
    /// Create a reading, tagging it with the safety evaluation.
    pub fn new(temperature: f64, timestamp: i64) -> Self {
        Self {
            timestamp,
            temperature,
            is_safe: is_safe(temperature),
        }
    }

    /// Placeholder reported as the median while no reading has been accepted.
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            temperature: 0.0,
            is_safe: false,
        }
    }

    /// The producer timestamp as ISO-8601, or the raw milliseconds if out of range.
    pub fn iso_timestamp(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

/// Whether `temperature` lies inside the safe band. Both bounds are safe.
pub fn is_safe(temperature: f64) -> bool {
    (SAFE_TEMPERATURE_MIN..=SAFE_TEMPERATURE_MAX).contains(&temperature)
}

/// Decode one inbound payload into a [`Signature`].
///
/// The payload must be a JSON object with a numeric `battery_temperature`
/// and an integer `timestamp`; extra fields are ignored.
pub fn parse_signature(payload: &[u8]) -> Result<Signature> {
    let raw: RawReading = serde_json::from_slice(payload).map_err(|e| {
        ServiceError::malformed_payload(format!("{}; payload: {}", e, preview(payload)))
    })?;

    Ok(Signature::new(raw.battery_temperature, raw.timestamp))
}

fn preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.chars().count() > PAYLOAD_PREVIEW_CHARS {
        let cut: String = text.chars().take(PAYLOAD_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_band_boundaries() {
        assert!(is_safe(20.0));
        assert!(is_safe(80.0));
        assert!(is_safe(45.0));
        assert!(!is_safe(19.999));
        assert!(!is_safe(80.001));
        assert!(!is_safe(f64::NAN));
    }

    #[test]
    fn test_parse_valid_payload() {
        let signature =
            parse_signature(br#"{"battery_temperature":40.748,"timestamp":1693741005254}"#)
                .unwrap();
        assert_eq!(signature.temperature, 40.748);
        assert_eq!(signature.timestamp, 1693741005254);
        assert!(signature.is_safe);
    }

    #[test]
    fn test_parse_tags_unsafe_reading() {
        let signature =
            parse_signature(br#"{"battery_temperature":95.5,"timestamp":1}"#).unwrap();
        assert!(!signature.is_safe);
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let signature = parse_signature(
            br#"{"battery_temperature":30,"timestamp":5,"sensor":"pack-a"}"#,
        )
        .unwrap();
        assert_eq!(signature.temperature, 30.0);
    }

    #[test]
    fn test_parse_rejects_trailing_garbage() {
        let err = parse_signature(
            br#"{"battery_temperature":53.713094001803235,"timestamp":1693740870134}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::MalformedPayload(_)));
    }

    #[test]
    fn test_parse_rejects_missing_and_mistyped_fields() {
        assert!(parse_signature(br#"{"battery_temperature":40.0}"#).is_err());
        assert!(parse_signature(br#"{"timestamp":1693740870134}"#).is_err());
        assert!(parse_signature(br#"{"battery_temperature":"hot","timestamp":1}"#).is_err());
        assert!(parse_signature(br#"{"battery_temperature":40.0,"timestamp":1.5}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_encoding() {
        let err = parse_signature(b"{\"battery_temperature\":\xff\xfe}").unwrap_err();
        assert!(err.to_string().starts_with("Malformed payload"));
    }

    #[test]
    fn test_error_quotes_truncated_payload() {
        let long = format!("{{\"x\":\"{}\"", "a".repeat(1000));
        let err = parse_signature(long.as_bytes()).unwrap_err().to_string();
        assert!(err.ends_with("..."));
        assert!(err.len() < 600);
    }

    #[test]
    fn test_iso_timestamp() {
        let signature = Signature::new(40.0, 1693741005254);
        assert_eq!(signature.iso_timestamp(), "2023-09-03T11:36:45.254Z");
    }
}
