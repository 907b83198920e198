//! Serde helpers for human-readable durations in the config file.
//!
//! Accepts either integer seconds (`request_timeout = 2`) or a humantime
//! string (`request_timeout = "1500ms"`, `badge_ttl = "1h"`).

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

pub mod duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as seconds (number) or human-readable string (e.g. '1500ms', '10m', '1h')")
            }

            fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Duration::from_secs(seconds))
            }

            fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(seconds)
                    .map(Duration::from_secs)
                    .map_err(|_| de::Error::custom(format!("Negative duration: {seconds}")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                humantime::parse_duration(value)
                    .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "super::duration")]
        value: Duration,
    }

    #[test]
    fn test_parse_human_readable() {
        let parsed: Timeouts = toml::from_str(r#"value = "1500ms""#).unwrap();
        assert_eq!(parsed.value, Duration::from_millis(1500));

        let parsed: Timeouts = toml::from_str(r#"value = "10m""#).unwrap();
        assert_eq!(parsed.value, Duration::from_secs(600));
    }

    #[test]
    fn test_parse_seconds() {
        let parsed: Timeouts = toml::from_str("value = 30").unwrap();
        assert_eq!(parsed.value, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(toml::from_str::<Timeouts>(r#"value = "soon""#).is_err());
        assert!(toml::from_str::<Timeouts>("value = -5").is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let original = Timeouts {
            value: Duration::from_secs(3600),
        };
        let encoded = toml::to_string(&original).unwrap();
        assert!(encoded.contains(r#"value = "1h""#));
    }
}
