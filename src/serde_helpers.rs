//! Serde helpers for the timestamp formats used by the feeds.

use chrono::NaiveDateTime;
use serde::{Deserialize as _, Deserializer, Serializer};

/// Format the agent feed uses for `created_at` and `market_cap_updated_at`.
pub const AGENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `#[serde(with = "...")]` codec for [`AGENT_TIMESTAMP_FORMAT`] timestamps.
///
/// The feed renders server-local wall-clock time without an offset, so the value is kept naive.
pub mod agent_timestamp {
    use super::{AGENT_TIMESTAMP_FORMAT, Deserializer, NaiveDateTime, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(AGENT_TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        super::deserialize_naive(deserializer)
    }
}

fn deserialize_naive<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, AGENT_TIMESTAMP_FORMAT).map_err(|e| {
        serde::de::Error::custom(format!(
            "invalid timestamp {raw:?}, expected {AGENT_TIMESTAMP_FORMAT}: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stamped {
        #[serde(with = "super::agent_timestamp")]
        at: chrono::NaiveDateTime,
    }

    #[test]
    fn agent_timestamp_roundtrip() {
        let json = r#"{"at":"2024-12-13 07:14:33"}"#;

        let stamped: Stamped = serde_json::from_str(json).expect("deserialization failed");
        let expected = NaiveDate::from_ymd_opt(2024, 12, 13)
            .and_then(|date| date.and_hms_opt(7, 14, 33))
            .expect("valid date");

        assert_eq!(stamped.at, expected);
        assert_eq!(serde_json::to_string(&stamped).expect("serialization failed"), json);
    }

    #[test]
    fn rfc3339_is_rejected() {
        let result = serde_json::from_str::<Stamped>(r#"{"at":"2024-12-13T07:14:33Z"}"#);

        let message = result.expect_err("RFC 3339 is not the agent feed format").to_string();
        assert!(message.contains("expected %Y-%m-%d %H:%M:%S"), "{message}");
    }
}
