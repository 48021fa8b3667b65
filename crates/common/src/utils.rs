//! Small serde helpers shared across the workspace.

/// Serialize/deserialize a [`std::time::Duration`] as integer milliseconds.
///
/// Used by configuration types so intervals read naturally from TOML/JSON
/// (`export_interval_ms = 60000`).
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a duration as u64 milliseconds.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    /// Deserialize a duration from u64 milliseconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for utils.
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "super::duration_millis")]
        interval: Duration,
    }

    /// Validates the millisecond round trip through serde_json.
    #[test]
    fn test_duration_millis_round_trip() {
        let value = Wrapper { interval: Duration::from_millis(2500) };
        let json = serde_json::to_string(&value).expect("serialize");
        assert_eq!(json, r#"{"interval":2500}"#);

        let back: Wrapper = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, value);
    }
}
