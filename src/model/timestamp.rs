use chrono::Duration;
use derive_more::{AsRef, Deref, From};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

pub fn now() -> Timestamp {
    chrono::Utc::now().into()
}

/// A UTC instant, stored and transmitted as an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, new, From, Deref, AsRef)]
pub struct Timestamp(chrono::DateTime<chrono::Utc>);

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.to_rfc3339().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| Self(dt.into()))
            .map_err(serde::de::Error::custom)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_json_round_trip() {
        let stamp = now();
        let json = serde_json::to_string(&stamp).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(stamp, back);
    }

    #[test]
    fn rejects_non_rfc3339_text() {
        let result = serde_json::from_str::<Timestamp>("\"yesterday\"");
        assert!(result.is_err(), "free-form dates should not deserialize");
    }

    #[test]
    fn difference_is_a_duration() {
        let start = now();
        let later = start + Duration::minutes(15);
        assert_eq!(later - start, Duration::minutes(15));
    }

    #[test]
    fn shifts_back_by_a_duration() {
        let start = now();
        let shifted = start + Duration::minutes(15) - Duration::seconds(1);
        assert_eq!(shifted - start, Duration::seconds(899));
        assert!(shifted < start + Duration::minutes(15));
    }

    #[test]
    fn wraps_and_exposes_chrono() {
        let instant = chrono::DateTime::parse_from_rfc3339("2024-03-01T10:15:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let stamp = Timestamp::from(instant);

        assert_eq!(*stamp, instant);
        assert_eq!(stamp.as_ref(), &instant);
        assert_eq!(stamp.to_string(), "2024-03-01T10:15:00+00:00");
    }
}
