use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Video quality selector accepted by the video operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    P1080,
    #[default]
    P720,
    P480,
    P360,
    P240,
    P144,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("The selected quality '{0}' is invalid. Allowed values: 1080p, 720p, 480p, 360p, 240p, 144p.")]
pub struct UnknownQuality(pub String);

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
        Quality::P240,
        Quality::P144,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
            Quality::P240 => "240p",
            Quality::P144 => "144p",
        }
    }
}

impl FromStr for Quality {
    type Err = UnknownQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Quality::ALL
            .into_iter()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| UnknownQuality(s.to_string()))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Quality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_values() {
        for q in Quality::ALL {
            assert_eq!(q.as_str().parse::<Quality>().unwrap(), q);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trims() {
        assert_eq!(" 1080P ".parse::<Quality>().unwrap(), Quality::P1080);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for raw in ["4k", "2160p", "720", "", "best"] {
            let err = raw.parse::<Quality>().unwrap_err();
            assert_eq!(err.0, raw);
        }
    }

    #[test]
    fn test_default_is_720p() {
        assert_eq!(Quality::default(), Quality::P720);
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_value(Quality::P480).unwrap();
        assert_eq!(json, serde_json::json!("480p"));
    }
}
