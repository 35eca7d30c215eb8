use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EdgeError;

/// Chart timeframe a pattern was observed on.
///
/// Closed vocabulary; serialized as the bare variant name (`"H1"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [Self::M15, Self::H1, Self::H4, Self::D1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M15 => "M15",
            Self::H1 => "H1",
            Self::H4 => "H4",
            Self::D1 => "D1",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::H1
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M15" => Ok(Self::M15),
            "H1" => Ok(Self::H1),
            "H4" => Ok(Self::H4),
            "D1" => Ok(Self::D1),
            _ => Err(EdgeError::UnknownTimeframe(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_timeframes_case_insensitively() {
        assert_eq!("h4".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert_eq!(" M15 ".parse::<Timeframe>().unwrap(), Timeframe::M15);
        for tf in Timeframe::ALL {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn rejects_unknown_timeframe() {
        let err = "M5".parse::<Timeframe>().unwrap_err();
        assert!(matches!(err, EdgeError::UnknownTimeframe(ref s) if s == "M5"));
    }

    #[test]
    fn serializes_as_bare_name() {
        assert_eq!(serde_json::to_string(&Timeframe::D1).unwrap(), "\"D1\"");
        let tf: Timeframe = serde_json::from_str("\"M15\"").unwrap();
        assert_eq!(tf, Timeframe::M15);
    }
}
