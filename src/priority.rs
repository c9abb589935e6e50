//! Note priorities and their fixed display colours.
use std::{fmt, str::FromStr};

use console::Style;
use serde::{Deserialize, Serialize};

use crate::NoteError;

/// An sRGB display colour with a stable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub name: &'static str,
    pub rgb: (u8, u8, u8),
}

impl Color {
    /// `#rrggbb` form, handy for JSON output.
    pub fn hex(&self) -> String {
        let (r, g, b) = self.rgb;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

const GREEN: Color = Color {
    name: "green",
    rgb: (0, 255, 0),
};
const ORANGE: Color = Color {
    name: "orange",
    rgb: (255, 128, 0),
};
const RED: Color = Color {
    name: "red",
    rgb: (255, 0, 0),
};

/// Closed set of note priorities.
///
/// This is the only form in which a note's colour is persisted, so a stored
/// document can never smuggle in an arbitrary colour value: anything other
/// than `"low"`, `"medium"` or `"high"` fails to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// The fixed display colour for this priority.
    pub fn color(self) -> Color {
        match self {
            Priority::Low => GREEN,
            Priority::Medium => ORANGE,
            Priority::High => RED,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low priority",
            Priority::Medium => "Medium priority",
            Priority::High => "High priority",
        }
    }

    /// Terminal style matching the display colour.
    pub fn style(self) -> Style {
        match self {
            Priority::Low => Style::new().green(),
            Priority::Medium => Style::new().color256(208),
            Priority::High => Style::new().red(),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(NoteError::validation(format!(
                "unknown priority '{}', expected one of: low, medium, high",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_priority_has_its_own_colour() {
        assert_eq!(Priority::Low.color().name, "green");
        assert_eq!(Priority::Medium.color().name, "orange");
        assert_eq!(Priority::High.color().name, "red");
        assert_eq!(Priority::High.color().hex(), "#ff0000");
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" medium ".parse::<Priority>().unwrap(), Priority::Medium);
    }

    #[test]
    fn unknown_priority_is_a_validation_error() {
        let err = "purple".parse::<Priority>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn deserialization_is_limited_to_the_closed_set() {
        let ok: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(ok, Priority::Low);

        assert!(serde_json::from_str::<Priority>("\"green\"").is_err());
        assert!(serde_json::from_str::<Priority>("{\"r\":255,\"g\":0,\"b\":0}").is_err());
        assert!(serde_json::from_str::<Priority>("2").is_err());
    }
}
