//! Device categories — each one is bound to a single driver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Class of hardware a device belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Networked display panels.
    Display,
    /// Desktop computers (wake packet / remote shutdown).
    Computer,
    /// Smart plugs and lights.
    Light,
    /// Projectors with a lamp warm-up/cool-down cycle.
    Projector,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Self; 4] = [Self::Display, Self::Computer, Self::Light, Self::Projector];

    /// Canonical lowercase name used in storage and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Computer => "computer",
            Self::Light => "light",
            Self::Projector => "projector",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    /// Accepts the canonical name plus the plural/legacy route segments
    /// (`screens`, `computers`, `lights`, `projectors`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "display" | "displays" | "screen" | "screens" => Ok(Self::Display),
            "computer" | "computers" | "pc" => Ok(Self::Computer),
            "light" | "lights" => Ok(Self::Light),
            "projector" | "projectors" => Ok(Self::Projector),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_route_aliases() {
        assert_eq!("screens".parse::<Category>().unwrap(), Category::Display);
        assert_eq!("Computer".parse::<Category>().unwrap(), Category::Computer);
        assert_eq!("lights".parse::<Category>().unwrap(), Category::Light);
        assert_eq!("PROJECTOR".parse::<Category>().unwrap(), Category::Projector);
    }

    #[test]
    fn should_reject_unknown_category() {
        assert_eq!(
            "toaster".parse::<Category>(),
            Err(ValidationError::UnknownCategory("toaster".to_string()))
        );
    }

    #[test]
    fn should_roundtrip_canonical_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }
}
