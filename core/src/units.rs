use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Units a quantity can be logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Ml,
    Cup,
    Tbsp,
    Tsp,
    Piece,
    Serving,
}

pub const UNITS: &[Unit] = &[
    Unit::G,
    Unit::Ml,
    Unit::Cup,
    Unit::Tbsp,
    Unit::Tsp,
    Unit::Piece,
    Unit::Serving,
];

impl Unit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::G => "g",
            Self::Ml => "ml",
            Self::Cup => "cup",
            Self::Tbsp => "tbsp",
            Self::Tsp => "tsp",
            Self::Piece => "piece",
            Self::Serving => "serving",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::G => "Grams",
            Self::Ml => "Milliliters",
            Self::Cup => "Cup",
            Self::Tbsp => "Tablespoon",
            Self::Tsp => "Teaspoon",
            Self::Piece => "Piece",
            Self::Serving => "Serving",
        }
    }

    /// Units counted as-is against the per-100 reference rather than converted.
    #[must_use]
    pub fn is_approximate(self) -> bool {
        matches!(self, Self::Tsp | Self::Piece | Self::Serving)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "g" | "gram" | "grams" => Ok(Self::G),
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Ok(Self::Ml),
            "cup" | "cups" => Ok(Self::Cup),
            "tbsp" | "tablespoon" | "tablespoons" => Ok(Self::Tbsp),
            "tsp" | "teaspoon" | "teaspoons" => Ok(Self::Tsp),
            "piece" | "pieces" | "pc" | "pcs" => Ok(Self::Piece),
            "serving" | "servings" => Ok(Self::Serving),
            _ => Err(Error::validation(
                "unit",
                format!(
                    "Unknown unit '{s}'. Must be one of: {}",
                    UNITS
                        .iter()
                        .map(|u| u.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }
}

/// Multiplier that turns `quantity` of `unit` into multiples of the food's
/// per-100 g/100 ml reference values.
///
/// `cup` and `tbsp` use fixed, density-independent factors. `tsp`, `piece`
/// and `serving` pass the quantity through unchanged.
#[must_use]
pub fn scale_factor(quantity: f64, unit: Unit) -> f64 {
    match unit {
        Unit::G | Unit::Ml => quantity / 100.0,
        Unit::Cup => quantity * 2.4,
        Unit::Tbsp => quantity * 0.15,
        Unit::Tsp | Unit::Piece | Unit::Serving => quantity,
    }
}
