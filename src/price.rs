use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;

/// A price quantized to 2 decimal places, stored as integer hundredths
/// ("ticks") so it can key a [`BTreeMap`](std::collections::BTreeMap)
/// without float-ordering surprises.
///
/// On the wire a price is a plain JSON float (`100.10`); decoding rejects
/// anything non-finite or non-positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl Price {
    /// Build from integer hundredths, e.g. `Price::from_ticks(10010)` is $100.10.
    pub const fn from_ticks(ticks: u64) -> Self {
        Price(ticks)
    }

    /// Build from major units, rounding to the nearest tick.
    /// Returns `None` for non-finite or non-positive values.
    pub fn from_major(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Some(Price((value * 100.0).round() as u64))
    }

    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Price in major units, e.g. `10010` ticks is `100.10`.
    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_major())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Price::from_major(value)
            .ok_or_else(|| de::Error::custom(format!("price must be a positive number, got {value}")))
    }
}
