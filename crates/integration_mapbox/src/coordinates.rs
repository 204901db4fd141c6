//! Coordinate pair codec
//!
//! Mapbox uses plain JSON number arrays both for `[lon, lat]` positions and
//! for rows of the duration matrix. Rows may contain `null` where no route
//! exists, which decodes to [`NO_PATH_DURATION`] instead of zero.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Sentinel stored in place of `null` entries ("no path found")
pub const NO_PATH_DURATION: f32 = -1.0;

/// An ordered sequence of coordinates or durations
///
/// Encoding writes a plain numeric array. The sentinel is written back as
/// `-1.0`, not `null`, so decode followed by encode is not an identity for
/// rows that contained `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CoordinatePair(Vec<f32>);

/// Error returned when a `lon,lat` string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCoordinatePair(String);

impl fmt::Display for InvalidCoordinatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid coordinate pair: {}", self.0)
    }
}

impl std::error::Error for InvalidCoordinatePair {}

impl CoordinatePair {
    /// Create a pair from raw values
    #[must_use]
    pub const fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Create a `[lon, lat]` position
    #[must_use]
    pub fn lon_lat(longitude: f32, latitude: f32) -> Self {
        Self(vec![longitude, latitude])
    }

    /// Whether the entry at `index` is a real value rather than the sentinel
    ///
    /// Out-of-range indices count as "no path".
    #[must_use]
    pub fn has_path(&self, index: usize) -> bool {
        self.0
            .get(index)
            .is_some_and(|value| value.to_bits() != NO_PATH_DURATION.to_bits())
    }
}

impl Deref for CoordinatePair {
    type Target = [f32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f32>> for CoordinatePair {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl<const N: usize> From<[f32; N]> for CoordinatePair {
    fn from(values: [f32; N]) -> Self {
        Self(values.to_vec())
    }
}

impl FromIterator<f32> for CoordinatePair {
    fn from_iter<I: IntoIterator<Item = f32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for CoordinatePair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Anything but a top-level array is a hard error; element types are not.
        let raw = Vec::<Value>::deserialize(deserializer)?;
        Ok(raw.iter().map(decode_element).collect())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn decode_element(value: &Value) -> f32 {
    match value {
        Value::Number(number) => number.as_f64().map_or(NO_PATH_DURATION, |v| v as f32),
        _ => NO_PATH_DURATION,
    }
}

impl fmt::Display for CoordinatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

impl FromStr for CoordinatePair {
    type Err = InvalidCoordinatePair;

    /// Parse a comma separated list such as `13.41894,52.50055`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| InvalidCoordinatePair(format!("{s}: {e}")))?;

        if values.len() < 2 {
            return Err(InvalidCoordinatePair(format!(
                "{s}: expected at least two values"
            )));
        }

        Ok(Self(values))
    }
}
