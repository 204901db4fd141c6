//! Mapbox request and response models
//!
//! Typed representations of the geocoding (`/geocoding/v5`) and
//! distance-matrix (`/distances/{version}`) payloads.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::coordinates::CoordinatePair;

/// Read an explicit `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Geocoding dataset to query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeocodeMode {
    /// Temporary geocoding (`mapbox.places`)
    #[default]
    #[serde(rename = "mapbox.places")]
    Places,
    /// Permanent geocoding (`mapbox.places-permanent`), results may be stored
    #[serde(rename = "mapbox.places-permanent")]
    PermanentPlaces,
}

impl GeocodeMode {
    /// Path segment used in the endpoint URL
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Places => "mapbox.places",
            Self::PermanentPlaces => "mapbox.places-permanent",
        }
    }
}

impl fmt::Display for GeocodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature types that can be used to filter results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeType {
    Region,
    Postcode,
    Place,
    Locality,
    Neighborhood,
    Address,
    Poi,
    #[serde(rename = "poi.landmark")]
    PoiLandmark,
}

/// Optional filters applied to a geocoding lookup
///
/// Unset fields are omitted from the query string entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeRequest {
    /// ISO 3166 alpha 2 country codes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub country: Vec<String>,

    /// Maximum number of results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Restrict results to these feature types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<GeocodeType>,

    /// Bias results towards this `[lon, lat]` position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proximity: Option<CoordinatePair>,

    /// `[min_lon, min_lat, max_lon, max_lat]`
    #[serde(rename = "bbox", default, skip_serializing_if = "Vec::is_empty")]
    pub bounding_box: Vec<f32>,

    /// Return partial-word matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<bool>,
}

impl GeocodeRequest {
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_country(mut self, code: impl Into<String>) -> Self {
        self.country.push(code.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, kind: GeocodeType) -> Self {
        self.types.push(kind);
        self
    }

    #[must_use]
    pub fn with_proximity(mut self, longitude: f32, latitude: f32) -> Self {
        self.proximity = Some(CoordinatePair::lon_lat(longitude, latitude));
        self
    }

    #[must_use]
    pub fn with_bounding_box(
        mut self,
        min_longitude: f32,
        min_latitude: f32,
        max_longitude: f32,
        max_latitude: f32,
    ) -> Self {
        self.bounding_box = vec![min_longitude, min_latitude, max_longitude, max_latitude];
        self
    }

    #[must_use]
    pub fn with_autocomplete(mut self, enabled: bool) -> Self {
        self.autocomplete = Some(enabled);
        self
    }
}

/// A geocoding lookup: free-text query (or `lon,lat`), mode and filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocodeRequest {
    /// Place text or `"{lon},{lat}"`
    pub query: String,
    /// Dataset to query (defaults to [`GeocodeMode::Places`])
    #[serde(default)]
    pub mode: GeocodeMode,
    /// Optional filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<GeocodeRequest>,
}

impl ReverseGeocodeRequest {
    /// Lookup for `query` using the default mode and no filters
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: GeocodeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, request: GeocodeRequest) -> Self {
        self.request = Some(request);
        self
    }
}

/// One entry of a feature's administrative hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeContext {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub short_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub wikidata: String,
}

/// GeoJSON geometry of a feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub coordinates: Vec<f32>,
}

/// A single matched place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeFeature {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub place_name: String,
    /// Match quality, 0.0 to 1.0
    #[serde(deserialize_with = "null_as_default")]
    pub relevance: f32,

    /// Free-form properties (`wikidata`, `short_code`, `category`, ...)
    pub properties: Option<Map<String, Value>>,
    /// Administrative hierarchy, most specific first
    #[serde(deserialize_with = "null_as_default")]
    pub context: Vec<GeocodeContext>,

    #[serde(rename = "bbox", deserialize_with = "null_as_default")]
    pub bounding_box: Vec<f32>,
    /// `[lon, lat]`
    #[serde(deserialize_with = "null_as_default")]
    pub center: Vec<f32>,
    pub geometry: Option<Geometry>,
    #[serde(deserialize_with = "null_as_default")]
    pub attribution: String,
}

impl GeocodeFeature {
    /// Center as `(latitude, longitude)`, if present
    #[must_use]
    pub fn lat_lon(&self) -> Option<(f32, f32)> {
        match self.center.as_slice() {
            [lon, lat, ..] => Some((*lat, *lon)),
            _ => None,
        }
    }
}

/// Geocoding response envelope (a GeoJSON `FeatureCollection`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResponse {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub kind: String,
    /// Echoed query; tokens that are not numbers decode to the sentinel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<CoordinatePair>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub features: Vec<GeocodeFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

/// Locations to compute pairwise travel durations for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationRequest {
    /// `[lon, lat]` positions, in matrix order
    pub coordinates: Vec<CoordinatePair>,
}

impl DurationRequest {
    #[must_use]
    pub fn new(coordinates: impl IntoIterator<Item = CoordinatePair>) -> Self {
        Self {
            coordinates: coordinates.into_iter().collect(),
        }
    }
}

/// Duration matrix: `durations[i][j]` is the travel time in seconds from `i` to `j`
///
/// Unreachable pairs hold [`NO_PATH_DURATION`](crate::NO_PATH_DURATION).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationResponse {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub durations: Vec<CoordinatePair>,
}

impl DurationResponse {
    /// Duration from `from` to `to`, `None` if out of range or unreachable
    #[must_use]
    pub fn duration(&self, from: usize, to: usize) -> Option<f32> {
        let row = self.durations.get(from)?;
        row.get(to).copied().filter(|_| row.has_path(to))
    }

    /// Whether the matrix has `n` rows of `n` entries
    #[must_use]
    pub fn is_square(&self, n: usize) -> bool {
        self.durations.len() == n && self.durations.iter().all(|row| row.len() == n)
    }
}
