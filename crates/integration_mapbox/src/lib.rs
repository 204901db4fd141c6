//! Mapbox integration
//!
//! Client for the [Mapbox](https://www.mapbox.com) geocoding and
//! distance-matrix APIs.
//!
//! # Architecture
//!
//! [`GeocodingClient`] covers place-name and latitude/longitude lookups,
//! [`DurationClient`] covers travel-duration matrices; [`MapboxClient`]
//! implements both. The network round trip goes through an injectable
//! [`HttpTransport`] ([`ReqwestTransport`] by default).
//!
//! Duration rows use `null` for unreachable pairs; these decode to
//! [`NO_PATH_DURATION`] so that they cannot be mistaken for a zero duration.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_mapbox::{GeocodingClient, MapboxClient, MapboxConfig};
//!
//! let client = MapboxClient::new(MapboxConfig::from_env())?;
//!
//! let places = client.lookup_place("Tacquerias El Farolito").await?;
//! for feature in &places.features {
//!     println!("{} ({})", feature.place_name, feature.relevance);
//! }
//!
//! let here = client.lookup_lat_lon(38.8971, -77.0366).await?;
//! ```

mod client;
mod config;
mod coordinates;
mod error;
mod models;
mod query;
mod transport;

pub use client::{DEFAULT_API_VERSION, DurationClient, GeocodingClient, MapboxClient};
pub use config::{API_KEY_ENV, MapboxConfig};
pub use coordinates::{CoordinatePair, InvalidCoordinatePair, NO_PATH_DURATION};
pub use error::MapboxError;
pub use models::{
    DurationRequest, DurationResponse, GeocodeContext, GeocodeFeature, GeocodeMode,
    GeocodeRequest, GeocodeResponse, GeocodeType, Geometry, ReverseGeocodeRequest,
};
pub use query::to_query_params;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, USER_AGENT};
