//! Mapbox CLI
//!
//! Reverse-geocodes a latitude/longitude pair, looks up places by name and
//! prints travel-duration matrices.

#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use integration_mapbox::{
    CoordinatePair, DurationClient, DurationRequest, DurationResponse, GeocodeResponse,
    GeocodingClient, MapboxClient, MapboxConfig,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mapbox CLI
#[derive(Parser)]
#[command(name = "mapbox-revgeocode")]
#[command(author, version, about = "Mapbox geocoding from the command line", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Latitude to reverse-geocode
    #[arg(long, default_value_t = 38.8971, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude to reverse-geocode
    #[arg(long, default_value_t = -77.0366, allow_negative_numbers = true)]
    lon: f64,

    /// Mapbox access token
    #[arg(long, env = "MAPBOX_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long, default_value = "https://api.mapbox.com")]
    base_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reverse-geocode --lat/--lon (the default)
    Reverse,

    /// Look up a place by name
    ///
    /// Example: mapbox-revgeocode place "Los Angeles"
    Place {
        /// Place name
        query: String,
    },

    /// Driving durations between two or more points
    ///
    /// Example: mapbox-revgeocode durations 13.41894,52.50055 14.10293,52.50055
    Durations {
        /// Points as LON,LAT
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        points: Vec<CoordinatePair>,
    },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn print_places(response: &GeocodeResponse) {
    if let Some(query) = &response.query {
        println!("🔎 Query: {query}");
    }
    println!("📍 {} feature(s)", response.features.len());

    for (i, feature) in response.features.iter().enumerate() {
        println!("\n#{i}: {}", feature.place_name);
        println!("   id:        {}", feature.id);
        println!("   relevance: {}", feature.relevance);
        if let Some((lat, lon)) = feature.lat_lon() {
            println!("   center:    {lat:.6}, {lon:.6}");
        }
        for ctx in &feature.context {
            if ctx.short_code.is_empty() {
                println!("   - {} ({})", ctx.text, ctx.id);
            } else {
                println!("   - {} ({}, {})", ctx.text, ctx.id, ctx.short_code);
            }
        }
    }

    if let Some(attribution) = &response.attribution {
        println!("\n{attribution}");
    }
}

fn print_durations(points: &[CoordinatePair], response: &DurationResponse) {
    println!("⏱️  Driving durations (seconds):");
    for (from, origin) in points.iter().enumerate() {
        let cells: Vec<String> = (0..points.len())
            .map(|to| {
                response
                    .duration(from, to)
                    .map_or_else(|| "-".to_string(), |seconds| format!("{seconds:.0}"))
            })
            .collect();
        println!("  [{origin}] {}", cells.join("\t"));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = log_filter_from_verbosity(cli.verbose);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = MapboxConfig {
        base_url: cli.base_url,
        ..MapboxConfig::default()
    };
    if let Some(key) = cli.api_key.filter(|key| !key.is_empty()) {
        config = config.with_api_key(key);
    }
    let client = MapboxClient::new(config)?;

    match cli.command.unwrap_or(Commands::Reverse) {
        Commands::Reverse => {
            info!(lat = cli.lat, lon = cli.lon, "Reverse geocoding");
            let response = client.lookup_lat_lon(cli.lat, cli.lon).await?;
            print_places(&response);
        },

        Commands::Place { query } => {
            info!(%query, "Looking up place");
            let response = client.lookup_place(&query).await?;
            print_places(&response);
        },

        Commands::Durations { points } => {
            if points.len() < 2 {
                anyhow::bail!("at least two points are needed");
            }
            info!(points = points.len(), "Requesting durations");
            let request = DurationRequest::new(points.iter().cloned());
            let response = client.request_duration(&request).await?;
            print_durations(&points, &response);
        },
    }

    Ok(())
}
