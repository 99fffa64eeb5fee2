//! Application configuration loaded from environment variables.
//!
//! Everything has a default, so a bare `cargo run` starts an in-memory
//! tracker on port 8080.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::services::kinematics::{
    CURRENT_PACE_WINDOW_MS, DEFAULT_ACCURACY_THRESHOLD_M, DEFAULT_WEIGHT_KG,
};
use crate::services::location::{LocationRequest, DEFAULT_FIX_BUFFER};
use crate::services::orchestrator::TrackingConfig;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// JSON file for completed activities; in-memory when unset
    pub activity_db_path: Option<PathBuf>,

    // --- Tracking ---
    pub accuracy_threshold_m: f64,
    /// Body weight used by the calorie model
    pub weight_kg: f64,
    pub pace_window_secs: u64,

    // --- Location updates ---
    pub location_interval_ms: u64,
    pub location_fastest_interval_ms: u64,
    pub location_max_delay_ms: u64,
    pub location_high_accuracy: bool,
    pub location_wait_for_accurate: bool,
    pub location_buffer: usize,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        let request = LocationRequest::default();
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            activity_db_path: None,
            accuracy_threshold_m: DEFAULT_ACCURACY_THRESHOLD_M,
            weight_kg: DEFAULT_WEIGHT_KG,
            pace_window_secs: (CURRENT_PACE_WINDOW_MS / 1000) as u64,
            location_interval_ms: request.interval_ms,
            location_fastest_interval_ms: request.fastest_interval_ms,
            location_max_delay_ms: request.max_update_delay_ms,
            location_high_accuracy: request.high_accuracy,
            location_wait_for_accurate: request.wait_for_accurate_location,
            location_buffer: DEFAULT_FIX_BUFFER,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();
        Ok(Self {
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            port: parse_var("PORT", defaults.port)?,
            activity_db_path: env::var("ACTIVITY_DB_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            accuracy_threshold_m: parse_var(
                "GPS_ACCURACY_THRESHOLD_M",
                defaults.accuracy_threshold_m,
            )?,
            weight_kg: parse_var("DEFAULT_WEIGHT_KG", defaults.weight_kg)?,
            pace_window_secs: parse_var("PACE_WINDOW_SECS", defaults.pace_window_secs)?,

            location_interval_ms: parse_var("LOCATION_INTERVAL_MS", defaults.location_interval_ms)?,
            location_fastest_interval_ms: parse_var(
                "LOCATION_FASTEST_INTERVAL_MS",
                defaults.location_fastest_interval_ms,
            )?,
            location_max_delay_ms: parse_var(
                "LOCATION_MAX_DELAY_MS",
                defaults.location_max_delay_ms,
            )?,
            location_high_accuracy: parse_var(
                "LOCATION_HIGH_ACCURACY",
                defaults.location_high_accuracy,
            )?,
            location_wait_for_accurate: parse_var(
                "LOCATION_WAIT_FOR_ACCURATE",
                defaults.location_wait_for_accurate,
            )?,
            location_buffer: parse_var("LOCATION_BUFFER", defaults.location_buffer)?,
        })
    }

    /// Settings for the tracking core.
    pub fn tracking(&self) -> TrackingConfig {
        TrackingConfig {
            accuracy_threshold_m: self.accuracy_threshold_m,
            weight_kg: self.weight_kg,
            pace_window_ms: (self.pace_window_secs as i64).saturating_mul(1000),
        }
    }

    /// Location subscription parameters.
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            interval_ms: self.location_interval_ms,
            fastest_interval_ms: self.location_fastest_interval_ms,
            max_update_delay_ms: self.location_max_delay_ms,
            high_accuracy: self.location_high_accuracy,
            wait_for_accurate_location: self.location_wait_for_accurate,
            accuracy_threshold_m: self.accuracy_threshold_m,
            buffer: self.location_buffer,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, value)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}
