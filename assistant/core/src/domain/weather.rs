// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Coordinates reported by the client alongside a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WeatherError> {
        let location = Self { latitude, longitude };
        location.validate()?;
        Ok(location)
    }

    pub fn validate(&self) -> Result<(), WeatherError> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(WeatherError::InvalidLocation(self.latitude, self.longitude));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub description: String,
    pub weather_main: String,
    /// Degrees in the configured units (Celsius for `metric`)
    pub temperature: f64,
    pub feels_like: f64,
}

impl WeatherReport {
    pub fn summary(&self) -> String {
        format!(
            "{} ({}), {:.1}° (feels like {:.1}°)",
            self.weather_main, self.description, self.temperature, self.feels_like
        )
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: Location) -> Result<WeatherReport, WeatherError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather API key is not configured")]
    MissingApiKey,

    #[error("Invalid coordinates: lat {0}, lon {1}")]
    InvalidLocation(f64, f64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected weather payload: {0}")]
    Payload(String),
}
