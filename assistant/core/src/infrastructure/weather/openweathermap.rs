// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenWeatherMap current-weather adapter

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::weather::{Location, WeatherError, WeatherProvider, WeatherReport};

pub struct OpenWeatherMapClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    units: String,
}

#[derive(Deserialize)]
struct CurrentWeatherResponse {
    weather: Vec<WeatherCondition>,
    main: MainReadings,
}

#[derive(Deserialize)]
struct WeatherCondition {
    main: String,
    description: String,
}

#[derive(Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
}

impl OpenWeatherMapClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, units: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            units: units.into(),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    async fn current(&self, location: Location) -> Result<WeatherReport, WeatherError> {
        location.validate()?;
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;

        let url = format!("{}/weather", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("units", self.units.clone()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WeatherError::Network(format!("HTTP {}", response.status())));
        }

        let body: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Payload(e.to_string()))?;

        let condition = body
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Payload("no weather conditions in response".into()))?;

        Ok(WeatherReport {
            description: condition.description,
            weather_main: condition.main,
            temperature: body.main.temp,
            feels_like: body.main.feels_like,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_current_weather() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/weather")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lat".into(), "9.0079".into()),
                Matcher::UrlEncoded("units".into(), "metric".into()),
                Matcher::UrlEncoded("appid".into(), "owm-key".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"weather":[{"main":"Clouds","description":"broken clouds"}],"main":{"temp":17.4,"feels_like":16.9}}"#,
            )
            .create_async()
            .await;

        let client = OpenWeatherMapClient::new(server.url(), Some("owm-key".into()), "metric");
        let report = client.current(Location::new(9.0079, 38.7481).unwrap()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(report.weather_main, "Clouds");
        assert_eq!(report.description, "broken clouds");
        assert_eq!(report.temperature, 17.4);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = OpenWeatherMapClient::new("http://localhost:1", None, "metric");
        let err = client.current(Location::new(0.0, 0.0).unwrap()).await.unwrap_err();
        assert!(matches!(err, WeatherError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/weather").match_query(Matcher::Any).with_status(401).create_async().await;

        let client = OpenWeatherMapClient::new(server.url(), Some("bad".into()), "metric");
        let err = client.current(Location::new(0.0, 0.0).unwrap()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Network(_)));
    }
}
