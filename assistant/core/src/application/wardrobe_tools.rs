// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wardrobe tools
//!
//! The seven functions offered to the assistant model. Each one validates
//! its JSON arguments, talks to a repository or the weather provider, and
//! answers in chat-ready text. Storage failures are reported as friendly text
//! so the model can relay them instead of the run failing.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::domain::repository::{FeedbackRepository, OutfitRepository};
use crate::domain::tool::{AssistantTool, ToolError};
use crate::domain::wardrobe::{ClothingItem, OutfitFeedback, OutfitRecord, WornOutfit, MAX_RATING, MIN_RATING};
use crate::domain::weather::{Location, WeatherProvider};
use crate::infrastructure::tool_router::ToolRouter;

pub const DEFAULT_RECENT_DAYS: i64 = 7;
pub const DEFAULT_MIN_RATING: u8 = 4;

const NO_OUTFIT: &str = "No valid outfit data provided.";
const DB_WRITE_APOLOGY: &str = "⚠️ Sorry, I couldn't save your outfit right now — looks like I'm having trouble connecting to the database. Please try again later!";
const DB_READ_APOLOGY: &str = "⚠️ Hmm, I couldn't fetch your outfits right now — the database might be down. Please try again soon!";
const WEATHER_UNAVAILABLE: &str = "Unable to fetch weather data";

/// Register all wardrobe tools on a router.
pub fn register_wardrobe_tools(
    router: &mut ToolRouter,
    outfits: Arc<dyn OutfitRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    weather: Arc<dyn WeatherProvider>,
) {
    router.register(Arc::new(StoreUserOutfit { outfits: outfits.clone() }));
    router.register(Arc::new(RetrieveUserOutfit { outfits: outfits.clone() }));
    router.register(Arc::new(RetrieveRecentOutfit { outfits: outfits.clone() }));
    router.register(Arc::new(StoreWornOutfit { outfits }));
    router.register(Arc::new(GetWeather { weather }));
    router.register(Arc::new(SaveOutfitFeedback { feedback: feedback.clone() }));
    router.register(Arc::new(FilterOutfitsByFeedback { feedback }));
}

// ============================================================================
// Argument helpers
// ============================================================================

fn invalid(tool: &str, reason: impl Into<String>) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: reason.into(),
    }
}

fn required_str<'a>(args: &'a Value, tool: &str, field: &str) -> Result<&'a str, ToolError> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| invalid(tool, format!("'{}' is required", field)))
}

fn optional_str(args: &Value, field: &str) -> Option<String> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_f64(args: &Value, tool: &str, field: &str) -> Result<f64, ToolError> {
    let value = args.get(field).ok_or_else(|| invalid(tool, format!("'{}' is required", field)))?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| invalid(tool, format!("'{}' must be a number", field)))
}

/// A non-empty list of item objects, or `None` if the model sent anything else.
fn outfit_items(args: &Value) -> Option<Vec<ClothingItem>> {
    let list = args.get("outfit")?.as_array()?;
    if list.is_empty() || !list.iter().all(Value::is_object) {
        return None;
    }
    serde_json::from_value(Value::Array(list.clone())).ok()
}

fn outfit_schema() -> Value {
    json!({
        "type": "array",
        "description": "Clothing items, e.g. [{\"type\": \"hoodie\", \"color\": \"red\", \"style\": \"streetwear\"}]",
        "items": {
            "type": "object",
            "properties": {
                "type": {"type": "string"},
                "color": {"type": "string"},
                "style": {"type": "string"}
            },
            "required": ["type"]
        }
    })
}

fn push_items(out: &mut String, items: &[ClothingItem]) {
    for piece in items {
        out.push_str(&format!(" - {}\n", piece.describe()));
    }
}

// ============================================================================
// Saved outfits
// ============================================================================

pub struct StoreUserOutfit {
    outfits: Arc<dyn OutfitRepository>,
}

#[async_trait]
impl AssistantTool for StoreUserOutfit {
    fn name(&self) -> &str {
        "store_user_outfit"
    }

    fn description(&self) -> &str {
        "Store an outfit the user described, for the given user."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {"type": "string", "description": "The user's unique username"},
                "outfit": outfit_schema()
            },
            "required": ["username", "outfit"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
        let username = required_str(&arguments, self.name(), "username")?;
        let Some(outfit) = outfit_items(&arguments) else {
            return Ok(NO_OUTFIT.to_string());
        };

        match self.outfits.insert_outfit(&OutfitRecord::new(username, outfit)).await {
            Ok(()) => Ok("✅ Outfit saved successfully! You’ve got style 😎".to_string()),
            Err(e) => {
                error!(username, "failed to store outfit: {}", e);
                Ok(DB_WRITE_APOLOGY.to_string())
            }
        }
    }
}

pub struct RetrieveUserOutfit {
    outfits: Arc<dyn OutfitRepository>,
}

#[async_trait]
impl AssistantTool for RetrieveUserOutfit {
    fn name(&self) -> &str {
        "retrieve_user_outfit"
    }

    fn description(&self) -> &str {
        "Retrieve already stored outfits of the given user"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {"type": "string", "description": "The user's unique username"}
            },
            "required": ["username"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
        let username = required_str(&arguments, self.name(), "username")?;

        let outfits = match self.outfits.list_outfits(username).await {
            Ok(outfits) => outfits,
            Err(e) => {
                error!(username, "failed to list outfits: {}", e);
                return Ok(DB_READ_APOLOGY.to_string());
            }
        };

        if outfits.is_empty() {
            return Ok("👕 You haven't saved any outfits yet. Try adding one and I'll keep track for you!".to_string());
        }

        let mut response = format!("Here are your saved outfits, {}:\n\n", username);
        for (idx, record) in outfits.iter().enumerate() {
            response.push_str(&format!("🧥 Outfit {}:\n", idx + 1));
            push_items(&mut response, &record.outfit);
            response.push_str(&format!("   ⏱️ Saved on {}\n\n", record.timestamp.format("%Y-%m-%d %H:%M")));
        }

        Ok(response.trim().to_string())
    }
}

// ============================================================================
// Worn outfits
// ============================================================================

pub struct StoreWornOutfit {
    outfits: Arc<dyn OutfitRepository>,
}

#[async_trait]
impl AssistantTool for StoreWornOutfit {
    fn name(&self) -> &str {
        "store_worn_outfit"
    }

    fn description(&self) -> &str {
        "Record an outfit the user actually wore, optionally with the occasion."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {"type": "string", "description": "The user's unique username"},
                "outfit": outfit_schema(),
                "occasion": {"type": "string", "description": "Where or why it was worn, e.g. 'office', 'wedding'"}
            },
            "required": ["username", "outfit"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
        let username = required_str(&arguments, self.name(), "username")?;
        let Some(outfit) = outfit_items(&arguments) else {
            return Ok(NO_OUTFIT.to_string());
        };
        let occasion = optional_str(&arguments, "occasion");

        let reply = match &occasion {
            Some(occasion) => format!("👍 Got it! I've logged what you wore for {}.", occasion),
            None => "👍 Got it! I've logged what you wore.".to_string(),
        };

        match self.outfits.insert_worn(&WornOutfit::new(username, outfit, occasion)).await {
            Ok(()) => Ok(reply),
            Err(e) => {
                error!(username, "failed to store worn outfit: {}", e);
                Ok(DB_WRITE_APOLOGY.to_string())
            }
        }
    }
}

pub struct RetrieveRecentOutfit {
    outfits: Arc<dyn OutfitRepository>,
}

#[async_trait]
impl AssistantTool for RetrieveRecentOutfit {
    fn name(&self) -> &str {
        "retrieve_recent_outfit"
    }

    fn description(&self) -> &str {
        "Retrieve the outfits the user wore over the last few days, newest first."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {"type": "string", "description": "The user's unique username"},
                "days": {"type": "integer", "description": "How many days back to look (default 7)", "minimum": 1}
            },
            "required": ["username"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
        let username = required_str(&arguments, self.name(), "username")?;
        let days = arguments
            .get("days")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_RECENT_DAYS)
            .clamp(1, 365);
        let since = Utc::now() - Duration::days(days);

        let worn = match self.outfits.list_worn_since(username, since).await {
            Ok(worn) => worn,
            Err(e) => {
                error!(username, "failed to list worn outfits: {}", e);
                return Ok(DB_READ_APOLOGY.to_string());
            }
        };

        if worn.is_empty() {
            return Ok(format!(
                "🗓️ You haven't logged any outfits in the last {} days. Tell me what you wore and I'll remember it!",
                days
            ));
        }

        let mut response = format!("Here's what you wore in the last {} days, {}:\n\n", days, username);
        for entry in &worn {
            match &entry.occasion {
                Some(occasion) => response.push_str(&format!(
                    "👟 {} ({}):\n",
                    entry.worn_at.format("%Y-%m-%d"),
                    occasion
                )),
                None => response.push_str(&format!("👟 {}:\n", entry.worn_at.format("%Y-%m-%d"))),
            }
            push_items(&mut response, &entry.outfit);
            response.push('\n');
        }

        Ok(response.trim().to_string())
    }
}

// ============================================================================
// Weather
// ============================================================================

pub struct GetWeather {
    weather: Arc<dyn WeatherProvider>,
}

#[async_trait]
impl AssistantTool for GetWeather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather (conditions, temperature in °C, feels-like) for a latitude and longitude."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": {"type": "number"},
                "longitude": {"type": "number"}
            },
            "required": ["latitude", "longitude"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
        let latitude = required_f64(&arguments, self.name(), "latitude")?;
        let longitude = required_f64(&arguments, self.name(), "longitude")?;
        let location = Location::new(latitude, longitude).map_err(|e| invalid(self.name(), e.to_string()))?;

        match self.weather.current(location).await {
            Ok(report) => serde_json::to_string(&report).map_err(|e| ToolError::Execution(e.to_string())),
            Err(e) => {
                error!(latitude, longitude, "weather lookup failed: {}", e);
                Ok(json!({ "error": WEATHER_UNAVAILABLE }).to_string())
            }
        }
    }
}

// ============================================================================
// Feedback
// ============================================================================

pub struct SaveOutfitFeedback {
    feedback: Arc<dyn FeedbackRepository>,
}

#[async_trait]
impl AssistantTool for SaveOutfitFeedback {
    fn name(&self) -> &str {
        "save_outfit_feedback"
    }

    fn description(&self) -> &str {
        "Save how much the user liked an outfit, as a rating from 1 to 5 with an optional comment."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {"type": "string", "description": "The user's unique username"},
                "outfit": outfit_schema(),
                "rating": {"type": "integer", "minimum": MIN_RATING, "maximum": MAX_RATING},
                "comment": {"type": "string"}
            },
            "required": ["username", "outfit", "rating"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
        let username = required_str(&arguments, self.name(), "username")?;
        let Some(outfit) = outfit_items(&arguments) else {
            return Ok(NO_OUTFIT.to_string());
        };
        let rating = arguments
            .get("rating")
            .and_then(Value::as_i64)
            .ok_or_else(|| invalid(self.name(), "'rating' must be an integer"))?;

        let feedback = match OutfitFeedback::new(username, outfit, rating, optional_str(&arguments, "comment")) {
            Ok(feedback) => feedback,
            Err(_) => {
                return Ok(format!(
                    "⚠️ Ratings go from {} to {}. Could you rate that outfit again?",
                    MIN_RATING, MAX_RATING
                ))
            }
        };

        match self.feedback.insert(&feedback).await {
            Ok(()) => Ok(format!("📝 Thanks! I saved your {}/{} rating for that outfit.", feedback.rating, MAX_RATING)),
            Err(e) => {
                error!(username, "failed to store feedback: {}", e);
                Ok(DB_WRITE_APOLOGY.to_string())
            }
        }
    }
}

pub struct FilterOutfitsByFeedback {
    feedback: Arc<dyn FeedbackRepository>,
}

#[async_trait]
impl AssistantTool for FilterOutfitsByFeedback {
    fn name(&self) -> &str {
        "filter_outfits_by_feedback"
    }

    fn description(&self) -> &str {
        "List outfits the user rated at or above a minimum rating (default 4), best first."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {"type": "string", "description": "The user's unique username"},
                "min_rating": {"type": "integer", "minimum": MIN_RATING, "maximum": MAX_RATING}
            },
            "required": ["username"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String, ToolError> {
        let username = required_str(&arguments, self.name(), "username")?;
        let min_rating = arguments
            .get("min_rating")
            .and_then(Value::as_i64)
            .map(|r| r.clamp(MIN_RATING as i64, MAX_RATING as i64) as u8)
            .unwrap_or(DEFAULT_MIN_RATING);

        let rated = match self.feedback.list_with_min_rating(username, min_rating).await {
            Ok(rated) => rated,
            Err(e) => {
                error!(username, "failed to list feedback: {}", e);
                return Ok(DB_READ_APOLOGY.to_string());
            }
        };

        if rated.is_empty() {
            return Ok(format!(
                "⭐ You haven't rated any outfits {} or higher yet. Tell me what you thought of one and I'll remember!",
                min_rating
            ));
        }

        let mut response = format!("Here are the outfits you rated {}+, {}:\n\n", min_rating, username);
        for (idx, entry) in rated.iter().enumerate() {
            response.push_str(&format!("⭐ Outfit {} (rated {}/{}):\n", idx + 1, entry.rating, MAX_RATING));
            push_items(&mut response, &entry.outfit);
            if let Some(comment) = &entry.comment {
                response.push_str(&format!("   💬 \"{}\"\n", comment));
            }
            response.push('\n');
        }

        Ok(response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::RepositoryError;
    use crate::domain::weather::{WeatherError, WeatherReport};
    use crate::infrastructure::repositories::{InMemoryFeedbackRepository, InMemoryOutfitRepository};
    use chrono::DateTime;

    struct FixedWeather(Option<WeatherReport>);

    #[async_trait]
    impl WeatherProvider for FixedWeather {
        async fn current(&self, _location: Location) -> Result<WeatherReport, WeatherError> {
            self.0.clone().ok_or_else(|| WeatherError::Network("down".into()))
        }
    }

    struct BrokenOutfits;

    #[async_trait]
    impl OutfitRepository for BrokenOutfits {
        async fn insert_outfit(&self, _outfit: &OutfitRecord) -> Result<(), RepositoryError> {
            Err(RepositoryError::Database("connection refused".into()))
        }
        async fn list_outfits(&self, _username: &str) -> Result<Vec<OutfitRecord>, RepositoryError> {
            Err(RepositoryError::Database("connection refused".into()))
        }
        async fn insert_worn(&self, _worn: &WornOutfit) -> Result<(), RepositoryError> {
            Err(RepositoryError::Database("connection refused".into()))
        }
        async fn list_worn_since(&self, _username: &str, _since: DateTime<Utc>) -> Result<Vec<WornOutfit>, RepositoryError> {
            Err(RepositoryError::Database("connection refused".into()))
        }
    }

    fn router_with(outfits: Arc<dyn OutfitRepository>, weather: Option<WeatherReport>) -> ToolRouter {
        let mut router = ToolRouter::new();
        register_wardrobe_tools(
            &mut router,
            outfits,
            Arc::new(InMemoryFeedbackRepository::new()),
            Arc::new(FixedWeather(weather)),
        );
        router
    }

    fn router() -> ToolRouter {
        router_with(Arc::new(InMemoryOutfitRepository::new()), None)
    }

    #[test]
    fn test_all_tools_registered() {
        let router = router();
        assert_eq!(
            router.tool_names(),
            vec![
                "filter_outfits_by_feedback",
                "get_weather",
                "retrieve_recent_outfit",
                "retrieve_user_outfit",
                "save_outfit_feedback",
                "store_user_outfit",
                "store_worn_outfit",
            ]
        );
    }

    #[tokio::test]
    async fn test_store_then_retrieve_outfit() {
        let router = router();
        let saved = router
            .call_tool(
                "store_user_outfit",
                json!({"username": "ada", "outfit": [{"type": "hoodie", "color": "red", "style": "streetwear"}, {"type": "jeans"}]}),
            )
            .await
            .unwrap();
        assert_eq!(saved, "✅ Outfit saved successfully! You’ve got style 😎");

        let listed = router.call_tool("retrieve_user_outfit", json!({"username": "ada"})).await.unwrap();
        assert!(listed.starts_with("Here are your saved outfits, ada:\n\n🧥 Outfit 1:\n"));
        assert!(listed.contains(" - red hoodie (streetwear)\n"));
        assert!(listed.contains(" - unknown jeans\n"));
        assert!(listed.contains("⏱️ Saved on "));
    }

    #[tokio::test]
    async fn test_store_rejects_empty_outfit() {
        let router = router();
        for outfit in [json!([]), json!("red hoodie"), json!(["red hoodie"])] {
            let reply = router
                .call_tool("store_user_outfit", json!({"username": "ada", "outfit": outfit}))
                .await
                .unwrap();
            assert_eq!(reply, NO_OUTFIT);
        }
    }

    #[tokio::test]
    async fn test_retrieve_with_nothing_saved() {
        let reply = router().call_tool("retrieve_user_outfit", json!({"username": "ada"})).await.unwrap();
        assert!(reply.starts_with("👕 You haven't saved any outfits yet."));
    }

    #[tokio::test]
    async fn test_database_errors_become_apologies() {
        let router = router_with(Arc::new(BrokenOutfits), None);
        let write = router
            .call_tool("store_user_outfit", json!({"username": "ada", "outfit": [{"type": "tee"}]}))
            .await
            .unwrap();
        assert_eq!(write, DB_WRITE_APOLOGY);

        let read = router.call_tool("retrieve_user_outfit", json!({"username": "ada"})).await.unwrap();
        assert_eq!(read, DB_READ_APOLOGY);
    }

    #[tokio::test]
    async fn test_worn_outfits_roundtrip() {
        let router = router();
        let reply = router
            .call_tool(
                "store_worn_outfit",
                json!({"username": "ada", "outfit": [{"type": "blazer", "color": "navy"}], "occasion": "office"}),
            )
            .await
            .unwrap();
        assert!(reply.contains("for office"));

        let recent = router.call_tool("retrieve_recent_outfit", json!({"username": "ada"})).await.unwrap();
        assert!(recent.starts_with("Here's what you wore in the last 7 days, ada:"));
        assert!(recent.contains("(office)"));
        assert!(recent.contains(" - navy blazer"));
    }

    #[tokio::test]
    async fn test_weather_tool() {
        let report = WeatherReport {
            description: "light rain".into(),
            weather_main: "Rain".into(),
            temperature: 12.5,
            feels_like: 10.0,
        };
        let router = router_with(Arc::new(InMemoryOutfitRepository::new()), Some(report));
        let reply = router
            .call_tool("get_weather", json!({"latitude": 51.5, "longitude": -0.12}))
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(parsed["weather_main"], "Rain");
        assert_eq!(parsed["temperature"], 12.5);

        let down = router_with(Arc::new(InMemoryOutfitRepository::new()), None);
        let reply = down
            .call_tool("get_weather", json!({"latitude": 51.5, "longitude": -0.12}))
            .await
            .unwrap();
        assert_eq!(reply, r#"{"error":"Unable to fetch weather data"}"#);

        let err = down
            .call_tool("get_weather", json!({"latitude": 123.0, "longitude": 0.0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_feedback_filtering() {
        let router = router();
        for (rating, color) in [(5, "black"), (2, "orange"), (4, "white")] {
            router
                .call_tool(
                    "save_outfit_feedback",
                    json!({"username": "ada", "outfit": [{"type": "tee", "color": color}], "rating": rating, "comment": "nice"}),
                )
                .await
                .unwrap();
        }

        let liked = router.call_tool("filter_outfits_by_feedback", json!({"username": "ada"})).await.unwrap();
        assert!(liked.starts_with("Here are the outfits you rated 4+, ada:"));
        assert!(liked.contains("black tee"));
        assert!(liked.contains("white tee"));
        assert!(!liked.contains("orange tee"));
        assert!(liked.find("black").unwrap() < liked.find("white").unwrap());

        let out_of_range = router
            .call_tool(
                "save_outfit_feedback",
                json!({"username": "ada", "outfit": [{"type": "tee"}], "rating": 9}),
            )
            .await
            .unwrap();
        assert!(out_of_range.starts_with("⚠️ Ratings go from 1 to 5"));
    }

    #[tokio::test]
    async fn test_missing_username_is_an_argument_error() {
        let err = router().call_tool("retrieve_user_outfit", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
