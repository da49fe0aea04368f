// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `wardrobe chat`: send one message to the assistant

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use wardrobe_assistant_sdk::{Location, WardrobeClient};

#[derive(Args)]
pub struct ChatArgs {
    /// Message for the assistant
    #[arg(value_name = "MESSAGE")]
    pub message: String,

    /// Continue an existing session instead of starting a new one
    #[arg(short, long, value_name = "SESSION_ID")]
    pub session: Option<String>,

    /// Latitude of your current location
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of your current location
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl ChatArgs {
    fn location(&self) -> Result<Option<Location>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(Location::new(lat, lon).context("Invalid location")?)),
            _ => Ok(None),
        }
    }
}

pub async fn handle_command(args: ChatArgs, client: WardrobeClient) -> Result<()> {
    let location = args.location()?;
    let reply = client
        .chat(&args.message, args.session.as_deref(), location)
        .await
        .context("Chat request failed")?;

    println!("{}", reply.response);
    println!();
    println!("{} {}", "session:".dimmed(), reply.session_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ChatArgs,
    }

    #[test]
    fn test_location_from_flags() {
        let h = Harness::try_parse_from(["chat", "hi", "--lat", "-33.9", "--lon", "18.4"]).unwrap();
        let location = h.args.location().unwrap().unwrap();
        assert_eq!(location.latitude, -33.9);
        assert_eq!(location.longitude, 18.4);
    }

    #[test]
    fn test_lat_without_lon_is_rejected() {
        assert!(Harness::try_parse_from(["chat", "hi", "--lat", "10"]).is_err());
    }

    #[test]
    fn test_out_of_range_location() {
        let h = Harness::try_parse_from(["chat", "hi", "--lat", "95", "--lon", "0"]).unwrap();
        assert!(h.args.location().is_err());
    }
}
