// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Wardrobe Assistant Rust SDK
//!
//! Typed client for the assistant's HTTP API: accounts, chat and sessions.

pub mod client;
pub mod types;

pub use client::{ClientError, WardrobeClient};
pub use types::*;
