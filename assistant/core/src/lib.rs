// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wardrobe Assistant core
//!
//! Domain model, application services and the HTTP surface of the outfit
//! assistant backend.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Wires users, chat sessions and the tool-calling assistant

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
