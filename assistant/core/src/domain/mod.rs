// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Aggregates, value objects and the ports the infrastructure layer fills in.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and traits, no I/O

pub mod auth;
pub mod llm;
pub mod memory;
pub mod repository;
pub mod service_config;
pub mod session;
pub mod tool;
pub mod user;
pub mod wardrobe;
pub mod weather;
