// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod llm;
pub mod password;
pub mod prompt_template_engine;
pub mod repositories;
pub mod token;
pub mod tool_router;
pub mod weather;
