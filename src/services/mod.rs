// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod engine;
pub mod intent;
pub mod logging;
pub mod normalizer;
pub mod query_builder;
pub mod rate_limit;
pub mod search;
