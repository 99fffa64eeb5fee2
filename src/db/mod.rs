// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (completed activities).

pub mod store;

pub use store::{ActivityDb, ActivityFilter, MAX_LIST_LIMIT};
