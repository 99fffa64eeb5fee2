// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod route;
pub mod session;
pub mod stats;

pub use activity::{ActivityType, CompletedActivity, ManualEntry};
pub use route::{LocationFix, RoutePoint};
pub use session::{LiveSessionState, SessionPhase};
pub use stats::{ActivityHighlight, ActivityStats};
