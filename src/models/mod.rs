// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod pet;
pub mod point;
pub mod walk;

pub use pet::Pet;
pub use point::{Position, RawPoint, WalkPoint};
pub use walk::{Walk, WalkCompletion, WalkMetrics, WalkState};
