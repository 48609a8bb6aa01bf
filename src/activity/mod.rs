//! Presence payload.
//!
//! [`Activity`] is a plain value: the client compares it by value to skip
//! redundant updates and serializes it into `SET_ACTIVITY` commands.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Activity`] | Presence record |
//! | [`ActivityBuilder`] | Validating fluent builder |

// ============================================================================
// Submodules
// ============================================================================

/// Validating builder.
pub mod builder;

/// Presence data records.
pub mod model;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ActivityBuilder;
pub use model::{
    Activity, ActivityAssets, ActivityButton, ActivityParty, ActivitySecrets, ActivityTimestamps,
    ActivityType, StatusDisplayType,
};
