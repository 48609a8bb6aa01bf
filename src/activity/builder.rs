//! Builder pattern for [`Activity`] values.
//!
//! All length and count constraints are checked in [`ActivityBuilder::build`],
//! so an invalid presence is rejected before it reaches a session.
//!
//! # Example
//!
//! ```
//! use rich_presence_ipc::Activity;
//!
//! # fn example() -> rich_presence_ipc::Result<()> {
//! let activity = Activity::builder()
//!     .details("Editing main.rs")
//!     .state("Workspace: rich-presence-ipc")
//!     .start_timestamp(1_700_000_000_000)
//!     .large_image("rust-logo")
//!     .button("Repository", "https://example.com/repo")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::ops::RangeInclusive;

use crate::error::{Error, Result};

use super::model::{
    Activity, ActivityAssets, ActivityButton, ActivityParty, ActivitySecrets,
    ActivityTimestamps, ActivityType, StatusDisplayType,
};

// ============================================================================
// Constants
// ============================================================================

/// Allowed length of names.
const NAME_LEN: RangeInclusive<usize> = 1..=128;

/// Allowed length of details, state, hover texts, party ids and secrets.
const TEXT_LEN: RangeInclusive<usize> = 2..=128;

/// Allowed length of URLs attached to text and images.
const URL_LEN: RangeInclusive<usize> = 1..=256;

/// Allowed length of image keys.
const IMAGE_LEN: RangeInclusive<usize> = 1..=300;

/// Allowed length of button labels.
const BUTTON_LABEL_LEN: RangeInclusive<usize> = 1..=32;

/// Allowed length of button URLs.
const BUTTON_URL_LEN: RangeInclusive<usize> = 1..=512;

/// Maximum number of buttons.
const MAX_BUTTONS: usize = 2;

// ============================================================================
// ActivityBuilder
// ============================================================================

/// Fluent builder for an [`Activity`].
///
/// Use [`Activity::builder()`] to create one.
#[derive(Debug, Default, Clone)]
pub struct ActivityBuilder {
    activity: Activity,
}

impl ActivityBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    #[inline]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.activity.name = Some(name.into());
        self
    }

    /// Sets the activity type.
    #[inline]
    #[must_use]
    pub fn kind(mut self, kind: ActivityType) -> Self {
        self.activity.kind = kind;
        self
    }

    /// Sets which field the status line shows.
    #[inline]
    #[must_use]
    pub fn status_display_type(mut self, display: StatusDisplayType) -> Self {
        self.activity.status_display_type = display;
        self
    }

    /// Sets the details line.
    #[inline]
    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.activity.details = Some(details.into());
        self
    }

    /// Sets the link of the details line.
    #[inline]
    #[must_use]
    pub fn details_url(mut self, url: impl Into<String>) -> Self {
        self.activity.details_url = Some(url.into());
        self
    }

    /// Sets the state line.
    #[inline]
    #[must_use]
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.activity.state = Some(state.into());
        self
    }

    /// Sets the link of the state line.
    #[inline]
    #[must_use]
    pub fn state_url(mut self, url: impl Into<String>) -> Self {
        self.activity.state_url = Some(url.into());
        self
    }

    /// Sets the start time (Unix milliseconds).
    #[inline]
    #[must_use]
    pub fn start_timestamp(mut self, millis: u64) -> Self {
        self.activity.timestamps.start = Some(millis);
        self
    }

    /// Sets the end time (Unix milliseconds).
    #[inline]
    #[must_use]
    pub fn end_timestamp(mut self, millis: u64) -> Self {
        self.activity.timestamps.end = Some(millis);
        self
    }

    /// Replaces all timestamps.
    #[inline]
    #[must_use]
    pub fn timestamps(mut self, timestamps: ActivityTimestamps) -> Self {
        self.activity.timestamps = timestamps;
        self
    }

    /// Sets the party id.
    #[inline]
    #[must_use]
    pub fn party_id(mut self, id: impl Into<String>) -> Self {
        self.activity.party.id = Some(id.into());
        self
    }

    /// Sets the current and maximum party size.
    #[inline]
    #[must_use]
    pub fn party_size(mut self, current: u32, max: u32) -> Self {
        self.activity.party.size = Some([current, max]);
        self
    }

    /// Replaces the party.
    #[inline]
    #[must_use]
    pub fn party(mut self, party: ActivityParty) -> Self {
        self.activity.party = party;
        self
    }

    /// Sets the large image key or URL.
    #[inline]
    #[must_use]
    pub fn large_image(mut self, image: impl Into<String>) -> Self {
        self.activity.assets.large_image = Some(image.into());
        self
    }

    /// Sets the large image hover text.
    #[inline]
    #[must_use]
    pub fn large_text(mut self, text: impl Into<String>) -> Self {
        self.activity.assets.large_text = Some(text.into());
        self
    }

    /// Sets the small image key or URL.
    #[inline]
    #[must_use]
    pub fn small_image(mut self, image: impl Into<String>) -> Self {
        self.activity.assets.small_image = Some(image.into());
        self
    }

    /// Sets the small image hover text.
    #[inline]
    #[must_use]
    pub fn small_text(mut self, text: impl Into<String>) -> Self {
        self.activity.assets.small_text = Some(text.into());
        self
    }

    /// Replaces all assets.
    #[inline]
    #[must_use]
    pub fn assets(mut self, assets: ActivityAssets) -> Self {
        self.activity.assets = assets;
        self
    }

    /// Replaces all secrets.
    #[inline]
    #[must_use]
    pub fn secrets(mut self, secrets: ActivitySecrets) -> Self {
        self.activity.secrets = secrets;
        self
    }

    /// Marks the activity as an instanced session.
    #[inline]
    #[must_use]
    pub fn instance(mut self, instance: bool) -> Self {
        self.activity.instance = Some(instance);
        self
    }

    /// Appends a link button.
    #[inline]
    #[must_use]
    pub fn button(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.activity.buttons.push(ActivityButton {
            label: label.into(),
            url: url.into(),
        });
        self
    }

    /// Validates and returns the activity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidActivity`] naming the first field that
    /// violates its constraint.
    pub fn build(self) -> Result<Activity> {
        validate(&self.activity)?;
        Ok(self.activity)
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Checks every constraint of `activity`.
pub(crate) fn validate(activity: &Activity) -> Result<()> {
    check("name", activity.name.as_deref(), NAME_LEN)?;
    check("details", activity.details.as_deref(), TEXT_LEN)?;
    check("details_url", activity.details_url.as_deref(), URL_LEN)?;
    check("state", activity.state.as_deref(), TEXT_LEN)?;
    check("state_url", activity.state_url.as_deref(), URL_LEN)?;
    check("party.id", activity.party.id.as_deref(), TEXT_LEN)?;

    let assets = &activity.assets;
    check("assets.large_image", assets.large_image.as_deref(), IMAGE_LEN)?;
    check("assets.large_text", assets.large_text.as_deref(), TEXT_LEN)?;
    check("assets.large_url", assets.large_url.as_deref(), URL_LEN)?;
    check("assets.small_image", assets.small_image.as_deref(), IMAGE_LEN)?;
    check("assets.small_text", assets.small_text.as_deref(), TEXT_LEN)?;
    check("assets.small_url", assets.small_url.as_deref(), URL_LEN)?;

    let secrets = &activity.secrets;
    check("secrets.join", secrets.join.as_deref(), TEXT_LEN)?;
    check("secrets.spectate", secrets.spectate.as_deref(), TEXT_LEN)?;
    check("secrets.match", secrets.match_secret.as_deref(), TEXT_LEN)?;

    if activity.buttons.len() > MAX_BUTTONS {
        return Err(Error::invalid_activity(format!(
            "at most {MAX_BUTTONS} buttons are allowed, got {}",
            activity.buttons.len()
        )));
    }
    for button in &activity.buttons {
        check("button.label", Some(button.label.as_str()), BUTTON_LABEL_LEN)?;
        check("button.url", Some(button.url.as_str()), BUTTON_URL_LEN)?;
    }

    Ok(())
}

/// Checks the character count of an optional field.
fn check(field: &str, value: Option<&str>, allowed: RangeInclusive<usize>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };

    let len = value.chars().count();
    if allowed.contains(&len) {
        Ok(())
    } else {
        Err(Error::invalid_activity(format!(
            "{field} must be between {} and {} characters, got {len}",
            allowed.start(),
            allowed.end()
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================
