//! Presence data records.
//!
//! Plain serde records mirroring the peer's activity object. Absent
//! fields and empty nested records are omitted from the JSON.

// ============================================================================
// Imports
// ============================================================================

use serde::{Serialize, Serializer};

use super::builder::ActivityBuilder;

// ============================================================================
// Activity
// ============================================================================

/// A user's presence as shown by the peer.
///
/// Build one with [`Activity::builder`], which validates field lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Activity {
    /// Display name, defaults to the application name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Kind of activity.
    #[serde(rename = "type")]
    pub kind: ActivityType,

    /// Which field the status line shows.
    pub status_display_type: StatusDisplayType,

    /// Start and end times.
    #[serde(skip_serializing_if = "ActivityTimestamps::is_empty")]
    pub timestamps: ActivityTimestamps,

    /// What the user is currently doing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Link opened from the details line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,

    /// Current party status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Link opened from the state line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_url: Option<String>,

    /// Party information.
    #[serde(skip_serializing_if = "ActivityParty::is_empty")]
    pub party: ActivityParty,

    /// Images and their hover texts.
    #[serde(skip_serializing_if = "ActivityAssets::is_empty")]
    pub assets: ActivityAssets,

    /// Join/spectate secrets.
    #[serde(skip_serializing_if = "ActivitySecrets::is_empty")]
    pub secrets: ActivitySecrets,

    /// Whether this is an instanced game session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<bool>,

    /// Up to two link buttons.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ActivityButton>,
}

impl Activity {
    /// Creates a validating builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ActivityBuilder {
        ActivityBuilder::new()
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Kind of activity. Serialized as its integer value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActivityType {
    /// "Playing ..."
    #[default]
    Playing = 0,
    /// "Listening to ..."
    Listening = 2,
    /// "Watching ..."
    Watching = 3,
    /// "Competing in ..."
    Competing = 5,
}

impl Serialize for ActivityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Field shown in the user's status text. Serialized as its integer value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusDisplayType {
    /// Activity name.
    #[default]
    Name = 0,
    /// State line.
    State = 1,
    /// Details line.
    Details = 2,
}

impl Serialize for StatusDisplayType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

// ============================================================================
// Nested Records
// ============================================================================

/// Unix times in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityTimestamps {
    /// When the activity started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// When the activity ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl ActivityTimestamps {
    /// Returns `true` if no timestamp is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// The user's party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityParty {
    /// Party id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Current and maximum size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
}

impl ActivityParty {
    /// Returns `true` if nothing is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.size.is_none()
    }
}

/// Images and hover texts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityAssets {
    /// Large image key or URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    /// Large image hover text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    /// Link opened from the large image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_url: Option<String>,
    /// Small image key or URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    /// Small image hover text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
    /// Link opened from the small image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_url: Option<String>,
}

impl ActivityAssets {
    /// Returns `true` if nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.large_image.is_none()
            && self.large_text.is_none()
            && self.large_url.is_none()
            && self.small_image.is_none()
            && self.small_text.is_none()
            && self.small_url.is_none()
    }
}

/// Secrets for joining and spectating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivitySecrets {
    /// Join secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    /// Spectate secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectate: Option<String>,
    /// Instanced match secret.
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_secret: Option<String>,
}

impl ActivitySecrets {
    /// Returns `true` if nothing is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.join.is_none() && self.spectate.is_none() && self.match_secret.is_none()
    }
}

/// A link button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityButton {
    /// Button text.
    pub label: String,
    /// Link target.
    pub url: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_default_activity_json() {
        let json = serde_json::to_value(Activity::default()).unwrap();
        assert_eq!(json, json!({ "type": 0, "status_display_type": 0 }));
    }

    #[test]
    fn test_enum_values() {
        assert_eq!(serde_json::to_value(ActivityType::Competing).unwrap(), 5);
        assert_eq!(serde_json::to_value(StatusDisplayType::Details).unwrap(), 2);
    }

    #[test]
    fn test_nested_records_serialize_when_set() {
        let activity = Activity {
            timestamps: ActivityTimestamps {
                start: Some(1_700_000_000_000),
                end: None,
            },
            party: ActivityParty {
                id: None,
                size: Some([1, 4]),
            },
            secrets: ActivitySecrets {
                match_secret: Some("m1".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["timestamps"], json!({ "start": 1_700_000_000_000u64 }));
        assert_eq!(json["party"], json!({ "size": [1, 4] }));
        assert_eq!(json["secrets"], json!({ "match": "m1" }));
        assert!(json.get("assets").is_none());
    }

    #[test]
    fn test_equality_is_by_value() {
        let a = Activity {
            details: Some("Coding".into()),
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(a, b);
    }
}
