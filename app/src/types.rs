//! Domain types for the RSVP service.
//!
//! [`Event`] is the denormalized read model: the row from `events` with its
//! organizer profile and attendee ids joined in at read time. The attendance
//! relation in the backend is the source of truth; `attendees` is only ever
//! rebuilt from it or reconciled with an authoritative toggle result.

use chrono::NaiveDate;
use rsvp_core::backend::{EventRecord, ProfileRecord};
use serde::{Deserialize, Serialize};

pub use rsvp_core::{EventId, UserId};

// ============================================================================
// Users
// ============================================================================

/// A user as shown next to events and on the profile page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity; everything else is display metadata
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<ProfileRecord> for User {
    fn from(profile: ProfileRecord) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            avatar: profile.avatar,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// A fully denormalized event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Assigned by the backend on creation, never reassigned
    pub id: EventId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Calendar day
    pub date: NaiveDate,
    /// Start time, free-form as entered ("09:00 AM")
    pub time: String,
    /// Venue
    pub location: String,
    /// Cover image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Owning user
    pub organizer_id: UserId,
    /// Organizer profile, absent when it could not be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<User>,
    /// Ids of attending users, a set in insertion order
    pub attendees: Vec<UserId>,
    /// Advertised capacity, informational only
    pub capacity: u32,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Listed in the public feed
    pub is_public: bool,
}

impl Event {
    /// Join an `events` row with its attendee ids and organizer.
    #[must_use]
    pub fn from_record(record: EventRecord, attendees: Vec<UserId>, organizer: Option<User>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            date: record.date,
            time: record.time,
            location: record.location,
            image_url: record.image_url,
            organizer_id: record.organizer_id,
            organizer,
            attendees,
            capacity: record.capacity,
            tags: record.tags,
            is_public: record.is_public,
        }
    }

    /// Whether `user_id` has RSVP'd.
    #[must_use]
    pub fn is_attended_by(&self, user_id: UserId) -> bool {
        self.attendees.contains(&user_id)
    }

    /// Whether `user_id` owns this event.
    #[must_use]
    pub fn is_organized_by(&self, user_id: UserId) -> bool {
        self.organizer_id == user_id
    }

    /// Organizer display name, `"Unknown"` when the profile is missing.
    #[must_use]
    pub fn organizer_name(&self) -> &str {
        self.organizer.as_ref().map_or("Unknown", |user| user.name.as_str())
    }

    /// Remaining spots. Saturates at zero; RSVPs past capacity are still accepted.
    #[must_use]
    pub fn spots_left(&self) -> u32 {
        let taken = u32::try_from(self.attendees.len()).unwrap_or(u32::MAX);
        self.capacity.saturating_sub(taken)
    }
}

/// Input for creating an event.
///
/// `date` is optional so that a draft missing it can be rejected with a
/// field-level validation error instead of a deserialization failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    /// Title
    #[serde(default)]
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Calendar day
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Start time
    #[serde(default)]
    pub time: String,
    /// Venue
    #[serde(default)]
    pub location: String,
    /// Cover image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Owning user
    pub organizer_id: UserId,
    /// Advertised capacity, must be positive
    pub capacity: u32,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Listed in the public feed
    #[serde(default = "default_public")]
    pub is_public: bool,
}

const fn default_public() -> bool {
    true
}

// ============================================================================
// Filters
// ============================================================================

/// Inclusive date bounds; an open side is `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included
    pub start: Option<NaiveDate>,
    /// Last day included
    pub end: Option<NaiveDate>,
}

/// Criteria for narrowing an event list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilters {
    /// Case-insensitive substring of title or description
    pub search_term: Option<String>,
    /// Match events carrying any of these tags; empty means no tag filter
    #[serde(default)]
    pub tags: Vec<String>,
    /// Inclusive date window
    pub date_range: Option<DateRange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(organizer_id: UserId) -> EventRecord {
        EventRecord {
            id: EventId::new(),
            title: "Jazz Night".to_string(),
            description: "Live quartet".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 7, 4).unwrap_or_default(),
            time: "8:00 PM".to_string(),
            location: "Blue Note".to_string(),
            image_url: None,
            organizer_id,
            capacity: 2,
            tags: vec!["Music".to_string()],
            is_public: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn organizer_name_falls_back_to_unknown() {
        let event = Event::from_record(record(UserId::new()), vec![], None);
        assert_eq!(event.organizer_name(), "Unknown");
    }

    #[test]
    fn spots_left_saturates() {
        let event = Event::from_record(
            record(UserId::new()),
            vec![UserId::new(), UserId::new(), UserId::new()],
            None,
        );
        assert_eq!(event.spots_left(), 0);
    }

    #[test]
    fn membership_helpers() {
        let organizer = UserId::new();
        let guest = UserId::new();
        let event = Event::from_record(record(organizer), vec![guest], None);

        assert!(event.is_organized_by(organizer));
        assert!(!event.is_organized_by(guest));
        assert!(event.is_attended_by(guest));
        assert!(!event.is_attended_by(organizer));
    }

    #[test]
    fn event_serializes_camel_case() {
        let organizer = UserId::new();
        let event = Event::from_record(record(organizer), vec![], None);
        let json = serde_json::to_value(&event).unwrap_or_default();

        assert_eq!(json["organizerId"], organizer.to_string());
        assert_eq!(json["isPublic"], true);
        assert_eq!(json["date"], "2025-07-04");
        assert!(json.get("organizer").is_none());
    }

    #[test]
    fn draft_defaults_to_public() {
        let json = serde_json::json!({
            "title": "Book Club",
            "organizerId": UserId::new(),
            "capacity": 12
        });
        let draft: Result<EventDraft, _> = serde_json::from_value(json);
        let draft = draft.ok();

        assert!(draft.as_ref().is_some_and(|d| d.is_public));
        assert!(draft.is_some_and(|d| d.date.is_none()));
    }
}
