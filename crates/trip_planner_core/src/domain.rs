//! crates/trip_planner_core/src/domain.rs
//!
//! Defines the pure, core data structures for the trip planner.
//! These structs are independent of any transport or serialization format.

use chrono::NaiveDate;
use std::fmt;

/// The opaque identifier the remote trip service assigns to a trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripId(String);

impl TripId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A trip as it exists on the remote trip service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: TripId,
    pub destination: String,
    pub starts_at: String,
    pub ends_at: String,
    pub is_confirmed: bool,
}

/// The payload sent to the remote service to create a trip.
/// Timestamps are already normalized to UTC text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrip {
    pub destination: String,
    pub starts_at: String,
    pub ends_at: String,
    pub emails_to_invite: Vec<String>,
}

/// The in-progress trip data held by the form, captured at the moment the
/// user confirms submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripDraft {
    pub destination: String,
    pub starts_at: NaiveDate,
    pub ends_at: NaiveDate,
    pub emails_to_invite: Vec<String>,
}

// A blocking user-facing message: shown with a title, dismissed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn confirm_trip() -> Self {
        Self::new("New trip", "Do you want to confirm the trip?")
    }

    pub fn trip_created() -> Self {
        Self::new("New trip", "Your trip was created successfully!")
    }

    pub fn trip_creation_failed() -> Self {
        Self::new("Error", "The trip could not be created.")
    }

    pub fn trip_not_saved() -> Self {
        Self::new(
            "Error",
            "The trip was created but could not be saved on this device.",
        )
    }
}
