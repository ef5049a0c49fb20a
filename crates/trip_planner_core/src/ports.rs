//! crates/trip_planner_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the planner's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the remote trip API, local storage and the user interface.

use async_trait::async_trait;
use crate::domain::{NewTrip, Notice, Trip, TripId};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote trip service.
#[async_trait]
pub trait TripService: Send + Sync {
    /// Creates a trip and returns the identifier the service assigned to it.
    async fn create_trip(&self, trip: &NewTrip) -> PortResult<TripId>;

    async fn get_trip_by_id(&self, trip_id: &TripId) -> PortResult<Trip>;
}

/// Durable single-slot storage for the current trip reference.
/// A new `save` overwrites any previous reference.
#[async_trait]
pub trait TripStorage: Send + Sync {
    async fn get(&self) -> PortResult<Option<TripId>>;

    async fn save(&self, trip_id: &TripId) -> PortResult<()>;
}

/// Blocking user notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Shows a notice and resolves once the user has dismissed it.
    async fn alert(&self, notice: &Notice);

    /// Asks a yes/no question. Anything but an explicit "yes" is `false`.
    async fn confirm(&self, notice: &Notice) -> bool;
}

#[async_trait]
pub trait Navigator: Send + Sync {
    /// Moves the user interface to the detail view of the given trip.
    async fn open_trip(&self, trip_id: &TripId);
}
