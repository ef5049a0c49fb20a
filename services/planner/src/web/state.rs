//! services/planner/src/web/state.rs
//!
//! Defines the application's shared state, created once at startup.

use crate::config::Config;
use std::sync::Arc;
use trip_planner_core::ports::{TripService, TripStorage};

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, passed to all handlers.
/// Each connection builds its own form and notifier on top of it.
#[derive(Clone)]
pub struct AppState {
    pub trips: Arc<dyn TripService>,
    pub storage: Arc<dyn TripStorage>,
    pub config: Arc<Config>,
}
