//! services/planner/src/lib.rs
//!
//! The planner service: adapters for the core ports, configuration, and the
//! WebSocket surface that drives the trip form.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
