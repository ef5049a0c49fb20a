//! services/planner/src/adapters/trip_server.rs
//!
//! This module contains the adapter for the remote trip API. It implements the
//! `TripService` port from the `core` crate over HTTP/JSON using `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trip_planner_core::domain::{NewTrip, Trip, TripId};
use trip_planner_core::ports::{PortError, PortResult, TripService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TripService` port against the trip API.
#[derive(Clone)]
pub struct HttpTripServer {
    client: Client,
    base_url: String,
}

impl HttpTripServer {
    /// Creates a new `HttpTripServer` for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

//=========================================================================================
// Wire Structs
//=========================================================================================

#[derive(Serialize)]
struct CreateTripRequest<'a> {
    destination: &'a str,
    starts_at: &'a str,
    ends_at: &'a str,
    emails_to_invite: &'a [String],
}

#[derive(Deserialize)]
struct CreateTripResponse {
    #[serde(rename = "tripId")]
    trip_id: String,
}

#[derive(Deserialize)]
struct GetTripResponse {
    trip: TripRecord,
}

#[derive(Deserialize)]
struct TripRecord {
    id: String,
    destination: String,
    starts_at: String,
    ends_at: String,
    #[serde(default)]
    is_confirmed: bool,
}

impl TripRecord {
    fn to_domain(self) -> Trip {
        Trip {
            id: TripId::new(self.id),
            destination: self.destination,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            is_confirmed: self.is_confirmed,
        }
    }
}

fn unexpected(e: reqwest::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `TripService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TripService for HttpTripServer {
    async fn create_trip(&self, trip: &NewTrip) -> PortResult<TripId> {
        let request = CreateTripRequest {
            destination: &trip.destination,
            starts_at: &trip.starts_at,
            ends_at: &trip.ends_at,
            emails_to_invite: &trip.emails_to_invite,
        };

        let response = self
            .client
            .post(format!("{}/trips", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(unexpected)?
            .error_for_status()
            .map_err(unexpected)?
            .json::<CreateTripResponse>()
            .await
            .map_err(unexpected)?;

        Ok(TripId::new(response.trip_id))
    }

    async fn get_trip_by_id(&self, trip_id: &TripId) -> PortResult<Trip> {
        let response = self
            .client
            .get(format!("{}/trips/{}", self.base_url, trip_id))
            .send()
            .await
            .map_err(unexpected)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(format!("Trip {} not found", trip_id)));
        }

        let body = response
            .error_for_status()
            .map_err(unexpected)?
            .json::<GetTripResponse>()
            .await
            .map_err(unexpected)?;

        Ok(body.trip.to_domain())
    }
}
