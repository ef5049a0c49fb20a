pub mod trip_server;
pub mod trip_store;

pub use trip_server::HttpTripServer;
pub use trip_store::SqliteTripStore;
