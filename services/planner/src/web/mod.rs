pub mod protocol;
pub mod rest;
pub mod session;
pub mod state;
pub mod ws_handler;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::health_handler;
pub use ws_handler::ws_handler;
