//! Authentication for the platform's web API.
//!
//! Provides the session credentials attached to every request.

mod session;

pub use session::Session;
