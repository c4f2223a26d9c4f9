//! Request API
//!
//! Exposes chain inspection, mining and peer management to operators and
//! the CLI client commands.

pub mod server;

pub use server::{handle_request, send_request, ApiRequest, ApiResponse, ApiServer};
