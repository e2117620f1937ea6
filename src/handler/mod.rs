//! Request handler module
//!
//! Bridges hyper requests to the path dispatcher.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
