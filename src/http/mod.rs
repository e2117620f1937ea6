//! HTTP protocol layer module
//!
//! Turns dispatch outcomes into wire responses, independent of how the
//! outcome was produced.

pub mod response;

pub use response::{build_outcome_response, build_text_response};
