//! wmap-hello
//!
//! A single "Hello Wmap!" endpoint: a pure path dispatcher (`dispatch`)
//! embedded in a small tokio/hyper HTTP/1.1 server.

pub mod config;
pub mod dispatch;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use dispatch::{dispatch, Outcome};
