//! Path dispatcher
//!
//! Normalizes a raw request-target and matches it against the static route
//! table. Everything here is pure: no I/O, no shared mutable state, so
//! concurrent calls need no coordination.

mod normalize;
mod table;

pub use normalize::{decode_path, normalize, strip_prefix, strip_query, NormalizedPath};
pub use table::{Action, Route, RouteTable, HELLO_BODY, HELLO_PATH};

use hyper::body::Bytes;
use hyper::StatusCode;

/// Body sent when no route matches
pub const NOT_FOUND_BODY: &str = "Error 404";

/// Status and body produced by a dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusCode,
    pub body: Bytes,
}

impl Outcome {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: Bytes::from_static(NOT_FOUND_BODY.as_bytes()),
        }
    }

    pub fn is_found(&self) -> bool {
        self.status != StatusCode::NOT_FOUND
    }
}

impl RouteTable {
    /// Match an already normalized path
    pub fn resolve(&self, method: &str, path: &str) -> Outcome {
        self.lookup(method, path)
            .map_or_else(Outcome::not_found, |route| Outcome {
                status: StatusCode::OK,
                body: (route.action)(),
            })
    }

    /// Normalize `raw_uri` and match it against this table
    pub fn dispatch(&self, method: &str, raw_uri: &str, deployment_prefix: &str) -> Outcome {
        let normalized = normalize(raw_uri, deployment_prefix);
        self.resolve(method, &normalized.path)
    }
}

/// Dispatch against the built-in route table
pub fn dispatch(method: &str, raw_uri: &str, deployment_prefix: &str) -> Outcome {
    RouteTable::builtin().dispatch(method, raw_uri, deployment_prefix)
}
