//! Static route table
//!
//! Routes are fixed at compile time. Each route holds its action as a plain
//! function value, so a match calls straight into the handler.

use hyper::body::Bytes;

/// Path served by the hello route, relative to the deployment prefix
pub const HELLO_PATH: &str = "/index.php/hello/index";

/// Body returned by the hello route
pub const HELLO_BODY: &str = "Hello Wmap!";

/// Response-producing action of a route
pub type Action = fn() -> Bytes;

/// A `(method, exact path)` pair mapped to an action
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
    pub action: Action,
}

impl Route {
    /// Exact, case-sensitive comparison on both method and path
    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

fn hello_index() -> Bytes {
    Bytes::from_static(HELLO_BODY.as_bytes())
}

const BUILTIN_ROUTES: &[Route] = &[Route {
    method: "GET",
    path: HELLO_PATH,
    action: hello_index,
}];

/// Immutable route table
#[derive(Debug, Clone, Copy)]
pub struct RouteTable {
    routes: &'static [Route],
}

impl RouteTable {
    pub const fn new(routes: &'static [Route]) -> Self {
        Self { routes }
    }

    /// The table served by this application
    pub const fn builtin() -> Self {
        Self::new(BUILTIN_ROUTES)
    }

    pub const fn routes(&self) -> &'static [Route] {
        self.routes
    }

    /// First route matching `method` and `path`
    pub fn lookup(&self, method: &str, path: &str) -> Option<&'static Route> {
        self.routes.iter().find(|route| route.matches(method, path))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::builtin()
    }
}
