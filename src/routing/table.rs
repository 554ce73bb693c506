//! Route table module
//!
//! Maps (method, path template) to endpoints. Routes are tried in
//! declaration order and the first full match wins.

use hyper::Method;

use super::matcher::{toggle_trailing_slash, PathTemplate};
use crate::handler::Endpoint;

/// A registered route
pub struct Route {
    pub method: Method,
    pub template: PathTemplate,
    pub endpoint: Endpoint,
}

/// Outcome of looking a request up in the table
pub enum Lookup<'a> {
    Found {
        route: &'a Route,
        path_params: Vec<(String, String)>,
    },
    /// The path exists, but not for this method
    MethodNotAllowed(Vec<Method>),
    /// The path exists with its trailing slash toggled
    Redirect(String),
    NotFound,
}

#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: Method, template: &str, endpoint: Endpoint) -> &mut Self {
        self.routes.push(Route {
            method,
            template: PathTemplate::parse(template),
            endpoint,
        });
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the route for a request; `HEAD` is served by `GET` routes
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_> {
        let effective = if method == Method::HEAD {
            &Method::GET
        } else {
            method
        };

        let mut allowed = Vec::new();
        for route in &self.routes {
            let Some(path_params) = route.template.match_path(path) else {
                continue;
            };
            if route.method == *effective {
                return Lookup::Found { route, path_params };
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }

        if !allowed.is_empty() {
            if allowed.contains(&Method::GET) {
                allowed.push(Method::HEAD);
            }
            return Lookup::MethodNotAllowed(allowed);
        }

        if let Some(alternate) = toggle_trailing_slash(path) {
            if self
                .routes
                .iter()
                .any(|route| route.template.match_path(&alternate).is_some())
            {
                return Lookup::Redirect(alternate);
            }
        }

        Lookup::NotFound
    }
}
