use switchyard_http::protocol::Method;
use thiserror::Error;

/// A route that can't be registered. Reported by [`RouterBuilder::build`](super::RouterBuilder::build).
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid parameter name {name:?} in route template {template:?}")]
    InvalidParameter { template: String, name: String },

    #[error("parameter {name:?} appears twice in route template {template:?}")]
    DuplicateParameter { template: String, name: String },

    #[error("catch-all must end route template {template:?}")]
    MisplacedCatchAll { template: String },

    #[error("route {method} {template} is registered twice")]
    DuplicateRoute { method: Method, template: String },

    #[error("can't compile route template {template:?}: {source}")]
    Regex {
        template: String,
        #[source]
        source: regex::Error,
    },
}

impl RouteError {
    pub fn invalid_template<S: ToString>(template: &str, reason: S) -> Self {
        Self::InvalidTemplate { template: template.to_string(), reason: reason.to_string() }
    }

    pub fn invalid_parameter(template: &str, name: &str) -> Self {
        Self::InvalidParameter { template: template.to_string(), name: name.to_string() }
    }

    pub fn duplicate_parameter(template: &str, name: &str) -> Self {
        Self::DuplicateParameter { template: template.to_string(), name: name.to_string() }
    }

    pub fn misplaced_catch_all(template: &str) -> Self {
        Self::MisplacedCatchAll { template: template.to_string() }
    }

    pub fn duplicate_route(method: Method, template: &str) -> Self {
        Self::DuplicateRoute { method, template: template.to_string() }
    }
}
