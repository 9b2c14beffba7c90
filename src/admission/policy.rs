//! Rate limit policies and the per-route-class catalog.

use std::time::Duration;

use crate::error::{AdmissionError, Result};

/// Route classes of the Kazwab API, each with its own default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Everything not covered by a more specific class.
    General,
    /// Login and token issuance.
    Auth,
    /// File upload to object storage.
    Upload,
    /// Contact-form intake.
    Contact,
    /// Newsletter subscription.
    Newsletter,
    /// Article and FAQ search.
    Search,
}

impl RouteClass {
    /// All route classes, in catalog order.
    pub const ALL: [RouteClass; 6] = [
        RouteClass::General,
        RouteClass::Auth,
        RouteClass::Upload,
        RouteClass::Contact,
        RouteClass::Newsletter,
        RouteClass::Search,
    ];

    /// The scope identifier counters are keyed on.
    pub fn scope(&self) -> &'static str {
        match self {
            RouteClass::General => "general",
            RouteClass::Auth => "auth",
            RouteClass::Upload => "upload",
            RouteClass::Contact => "contact",
            RouteClass::Newsletter => "newsletter",
            RouteClass::Search => "search",
        }
    }

    /// Parse a scope identifier back into a route class.
    pub fn from_scope(scope: &str) -> Option<Self> {
        match scope {
            "general" => Some(RouteClass::General),
            "auth" => Some(RouteClass::Auth),
            "upload" => Some(RouteClass::Upload),
            "contact" => Some(RouteClass::Contact),
            "newsletter" => Some(RouteClass::Newsletter),
            "search" => Some(RouteClass::Search),
            _ => None,
        }
    }
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scope())
    }
}

/// A (window duration, max requests) pair applied to a route class.
///
/// Immutable once constructed. Ad-hoc policies for routes outside the fixed
/// catalog go through the same constructor; the `scope` string is the
/// counter namespace, so callers own its uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Scope identifier counters are keyed on.
    pub scope: String,
    /// Length of one counting window.
    pub window: Duration,
    /// Requests admitted per window per client key.
    pub max_requests: u32,
}

impl Policy {
    /// Create a validated policy.
    ///
    /// A zero window or a zero request ceiling is invalid configuration and
    /// is rejected here, at setup time.
    pub fn new(scope: impl Into<String>, window: Duration, max_requests: u32) -> Result<Self> {
        let scope = scope.into();
        if scope.is_empty() {
            return Err(AdmissionError::Config(
                "policy scope must not be empty".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(AdmissionError::Config(format!(
                "policy '{}' must have a positive window",
                scope
            )));
        }
        if max_requests == 0 {
            return Err(AdmissionError::Config(format!(
                "policy '{}' must allow at least one request per window",
                scope
            )));
        }
        Ok(Self {
            scope,
            window,
            max_requests,
        })
    }
}

/// One policy per route class.
///
/// Lookup by [`RouteClass`] is infallible: the catalog always carries a
/// policy for every class, starting from the defaults below.
#[derive(Debug, Clone)]
pub struct PolicyCatalog {
    general: Policy,
    auth: Policy,
    upload: Policy,
    contact: Policy,
    newsletter: Policy,
    search: Policy,
}

impl Default for PolicyCatalog {
    fn default() -> Self {
        Self {
            general: Policy {
                scope: "general".to_string(),
                window: Duration::from_secs(15 * 60),
                max_requests: 100,
            },
            auth: Policy {
                scope: "auth".to_string(),
                window: Duration::from_secs(15 * 60),
                max_requests: 5,
            },
            upload: Policy {
                scope: "upload".to_string(),
                window: Duration::from_secs(60 * 60),
                max_requests: 10,
            },
            contact: Policy {
                scope: "contact".to_string(),
                window: Duration::from_secs(60 * 60),
                max_requests: 3,
            },
            newsletter: Policy {
                scope: "newsletter".to_string(),
                window: Duration::from_secs(60 * 60),
                max_requests: 5,
            },
            search: Policy {
                scope: "search".to_string(),
                window: Duration::from_secs(5 * 60),
                max_requests: 30,
            },
        }
    }
}

impl PolicyCatalog {
    /// Get the policy for a route class.
    pub fn get(&self, class: RouteClass) -> &Policy {
        match class {
            RouteClass::General => &self.general,
            RouteClass::Auth => &self.auth,
            RouteClass::Upload => &self.upload,
            RouteClass::Contact => &self.contact,
            RouteClass::Newsletter => &self.newsletter,
            RouteClass::Search => &self.search,
        }
    }

    /// Replace the policy for a route class.
    pub fn set(&mut self, class: RouteClass, policy: Policy) {
        let slot = match class {
            RouteClass::General => &mut self.general,
            RouteClass::Auth => &mut self.auth,
            RouteClass::Upload => &mut self.upload,
            RouteClass::Contact => &mut self.contact,
            RouteClass::Newsletter => &mut self.newsletter,
            RouteClass::Search => &mut self.search,
        };
        *slot = policy;
    }
}
