//! The admission controller: allowlist, policy catalog, and decisions.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::trace;

use crate::config::AdmissionConfig;
use crate::error::Result;

use super::policy::{Policy, PolicyCatalog, RouteClass};
use super::store::{Admission, CounterStore, MemoryCounterStore};
use super::sweeper::Sweeper;

/// Decides ADMIT or REJECT for each inbound request.
///
/// One controller serves every route class; the router looks the policy up
/// by the matched route's class. The controller is thread-safe and is meant
/// to be shared behind an `Arc` across the whole request path.
pub struct AdmissionController {
    /// Counter state, behind the store seam
    store: Arc<dyn CounterStore>,
    /// Per-route-class policies, replaceable at runtime
    catalog: RwLock<PolicyCatalog>,
    /// Client keys exempt from every policy
    allowlist: HashSet<String>,
}

impl AdmissionController {
    /// Create a controller with the default catalog, the loopback allowlist,
    /// and an in-process counter store.
    pub fn new() -> Self {
        Self::with_store(
            Arc::new(MemoryCounterStore::new()),
            PolicyCatalog::default(),
            crate::config::default_allowlist(),
        )
    }

    /// Create a controller from a validated configuration.
    pub fn from_config(config: &AdmissionConfig) -> Result<Self> {
        Ok(Self::with_store(
            Arc::new(MemoryCounterStore::new()),
            config.catalog()?,
            config.allowlist.clone(),
        ))
    }

    /// Create a controller over an explicit counter store.
    ///
    /// This is the substitution point for a shared external store.
    pub fn with_store(
        store: Arc<dyn CounterStore>,
        catalog: PolicyCatalog,
        allowlist: HashSet<String>,
    ) -> Self {
        Self {
            store,
            catalog: RwLock::new(catalog),
            allowlist,
        }
    }

    /// Replace the policy catalog.
    pub fn set_catalog(&self, catalog: PolicyCatalog) {
        let mut current = self.catalog.write();
        *current = catalog;
    }

    /// Get a copy of the current policy catalog.
    pub fn catalog(&self) -> PolicyCatalog {
        self.catalog.read().clone()
    }

    /// Whether a client key bypasses every policy.
    pub fn is_allowlisted(&self, key: &str) -> bool {
        self.allowlist.contains(key)
    }

    /// Decide admission for `key` under the policy of a route class.
    pub async fn check_and_increment(&self, key: &str, class: RouteClass) -> Admission {
        let policy = self.catalog.read().get(class).clone();
        self.check(key, &policy).await
    }

    /// Decide admission for `key` under an ad-hoc policy.
    pub async fn check(&self, key: &str, policy: &Policy) -> Admission {
        self.check_at(key, policy, Instant::now()).await
    }

    /// Decide admission at an explicit timestamp.
    ///
    /// Allowlisted keys are admitted with their full quota and never create
    /// or touch a counter.
    pub async fn check_at(&self, key: &str, policy: &Policy, now: Instant) -> Admission {
        if self.allowlist.contains(key) {
            trace!(key, scope = %policy.scope, "Allowlisted key admitted");
            return Admission::granted(policy.max_requests);
        }
        self.store.check_and_increment(key, policy, now).await
    }

    /// Refund one previously charged request for `key` under `scope`.
    pub async fn decrement(&self, key: &str, scope: &str) {
        self.store.decrement(key, scope).await;
    }

    /// Administrative override: delete the counter for `key` under `scope`
    /// so the next request starts a fresh window.
    pub async fn reset(&self, key: &str, scope: &str) {
        self.store.reset(key, scope).await;
    }

    /// Start the periodic expiry sweep over this controller's store.
    ///
    /// The caller owns the returned handle; the sweep stops when the handle
    /// is shut down or dropped.
    pub fn start_sweeper(&self, interval: Duration) -> Sweeper {
        Sweeper::start(Arc::clone(&self.store), interval)
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller_with_visible_store() -> (AdmissionController, Arc<MemoryCounterStore>) {
        let store = Arc::new(MemoryCounterStore::new());
        let controller = AdmissionController::with_store(
            Arc::clone(&store) as Arc<dyn CounterStore>,
            PolicyCatalog::default(),
            crate::config::default_allowlist(),
        );
        (controller, store)
    }

    #[tokio::test]
    async fn test_catalog_policy_is_enforced() {
        let controller = AdmissionController::new();

        for _ in 0..5 {
            let admission = controller.check_and_increment("1.2.3.4", RouteClass::Auth).await;
            assert!(admission.admitted);
        }

        let admission = controller.check_and_increment("1.2.3.4", RouteClass::Auth).await;
        assert!(!admission.admitted);
    }

    #[tokio::test]
    async fn test_allowlisted_key_never_creates_a_counter() {
        let (controller, store) = controller_with_visible_store();

        for _ in 0..200 {
            let admission = controller
                .check_and_increment("127.0.0.1", RouteClass::Auth)
                .await;
            assert!(admission.admitted);
            assert_eq!(admission.remaining, 5);
        }

        assert_eq!(store.counter_count(), 0);
    }

    #[tokio::test]
    async fn test_ipv6_loopback_is_allowlisted_by_default() {
        let controller = AdmissionController::new();
        assert!(controller.is_allowlisted("::1"));
        assert!(!controller.is_allowlisted("1.2.3.4"));
    }

    #[tokio::test]
    async fn test_ad_hoc_policy() {
        let controller = AdmissionController::new();
        let export = Policy::new("export", Duration::from_secs(60), 2).unwrap();

        assert!(controller.check("1.2.3.4", &export).await.admitted);
        assert!(controller.check("1.2.3.4", &export).await.admitted);
        assert!(!controller.check("1.2.3.4", &export).await.admitted);
    }

    #[tokio::test]
    async fn test_set_catalog_applies_to_subsequent_checks() {
        let controller = AdmissionController::new();

        let mut catalog = PolicyCatalog::default();
        catalog.set(
            RouteClass::Search,
            Policy::new("search", Duration::from_secs(300), 1).unwrap(),
        );
        controller.set_catalog(catalog);

        assert!(controller
            .check_and_increment("1.2.3.4", RouteClass::Search)
            .await
            .admitted);
        assert!(!controller
            .check_and_increment("1.2.3.4", RouteClass::Search)
            .await
            .admitted);
    }

    #[tokio::test]
    async fn test_reset_clears_the_counter() {
        let (controller, store) = controller_with_visible_store();

        for _ in 0..3 {
            controller
                .check_and_increment("1.2.3.4", RouteClass::Contact)
                .await;
        }
        assert!(!controller
            .check_and_increment("1.2.3.4", RouteClass::Contact)
            .await
            .admitted);

        controller.reset("1.2.3.4", "contact").await;
        assert_eq!(store.current_count("1.2.3.4", "contact"), None);

        let admission = controller
            .check_and_increment("1.2.3.4", RouteClass::Contact)
            .await;
        assert!(admission.admitted);
        assert_eq!(admission.remaining, 2);
    }

    #[tokio::test]
    async fn test_decrement_refund() {
        let (controller, store) = controller_with_visible_store();

        controller
            .check_and_increment("1.2.3.4", RouteClass::Upload)
            .await;
        controller.decrement("1.2.3.4", "upload").await;

        assert_eq!(store.current_count("1.2.3.4", "upload"), Some(0));
    }
}
