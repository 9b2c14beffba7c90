//! Configuration management for the admission layer.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::admission::{Policy, PolicyCatalog, RouteClass};
use crate::error::{AdmissionError, Result};

/// Main configuration for the admission layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Per-route-class overrides of the default policy catalog,
    /// keyed by scope identifier ("general", "auth", ...)
    #[serde(default)]
    pub policies: HashMap<String, PolicyRule>,

    /// Client keys exempt from every policy
    #[serde(default = "default_allowlist")]
    pub allowlist: HashSet<String>,

    /// Seconds between expiry sweeps of the counter table
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            policies: HashMap::new(),
            allowlist: default_allowlist(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// One policy override: window and request ceiling for a route class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Length of one counting window in seconds
    pub window_secs: u64,
    /// Requests admitted per window per client key
    pub max_requests: u32,
}

pub(crate) fn default_allowlist() -> HashSet<String> {
    ["127.0.0.1", "::1"].into_iter().map(String::from).collect()
}

fn default_sweep_interval() -> u64 {
    3600
}

impl AdmissionConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| AdmissionError::Config(e.to_string()))
    }

    /// Build the validated policy catalog: built-in defaults plus overrides.
    ///
    /// Fails on an unknown route class or an invalid window/ceiling; bad
    /// configuration surfaces here, before the controller exists.
    pub fn catalog(&self) -> Result<PolicyCatalog> {
        let mut catalog = PolicyCatalog::default();
        for (scope, rule) in &self.policies {
            let class = RouteClass::from_scope(scope).ok_or_else(|| {
                AdmissionError::Config(format!("unknown route class '{}'", scope))
            })?;
            let policy = Policy::new(
                class.scope(),
                Duration::from_secs(rule.window_secs),
                rule.max_requests,
            )?;
            catalog.set(class, policy);
        }
        Ok(catalog)
    }

    /// The sweep interval as a duration.
    pub fn sweep_interval(&self) -> Result<Duration> {
        if self.sweep_interval_secs == 0 {
            return Err(AdmissionError::Config(
                "sweep_interval_secs must be positive".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.sweep_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdmissionConfig::default();

        assert!(config.allowlist.contains("127.0.0.1"));
        assert!(config.allowlist.contains("::1"));
        assert_eq!(config.sweep_interval_secs, 3600);
        assert_eq!(config.sweep_interval().unwrap(), Duration::from_secs(3600));
        assert!(config.policies.is_empty());
    }

    #[test]
    fn test_parse_overrides() {
        let yaml = r#"
allowlist:
  - 127.0.0.1
  - 10.0.0.7
sweep_interval_secs: 600
policies:
  auth:
    window_secs: 600
    max_requests: 3
  search:
    window_secs: 60
    max_requests: 10
"#;
        let config = AdmissionConfig::from_yaml(yaml).unwrap();
        assert!(config.allowlist.contains("10.0.0.7"));
        assert_eq!(config.sweep_interval_secs, 600);

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.get(RouteClass::Auth).max_requests, 3);
        assert_eq!(
            catalog.get(RouteClass::Auth).window,
            Duration::from_secs(600)
        );
        assert_eq!(catalog.get(RouteClass::Search).max_requests, 10);
        // Classes without an override keep their defaults
        assert_eq!(catalog.get(RouteClass::Contact).max_requests, 3);
        assert_eq!(
            catalog.get(RouteClass::Contact).window,
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = AdmissionConfig::from_yaml("{}").unwrap();
        assert!(config.allowlist.contains("127.0.0.1"));
        assert_eq!(config.sweep_interval_secs, 3600);
    }

    #[test]
    fn test_zero_max_requests_is_rejected() {
        let yaml = r#"
policies:
  auth:
    window_secs: 600
    max_requests: 0
"#;
        let config = AdmissionConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.catalog(),
            Err(AdmissionError::Config(_))
        ));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let yaml = r#"
policies:
  upload:
    window_secs: 0
    max_requests: 10
"#;
        let config = AdmissionConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.catalog(),
            Err(AdmissionError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_route_class_is_rejected() {
        let yaml = r#"
policies:
  metrics:
    window_secs: 60
    max_requests: 10
"#;
        let config = AdmissionConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.catalog(),
            Err(AdmissionError::Config(_))
        ));
    }

    #[test]
    fn test_zero_sweep_interval_is_rejected() {
        let config = AdmissionConfig::from_yaml("sweep_interval_secs: 0").unwrap();
        assert!(matches!(
            config.sweep_interval(),
            Err(AdmissionError::Config(_))
        ));
    }
}
