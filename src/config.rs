//! Per-instance machine configuration.

use serde::{Deserialize, Serialize};

/// What happens when a fired event has no applicable transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclinedPolicy {
    /// Notify extensions and `on_transition_declined` handlers.
    #[default]
    Notify,
    /// Drop the event without any notification.
    Silent,
}

/// Options for a machine instance.
///
/// # Example
///
/// ```rust
/// use switchyard::config::{DeclinedPolicy, MachineConfig};
///
/// let config = MachineConfig::from_json(r#"{ "name": "door", "declined_policy": "silent" }"#).unwrap();
/// assert_eq!(config.name.as_deref(), Some("door"));
/// assert_eq!(config.declined_policy, DeclinedPolicy::Silent);
/// assert!(config.contain_panics);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Name reported to extensions. Defaults to the machine id.
    pub name: Option<String>,

    pub declined_policy: DeclinedPolicy,

    /// Catch panics raised by actions, guards and listeners and treat them as
    /// failures. When false a panicking callback unwinds through `fire`.
    pub contain_panics: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: None,
            declined_policy: DeclinedPolicy::Notify,
            contain_panics: true,
        }
    }
}

impl MachineConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_declined_policy(mut self, policy: DeclinedPolicy) -> Self {
        self.declined_policy = policy;
        self
    }

    pub fn with_contain_panics(mut self, contain: bool) -> Self {
        self.contain_panics = contain;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_notify_and_contain() {
        let config = MachineConfig::default();
        assert!(config.name.is_none());
        assert_eq!(config.declined_policy, DeclinedPolicy::Notify);
        assert!(config.contain_panics);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(MachineConfig::from_json("{}").unwrap(), MachineConfig::default());
    }

    #[test]
    fn builder_methods_override() {
        let config = MachineConfig::named("turnstile")
            .with_declined_policy(DeclinedPolicy::Silent)
            .with_contain_panics(false);

        assert_eq!(config.name.as_deref(), Some("turnstile"));
        assert_eq!(config.declined_policy, DeclinedPolicy::Silent);
        assert!(!config.contain_panics);
    }

    #[test]
    fn config_serializes_correctly() {
        let config = MachineConfig::named("door");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"declined_policy\":\"notify\""));
        assert_eq!(MachineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(MachineConfig::from_json(r#"{ "declined_policy": "loud" }"#).is_err());
    }
}
