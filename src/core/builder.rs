use std::sync::Arc;

use super::lifecycle::Lifecycle;
use super::signals::{OsSignals, SignalSource};
use crate::{config::Config, error::ConfigError, events::Bus, policies::ShutdownPolicy};

/// Builder for constructing a [`Lifecycle`].
///
/// A policy is mandatory; everything else has a default:
/// - signal source → [`OsSignals`]
/// - bus → a new bus sized by [`Config::bus_capacity`]
pub struct LifecycleBuilder {
    cfg: Config,
    policy: Option<Arc<ShutdownPolicy>>,
    signals: Option<Arc<dyn SignalSource>>,
    bus: Option<Bus>,
}

impl LifecycleBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            policy: None,
            signals: None,
            bus: None,
        }
    }

    /// Sets the shutdown policy.
    pub fn with_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    /// Shares an existing policy instance.
    pub fn with_shared_policy(mut self, policy: Arc<ShutdownPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Replaces the OS signal source (e.g. with [`ManualSignals`](crate::ManualSignals)).
    pub fn with_signal_source(mut self, source: impl SignalSource) -> Self {
        self.signals = Some(Arc::new(source));
        self
    }

    /// Publishes to an existing bus, e.g. one shared with worker pools.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Validates the configuration and builds the lifecycle.
    ///
    /// Nothing is spawned and no signal handler is installed here.
    pub fn build(self) -> Result<Lifecycle, ConfigError> {
        if self.cfg.name.trim().is_empty() {
            return Err(ConfigError::InvalidName);
        }
        let policy = self.policy.ok_or(ConfigError::MissingPolicy)?;
        let signals = self.signals.unwrap_or_else(|| Arc::new(OsSignals));
        let bus = self
            .bus
            .unwrap_or_else(|| Bus::new(self.cfg.bus_capacity_clamped()));

        Ok(Lifecycle::new_internal(self.cfg, policy, signals, bus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_policy_is_rejected() {
        let err = LifecycleBuilder::new(Config::default()).build().unwrap_err();
        assert_eq!(err, ConfigError::MissingPolicy);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = LifecycleBuilder::new(Config::named(" "))
            .with_policy(ShutdownPolicy::default())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidName);
    }

    #[test]
    fn test_policy_is_shared() {
        let policy = Arc::new(ShutdownPolicy::no_signals());
        let lc = LifecycleBuilder::new(Config::default())
            .with_shared_policy(policy.clone())
            .build()
            .unwrap();
        assert_eq!(lc.policy(), &*policy);
    }
}
