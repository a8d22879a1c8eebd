//! Runtime-mutable settings shared by every protected call.
//!
//! Holds the master resilience toggle and the fault injection parameters.
//! Each field lives in its own atomic: readers never observe a torn value and
//! never block, and a write is visible to every read that starts after it.
//! The fields are independent; a reader may see a new `failure_rate` paired
//! with an old `delay_ms` while an admin update is in progress.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_delay_ms, validate_failure_rate, ValidationError};

/// Point-in-time copy of every setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub enabled: bool,
    pub failure_rate: f64,
    pub delay_ms: u64,
}

/// The fault injection half of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultSettings {
    pub failure_rate: f64,
    pub delay_ms: u64,
}

/// Process-wide settings store.
#[derive(Debug)]
pub struct ConfigStore {
    enabled: AtomicBool,
    /// `f64::to_bits` of the failure rate.
    failure_rate: AtomicU64,
    delay_ms: AtomicU64,
}

impl ConfigStore {
    /// Create a store. The failure rate is validated like any admin update.
    pub fn new(enabled: bool, failure_rate: f64, delay_ms: u64) -> Result<Self, ValidationError> {
        let failure_rate = validate_failure_rate(failure_rate)?;
        Ok(Self {
            enabled: AtomicBool::new(enabled),
            failure_rate: AtomicU64::new(failure_rate.to_bits()),
            delay_ms: AtomicU64::new(delay_ms),
        })
    }

    /// Seed the store from the startup configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ValidationError> {
        Self::new(
            config.resilience.enabled,
            config.mock.failure_rate,
            config.mock.delay_ms,
        )
    }

    pub fn get(&self) -> ConfigSnapshot {
        let fault = self.fault_settings();
        ConfigSnapshot {
            enabled: self.is_enabled(),
            failure_rate: fault.failure_rate,
            delay_ms: fault.delay_ms,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn failure_rate(&self) -> f64 {
        f64::from_bits(self.failure_rate.load(Ordering::SeqCst))
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms.load(Ordering::SeqCst)
    }

    pub fn fault_settings(&self) -> FaultSettings {
        FaultSettings {
            failure_rate: self.failure_rate(),
            delay_ms: self.delay_ms(),
        }
    }

    /// Set the master toggle, returning the previous value.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst)
    }

    /// Set the failure probability. Out-of-range values leave the store
    /// untouched.
    pub fn set_failure_rate(&self, rate: f64) -> Result<(), ValidationError> {
        let rate = validate_failure_rate(rate)?;
        self.failure_rate.store(rate.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    /// Set the jitter bound. Negative values leave the store untouched.
    pub fn set_delay_ms(&self, delay_ms: i64) -> Result<(), ValidationError> {
        let delay_ms = validate_delay_ms(delay_ms)?;
        self.delay_ms.store(delay_ms, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        let defaults = AppConfig::default();
        Self {
            enabled: AtomicBool::new(defaults.resilience.enabled),
            failure_rate: AtomicU64::new(defaults.mock.failure_rate.to_bits()),
            delay_ms: AtomicU64::new(defaults.mock.delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_defaults_match_config() {
        let store = ConfigStore::default();
        let snapshot = store.get();
        assert!(snapshot.enabled);
        assert_eq!(snapshot.failure_rate, 0.1);
        assert_eq!(snapshot.delay_ms, 50);
    }

    #[test]
    fn test_set_enabled_returns_previous() {
        let store = ConfigStore::new(true, 0.0, 0).unwrap();
        assert!(store.set_enabled(false));
        assert!(!store.set_enabled(false));
        assert!(!store.is_enabled());
    }

    #[test]
    fn test_rejected_updates_leave_store_unchanged() {
        let store = ConfigStore::new(true, 0.25, 10).unwrap();

        assert!(store.set_failure_rate(1.5).is_err());
        assert!(store.set_failure_rate(-0.5).is_err());
        assert!(store.set_failure_rate(f64::NAN).is_err());
        assert!(store.set_delay_ms(-1).is_err());

        assert_eq!(store.fault_settings(), FaultSettings { failure_rate: 0.25, delay_ms: 10 });
    }

    #[test]
    fn test_new_rejects_bad_failure_rate() {
        assert!(ConfigStore::new(true, 1.01, 0).is_err());
    }

    #[test]
    fn test_fields_are_updated_independently() {
        // The two fault settings are not jointly atomic: a failure rate
        // update alone changes only that field.
        let store = ConfigStore::new(true, 0.1, 50).unwrap();
        store.set_failure_rate(0.9).unwrap();
        assert_eq!(store.fault_settings(), FaultSettings { failure_rate: 0.9, delay_ms: 50 });
        store.set_delay_ms(0).unwrap();
        assert_eq!(store.fault_settings(), FaultSettings { failure_rate: 0.9, delay_ms: 0 });
    }

    #[test]
    fn test_concurrent_writers_never_tear_values() {
        let store = Arc::new(ConfigStore::new(true, 0.0, 0).unwrap());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let rate = if i % 2 == 0 { 0.25 } else { 0.75 };
                    for _ in 0..1000 {
                        store.set_failure_rate(rate).unwrap();
                        store.set_enabled(i % 2 == 0);
                    }
                })
            })
            .collect();

        for _ in 0..1000 {
            let rate = store.failure_rate();
            assert!(rate == 0.0 || rate == 0.25 || rate == 0.75, "torn value {rate}");
        }
        for w in writers {
            w.join().unwrap();
        }
    }
}
