// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Run configuration and YAML loading with strict validation.
//!
//! Configuration is resolved once, before the harness starts measuring.
//! Precedence per workload: harness defaults, then options given at
//! registration, then per-workload overrides from the config file.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::barrier::BarrierKind;
use crate::error::ConfigurationError;
use crate::types::WorkloadName;

const DEFAULT_TARGET: Duration = Duration::from_secs(1);
const DEFAULT_MAX_INVOCATION: Duration = Duration::from_secs(10);
const DEFAULT_PROBE_TIME: Duration = Duration::from_millis(10);
const DEFAULT_MIN_ITERATIONS: u64 = 1;
const DEFAULT_MAX_ITERATIONS: u64 = 1_000_000_000;

/// How many measured iterations to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    /// Exactly this many iterations.
    Fixed { iterations: u64 },
    /// Calibrate an iteration count whose total measured time approximates this.
    Target { duration: Duration },
}

impl Measurement {
    /// Fixed counts are exact and not bounded by `max_iterations`.
    fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Measurement::Fixed { iterations } if iterations == 0 => {
                Err(ConfigurationError::InvalidFieldValue {
                    field: "iterations",
                    value: "0".to_string(),
                    reason: "Fixed iteration count must be at least 1".to_string(),
                })
            }
            Measurement::Target { duration } if duration.is_zero() => {
                Err(ConfigurationError::InvalidFieldValue {
                    field: "target_ms",
                    value: "0".to_string(),
                    reason: "Target duration must be greater than 0".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Per-workload overrides. Unset fields fall back to the harness defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadOptions {
    pub min_warmup: Option<Duration>,
    pub measurement: Option<Measurement>,
    pub min_iterations: Option<u64>,
    pub clobber_memory: Option<bool>,
}

impl WorkloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum warm-up time.
    pub fn warmup(mut self, min_warmup: Duration) -> Self {
        self.min_warmup = Some(min_warmup);
        self
    }

    /// Fixed iteration count.
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.measurement = Some(Measurement::Fixed { iterations });
        self
    }

    /// Target measurement duration.
    pub fn target(mut self, duration: Duration) -> Self {
        self.measurement = Some(Measurement::Target { duration });
        self
    }

    pub fn min_iterations(mut self, min_iterations: u64) -> Self {
        self.min_iterations = Some(min_iterations);
        self
    }

    /// Whether to clobber memory after every invocation.
    pub fn clobber_memory(mut self, clobber: bool) -> Self {
        self.clobber_memory = Some(clobber);
        self
    }

    /// Fields set in `self` win, the rest come from `fallback`.
    fn or(&self, fallback: &WorkloadOptions) -> WorkloadOptions {
        WorkloadOptions {
            min_warmup: self.min_warmup.or(fallback.min_warmup),
            measurement: self.measurement.or(fallback.measurement),
            min_iterations: self.min_iterations.or(fallback.min_iterations),
            clobber_memory: self.clobber_memory.or(fallback.clobber_memory),
        }
    }

    pub(crate) fn validate(&self, max_iterations: u64) -> Result<(), ConfigurationError> {
        if let Some(measurement) = &self.measurement {
            measurement.validate()?;
        }
        if let Some(min) = self.min_iterations {
            validate_min_iterations(min, max_iterations)?;
        }
        Ok(())
    }
}

/// Run-wide harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Minimum warm-up time. `None` means a single warm-up invocation.
    pub min_warmup: Option<Duration>,
    pub measurement: Measurement,
    pub min_iterations: u64,
    /// Upper bound on calibrated iteration counts.
    pub max_iterations: u64,
    /// Sanity bound on a single invocation during warm-up and calibration.
    pub max_invocation: Duration,
    /// Budget for the calibration probe.
    pub probe_time: Duration,
    pub pin_core: Option<usize>,
    pub barrier: BarrierKind,
    /// Retain raw samples in the report.
    pub keep_samples: bool,
    /// Per-workload overrides from the config file.
    pub overrides: BTreeMap<WorkloadName, WorkloadOptions>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            min_warmup: None,
            measurement: Measurement::Target {
                duration: DEFAULT_TARGET,
            },
            min_iterations: DEFAULT_MIN_ITERATIONS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_invocation: DEFAULT_MAX_INVOCATION,
            probe_time: DEFAULT_PROBE_TIME,
            pin_core: None,
            barrier: BarrierKind::default(),
            keep_samples: false,
            overrides: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Check every field; called by the loader and before each run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_min_iterations(self.min_iterations, self.max_iterations)?;
        self.measurement.validate()?;

        if self.max_invocation.is_zero() {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "max_invocation_ms",
                value: "0".to_string(),
                reason: "Sanity bound must be greater than 0".to_string(),
            });
        }

        if self.probe_time.is_zero() {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "probe_ms",
                value: "0".to_string(),
                reason: "Calibration probe time must be greater than 0".to_string(),
            });
        }

        for options in self.overrides.values() {
            options.validate(self.max_iterations)?;
        }

        Ok(())
    }

    /// Merge defaults, registration options and file overrides for one workload.
    pub fn resolve(&self, name: &WorkloadName, registered: &WorkloadOptions) -> RunConfig {
        let options = match self.overrides.get(name) {
            Some(file) => file.or(registered),
            None => registered.clone(),
        };

        RunConfig {
            min_warmup: options.min_warmup.or(self.min_warmup),
            measurement: options.measurement.unwrap_or(self.measurement),
            min_iterations: options.min_iterations.unwrap_or(self.min_iterations),
            max_iterations: self.max_iterations,
            max_invocation: self.max_invocation,
            probe_time: self.probe_time,
            clobber_memory: options.clobber_memory.unwrap_or(true),
            keep_samples: self.keep_samples,
        }
    }
}

/// Fully resolved configuration for one workload. Immutable once the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub min_warmup: Option<Duration>,
    pub measurement: Measurement,
    pub min_iterations: u64,
    pub max_iterations: u64,
    pub max_invocation: Duration,
    pub probe_time: Duration,
    pub clobber_memory: bool,
    pub keep_samples: bool,
}

fn validate_min_iterations(min: u64, max: u64) -> Result<(), ConfigurationError> {
    if min == 0 {
        return Err(ConfigurationError::InvalidFieldValue {
            field: "min_iterations",
            value: "0".to_string(),
            reason: "Must be at least 1".to_string(),
        });
    }
    if min > max {
        return Err(ConfigurationError::InvalidFieldValue {
            field: "min_iterations",
            value: min.to_string(),
            reason: format!("Must not exceed max_iterations ({})", max),
        });
    }
    Ok(())
}

// =============================================================================
// YAML loading
// =============================================================================

/// Raw per-workload options as parsed from YAML.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOptions {
    warmup_ms: Option<u64>,
    iterations: Option<u64>,
    target_ms: Option<u64>,
    min_iterations: Option<u64>,
    clobber_memory: Option<bool>,
}

/// Raw harness defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefaults {
    #[serde(default)]
    warmup_ms: Option<u64>,
    #[serde(default)]
    iterations: Option<u64>,
    #[serde(default)]
    target_ms: Option<u64>,
    #[serde(default = "default_min_iterations")]
    min_iterations: u64,
    #[serde(default = "default_max_iterations")]
    max_iterations: u64,
    #[serde(default = "default_max_invocation_ms")]
    max_invocation_ms: u64,
    #[serde(default = "default_probe_ms")]
    probe_ms: u64,
    #[serde(default)]
    pin_core: Option<usize>,
    #[serde(default)]
    barrier: BarrierKind,
    #[serde(default)]
    keep_samples: bool,
}

fn default_min_iterations() -> u64 {
    DEFAULT_MIN_ITERATIONS
}

fn default_max_iterations() -> u64 {
    DEFAULT_MAX_ITERATIONS
}

fn default_max_invocation_ms() -> u64 {
    DEFAULT_MAX_INVOCATION.as_millis() as u64
}

fn default_probe_ms() -> u64 {
    DEFAULT_PROBE_TIME.as_millis() as u64
}

impl Default for RawDefaults {
    fn default() -> Self {
        Self {
            warmup_ms: None,
            iterations: None,
            target_ms: None,
            min_iterations: default_min_iterations(),
            max_iterations: default_max_iterations(),
            max_invocation_ms: default_max_invocation_ms(),
            probe_ms: default_probe_ms(),
            pin_core: None,
            barrier: BarrierKind::default(),
            keep_samples: false,
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    defaults: RawDefaults,
    #[serde(default)]
    workloads: HashMap<String, RawOptions>,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<HarnessConfig, ConfigurationError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigurationError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> Result<HarnessConfig, ConfigurationError> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigurationError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        let config = Self::convert(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn convert(raw: RawConfig) -> Result<HarnessConfig, ConfigurationError> {
        let defaults = raw.defaults;

        let measurement = measurement_from(defaults.iterations, defaults.target_ms)?
            .unwrap_or(Measurement::Target {
                duration: DEFAULT_TARGET,
            });

        let mut overrides = BTreeMap::new();
        for (name, options) in raw.workloads {
            let name = WorkloadName::new(name)?;
            let options = WorkloadOptions {
                min_warmup: options.warmup_ms.map(Duration::from_millis),
                measurement: measurement_from(options.iterations, options.target_ms)?,
                min_iterations: options.min_iterations,
                clobber_memory: options.clobber_memory,
            };
            overrides.insert(name, options);
        }

        Ok(HarnessConfig {
            min_warmup: defaults.warmup_ms.map(Duration::from_millis),
            measurement,
            min_iterations: defaults.min_iterations,
            max_iterations: defaults.max_iterations,
            max_invocation: Duration::from_millis(defaults.max_invocation_ms),
            probe_time: Duration::from_millis(defaults.probe_ms),
            pin_core: defaults.pin_core,
            barrier: defaults.barrier,
            keep_samples: defaults.keep_samples,
            overrides,
        })
    }
}

/// `iterations` and `target_ms` are mutually exclusive.
fn measurement_from(
    iterations: Option<u64>,
    target_ms: Option<u64>,
) -> Result<Option<Measurement>, ConfigurationError> {
    match (iterations, target_ms) {
        (Some(iterations), None) => Ok(Some(Measurement::Fixed { iterations })),
        (None, Some(ms)) => Ok(Some(Measurement::Target {
            duration: Duration::from_millis(ms),
        })),
        (None, None) => Ok(None),
        (Some(iterations), Some(ms)) => Err(ConfigurationError::InvalidFieldValue {
            field: "iterations",
            value: format!("{} (with target_ms {})", iterations, ms),
            reason: "iterations and target_ms are mutually exclusive".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
defaults:
  warmup_ms: 1000
  target_ms: 500
  min_iterations: 5
  max_invocation_ms: 2000
  pin_core: 2
  barrier: volatile

workloads:
  sum_stride16:
    iterations: 10
  vector_add:
    warmup_ms: 250
    clobber_memory: false
"#;

    fn name(s: &str) -> WorkloadName {
        WorkloadName::new(s).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        assert_eq!(config.min_warmup, Some(Duration::from_secs(1)));
        assert_eq!(
            config.measurement,
            Measurement::Target {
                duration: Duration::from_millis(500)
            }
        );
        assert_eq!(config.pin_core, Some(2));
        assert_eq!(config.barrier, BarrierKind::Volatile);
        assert_eq!(config.overrides.len(), 2);
    }

    #[test]
    fn test_defaults_applied() {
        let config = ConfigLoader::load_string("{}").unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn test_override_resolution() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();

        let stride = config.resolve(&name("sum_stride16"), &WorkloadOptions::new());
        assert_eq!(stride.measurement, Measurement::Fixed { iterations: 10 });
        assert_eq!(stride.min_warmup, Some(Duration::from_secs(1)));
        assert!(stride.clobber_memory);

        let vector = config.resolve(&name("vector_add"), &WorkloadOptions::new());
        assert_eq!(vector.min_warmup, Some(Duration::from_millis(250)));
        assert!(!vector.clobber_memory);
    }

    #[test]
    fn test_registration_options_beat_defaults() {
        let config = HarnessConfig::default();
        let registered = WorkloadOptions::new()
            .warmup(Duration::from_millis(3))
            .iterations(7);
        let resolved = config.resolve(&name("anything"), &registered);
        assert_eq!(resolved.min_warmup, Some(Duration::from_millis(3)));
        assert_eq!(resolved.measurement, Measurement::Fixed { iterations: 7 });
    }

    #[test]
    fn test_file_overrides_beat_registration() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        let registered = WorkloadOptions::new().iterations(99).min_iterations(3);
        let resolved = config.resolve(&name("sum_stride16"), &registered);
        assert_eq!(resolved.measurement, Measurement::Fixed { iterations: 10 });
        assert_eq!(resolved.min_iterations, 3);
    }

    #[test]
    fn test_iterations_and_target_exclusive() {
        let yaml = r#"
defaults:
  iterations: 10
  target_ms: 100
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let yaml = r#"
workloads:
  sum_sequential:
    iterations: 0
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_fixed_count_not_bounded_by_max() {
        let yaml = r#"
defaults:
  iterations: 2000000
  max_iterations: 1000
"#;
        let config = ConfigLoader::load_string(yaml).unwrap();
        assert_eq!(
            config.measurement,
            Measurement::Fixed {
                iterations: 2_000_000
            }
        );
        assert_eq!(config.max_iterations, 1000);
    }

    #[test]
    fn test_default_cap_allows_large_calibrations() {
        assert_eq!(HarnessConfig::default().max_iterations, 1_000_000_000);
    }

    #[test]
    fn test_min_above_max_rejected() {
        let yaml = r#"
defaults:
  min_iterations: 100
  max_iterations: 10
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_invalid_workload_name_rejected() {
        let yaml = r#"
workloads:
  "bad name":
    iterations: 3
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
defaults:
  warmup_seconds: 1
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::load_file("/nonexistent/cpuprobe.yaml");
        assert!(matches!(
            result,
            Err(ConfigurationError::ConfigNotFound { .. })
        ));
    }
}
