//! Orchestrator settings loaded from the environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::SearchWriterError;
use search_writer_orchestration::{BatchingConfig, OrchestratorConfig};

/// Default maximum number of works in one bulk request.
const DEFAULT_MAX_BULK_SIZE: usize = 250;

/// Default minimum bulk size below which works execute individually.
const DEFAULT_MIN_BULK_SIZE: usize = 1;

/// Default capacity of the submission queue.
const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default maximum number of works drained per execution cycle.
const DEFAULT_MAX_ITEMS_PER_BATCH: usize = 500;

/// Default fairness of full-queue submission ordering.
const DEFAULT_FAIR_QUEUEING: bool = true;

/// Tunable settings for the orchestration engine.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Largest number of works in one bulk request.
    pub max_bulk_size: usize,
    /// Bulks smaller than this execute their works individually.
    pub min_bulk_size: usize,
    /// Capacity of the batching orchestrator's submission queue.
    pub queue_capacity: usize,
    /// Largest number of works one execution cycle drains from the queue.
    pub max_items_per_batch: usize,
    /// Whether full-queue submissions wait in strict arrival order.
    pub fair: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_bulk_size: DEFAULT_MAX_BULK_SIZE,
            min_bulk_size: DEFAULT_MIN_BULK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_items_per_batch: DEFAULT_MAX_ITEMS_PER_BATCH,
            fair: DEFAULT_FAIR_QUEUEING,
        }
    }
}

impl OrchestratorSettings {
    /// Load settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MAX_BULK_SIZE`: largest bulk request (default: 250)
    /// - `MIN_BULK_SIZE`: smallest bulk worth sending (default: 1)
    /// - `QUEUE_CAPACITY`: submission queue capacity (default: 1000)
    /// - `MAX_ITEMS_PER_BATCH`: works drained per cycle (default: 500)
    /// - `FAIR_QUEUEING`: strict arrival order on a full queue (default: true)
    pub fn from_env() -> Result<Self, SearchWriterError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings from any variable source. Unset variables fall back
    /// to their defaults; set variables must parse.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SearchWriterError> {
        let settings = Self {
            max_bulk_size: parse_var(&lookup, "MAX_BULK_SIZE", DEFAULT_MAX_BULK_SIZE)?,
            min_bulk_size: parse_var(&lookup, "MIN_BULK_SIZE", DEFAULT_MIN_BULK_SIZE)?,
            queue_capacity: parse_var(&lookup, "QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?,
            max_items_per_batch: parse_var(
                &lookup,
                "MAX_ITEMS_PER_BATCH",
                DEFAULT_MAX_ITEMS_PER_BATCH,
            )?,
            fair: parse_var(&lookup, "FAIR_QUEUEING", DEFAULT_FAIR_QUEUEING)?,
        };

        if settings.min_bulk_size == 0 {
            return Err(SearchWriterError::config("MIN_BULK_SIZE must be at least 1"));
        }
        if settings.max_bulk_size < settings.min_bulk_size {
            return Err(SearchWriterError::config(format!(
                "MAX_BULK_SIZE ({}) must not be smaller than MIN_BULK_SIZE ({})",
                settings.max_bulk_size, settings.min_bulk_size
            )));
        }

        Ok(settings)
    }

    /// The batching orchestrator configuration these settings describe.
    pub fn to_batching_config(&self) -> BatchingConfig {
        BatchingConfig {
            queue_capacity: self.queue_capacity,
            max_items_per_batch: self.max_items_per_batch,
            fair: self.fair,
            max_bulk_size: self.max_bulk_size,
            min_bulk_size: self.min_bulk_size,
            ..BatchingConfig::default()
        }
    }

    /// The caller-thread orchestrator configuration these settings describe.
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_bulk_size: self.max_bulk_size,
            min_bulk_size: self.min_bulk_size,
            ..OrchestratorConfig::default()
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, SearchWriterError>
where
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw.parse().map_err(|e| {
            SearchWriterError::config(format!("invalid {name} value '{raw}': {e}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name| vars.get(name).map(|value| (*value).to_owned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = OrchestratorSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.max_bulk_size, 250);
        assert_eq!(settings.min_bulk_size, 1);
        assert_eq!(settings.queue_capacity, 1000);
        assert_eq!(settings.max_items_per_batch, 500);
        assert!(settings.fair);
    }

    #[test]
    fn set_variables_override_defaults() {
        let settings = OrchestratorSettings::from_lookup(lookup(&[
            ("MAX_BULK_SIZE", "100"),
            ("MIN_BULK_SIZE", "2"),
            ("QUEUE_CAPACITY", "50"),
            ("MAX_ITEMS_PER_BATCH", "200"),
            ("FAIR_QUEUEING", "false"),
        ]))
        .unwrap();
        assert_eq!(settings.max_bulk_size, 100);
        assert_eq!(settings.min_bulk_size, 2);
        assert_eq!(settings.queue_capacity, 50);
        assert_eq!(settings.max_items_per_batch, 200);
        assert!(!settings.fair);

        let config = settings.to_batching_config();
        assert_eq!(config.queue_capacity, 50);
        assert_eq!(config.max_bulk_size, 100);
        assert!(!config.fair);
    }

    #[test]
    fn unparseable_value_is_a_config_error() {
        let error = OrchestratorSettings::from_lookup(lookup(&[("MAX_BULK_SIZE", "lots")]))
            .unwrap_err();
        let SearchWriterError::ConfigError(message) = error else {
            panic!("expected a config error");
        };
        assert!(message.contains("MAX_BULK_SIZE"));
        assert!(message.contains("lots"));
    }

    #[test]
    fn bulk_size_bounds_are_validated() {
        let error = OrchestratorSettings::from_lookup(lookup(&[
            ("MAX_BULK_SIZE", "5"),
            ("MIN_BULK_SIZE", "10"),
        ]))
        .unwrap_err();
        assert!(error.to_string().contains("MAX_BULK_SIZE"));

        let error =
            OrchestratorSettings::from_lookup(lookup(&[("MIN_BULK_SIZE", "0")])).unwrap_err();
        assert!(error.to_string().contains("MIN_BULK_SIZE"));
    }
}
