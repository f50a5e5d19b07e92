//! Simulation run configuration.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::DEFAULT_MAX_PENDING_EVENTS;
use crate::util::time::{Duration, Instant};

/// Environment variable holding the replication id.
pub const ENV_ID: &str = "EPISIM_ID";
/// Environment variable holding the start instant.
pub const ENV_START: &str = "EPISIM_START";
/// Environment variable holding the run length; unset means unbounded.
pub const ENV_DURATION: &str = "EPISIM_DURATION";
/// Environment variable holding the event list capacity.
pub const ENV_MAX_PENDING_EVENTS: &str = "EPISIM_MAX_PENDING_EVENTS";

fn default_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

const fn default_max_pending_events() -> usize {
    DEFAULT_MAX_PENDING_EVENTS
}

/// One replication: its id, start instant and length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Replication identifier.
    #[serde(default = "default_id")]
    pub id: String,
    /// Instant the clock starts at.
    #[serde(default)]
    pub start: Instant,
    /// Run length; `None` runs until no events remain.
    #[serde(default)]
    pub duration: Option<Duration>,
    /// Maximum number of distinct pending instants.
    #[serde(default = "default_max_pending_events")]
    pub max_pending_events: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            id: default_id(),
            start: Instant::ZERO,
            duration: None,
            max_pending_events: DEFAULT_MAX_PENDING_EVENTS,
        }
    }
}

impl SimulationConfig {
    /// Configuration with a fresh id, starting at `start` and lasting `duration`.
    pub fn new(start: Instant, duration: Option<Duration>) -> Self {
        Self {
            start,
            duration,
            ..Self::default()
        }
    }

    /// Set the replication id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the event list capacity.
    #[must_use]
    pub const fn with_max_pending_events(mut self, max: usize) -> Self {
        self.max_pending_events = max;
        self
    }

    /// Instant the run ends at, if bounded.
    pub fn end(&self) -> Option<Instant> {
        self.duration.map(|d| self.start + d)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".into());
        }
        if !self.start.units().is_finite() {
            return Err(format!("start must be finite, got {}", self.start));
        }
        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration.is_negative() {
                return Err(format!("duration must be finite and >= 0, got {duration}"));
            }
        }
        if self.max_pending_events == 0 {
            return Err("max_pending_events must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read configuration from the environment (after loading `.env`, if any)
    /// and validate. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(format!(".env error: {e}"));
            }
        }
        let mut cfg = Self::default();
        if let Ok(id) = env::var(ENV_ID) {
            cfg.id = id;
        }
        if let Some(start) = parse_var::<f64>(ENV_START)? {
            cfg.start = Instant::of(start);
        }
        if let Some(duration) = parse_var::<f64>(ENV_DURATION)? {
            cfg.duration = Some(Duration::of(duration));
        }
        if let Some(max) = parse_var::<usize>(ENV_MAX_PENDING_EVENTS)? {
            cfg.max_pending_events = max;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{name}={raw}: {e}")),
        Err(_) => Ok(None),
    }
}
