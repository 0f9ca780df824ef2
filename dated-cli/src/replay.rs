//! Deterministic replay of scripted cache timelines.
//!
//! A script is a JSON document listing operations against a cache driven by a
//! manual clock:
//!
//! ```json
//! {
//!   "config": { "ttl_seconds": 30, "sweep_interval_seconds": 10 },
//!   "steps": [
//!     { "op": "insert", "key": "a" },
//!     { "op": "at", "time": 5 },
//!     { "op": "get", "key": "a" }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use dated_cache::{ExpiringResourceCache, ManualClock};
use dated_core::{CacheConfig, CacheStats, Clock, Timestamp};

/// A replay script.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Cache configuration; the caller's configuration applies when absent
    #[serde(default)]
    pub config: Option<CacheConfig>,
    /// Clock reading before the first step
    #[serde(default)]
    pub start: Timestamp,
    /// Operations, in order
    pub steps: Vec<Step>,
}

impl Script {
    /// Parses a script from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid replay script")
    }

    /// Reads and parses a script file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

/// One scripted operation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Insert a fresh resource, labelled `R<n>` unless a label is given.
    Insert {
        key: String,
        #[serde(default)]
        label: Option<String>,
    },
    Get { key: String },
    Has { key: String },
    Remove { key: String },
    Clear,
    Purge,
    /// Move the clock forward.
    Advance { seconds: u64 },
    /// Set the clock to an absolute reading.
    At { time: Timestamp },
    SetExpiration { seconds: u64 },
    SetSweepInterval { seconds: u64 },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Insert { key, label: Some(label) } => write!(f, "insert({key:?}, {label})"),
            Step::Insert { key, label: None } => write!(f, "insert({key:?})"),
            Step::Get { key } => write!(f, "get({key:?})"),
            Step::Has { key } => write!(f, "has({key:?})"),
            Step::Remove { key } => write!(f, "remove({key:?})"),
            Step::Clear => write!(f, "clear()"),
            Step::Purge => write!(f, "purge_expired()"),
            Step::Advance { seconds } => write!(f, "advance({seconds}s)"),
            Step::At { time } => write!(f, "at(t={time})"),
            Step::SetExpiration { seconds } => write!(f, "set_expiration({seconds})"),
            Step::SetSweepInterval { seconds } => write!(f, "set_sweep_interval({seconds})"),
        }
    }
}

/// Something that happened during a replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// A step completed.
    Completed {
        time: Timestamp,
        step: String,
        outcome: String,
    },
    /// A step returned an error.
    Failed {
        time: Timestamp,
        step: String,
        error: String,
    },
    /// A resource left the cache. `time` is `None` at teardown.
    Disposed {
        time: Option<Timestamp>,
        key: String,
        resource: String,
    },
}

/// Everything a replay produced.
#[derive(Clone, Debug, Serialize)]
pub struct ReplayReport {
    pub config: CacheConfig,
    pub events: Vec<ReplayEvent>,
    pub stats: CacheStats,
}

impl ReplayReport {
    /// Disposal events, in the order they happened.
    pub fn disposals(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.events.iter().filter_map(|e| match e {
            ReplayEvent::Disposed { key, resource, .. } => Some((key.as_str(), resource.as_str())),
            _ => None,
        })
    }
}

type DisposalLog = Arc<Mutex<Vec<(String, String)>>>;

/// Runs `script` against a fresh cache configured with `config`.
pub fn run(script: &Script, config: CacheConfig) -> Result<ReplayReport> {
    let clock = ManualClock::new(script.start);
    let mut cache: ExpiringResourceCache<String> = ExpiringResourceCache::with_clock(config, Arc::new(clock.clone()))
        .context("invalid cache configuration")?;

    let log: DisposalLog = Arc::default();
    let sink = Arc::clone(&log);
    cache.set_purge_callback(move |key: String, resource: String| sink.lock().push((key, resource)));

    let mut events = Vec::new();
    let mut next_label = 0u32;

    for step in &script.steps {
        let time_before = clock.now();
        let outcome: dated_core::Result<String> = match step {
            Step::Insert { key, label } => {
                next_label += 1;
                let label = label.clone().unwrap_or_else(|| format!("R{next_label}"));
                cache.insert(key.as_str(), label.clone());
                Ok(format!("stored {label}"))
            }
            Step::Get { key } => cache.get(key).cloned(),
            Step::Has { key } => Ok(cache.has(key).to_string()),
            Step::Remove { key } => Ok(if cache.remove(key) { "removed" } else { "absent" }.to_string()),
            Step::Clear => Ok(format!("{} disposed", cache.clear())),
            Step::Purge => Ok(format!("{} evicted", cache.purge_expired())),
            Step::Advance { seconds } => Ok(format!("t={}", clock.advance(*seconds))),
            Step::At { time } => {
                clock.set(*time);
                Ok(format!("t={time}"))
            }
            Step::SetExpiration { seconds } => cache.set_expiration(*seconds).map(|()| "ok".to_string()),
            Step::SetSweepInterval { seconds } => {
                cache.set_sweep_interval(*seconds).map(|()| "ok".to_string())
            }
        };

        events.push(match outcome {
            Ok(outcome) => ReplayEvent::Completed {
                time: time_before,
                step: step.to_string(),
                outcome,
            },
            Err(err) => ReplayEvent::Failed {
                time: time_before,
                step: step.to_string(),
                error: err.to_string(),
            },
        });

        let time = Some(clock.now());
        events.extend(
            log.lock()
                .drain(..)
                .map(|(key, resource)| ReplayEvent::Disposed { time, key, resource }),
        );
    }

    let config = cache.config();
    let stats = cache.stats();
    drop(cache);

    let mut remaining = std::mem::take(&mut *log.lock());
    remaining.sort();
    events.extend(
        remaining
            .into_iter()
            .map(|(key, resource)| ReplayEvent::Disposed { time: None, key, resource }),
    );

    Ok(ReplayReport { config, events, stats })
}
