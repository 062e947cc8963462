//! Per-workload scaling configuration read from workload annotations

use std::collections::HashMap;
use std::str::FromStr;

pub const CURRENT_METRIC_NAME: &str = "metric_scaler_current_metric_name";
pub const MAX_METRIC_NAME: &str = "metric_scaler_max_metric_name";
pub const MAX_REPLICAS: &str = "metric_scaler_max_replicas";
pub const MIN_REPLICAS: &str = "metric_scaler_min_replicas";
pub const TARGET_USAGE_PCT: &str = "metric_scaler_target_usage_pct";
pub const SCALE_THRESHOLD_PCT: &str = "metric_scaler_scale_threshold_pct";

/// All annotation keys a workload must carry to be scaled
pub const REQUIRED_KEYS: [&str; 6] = [
    CURRENT_METRIC_NAME,
    MAX_METRIC_NAME,
    MAX_REPLICAS,
    MIN_REPLICAS,
    TARGET_USAGE_PCT,
    SCALE_THRESHOLD_PCT,
];

/// Scaling parameters of one workload, rebuilt on every watcher cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub current_metric_name: String,
    pub max_metric_name: String,
    pub max_replicas: u32,
    pub min_replicas: u32,
    pub target_usage_pct: u32,
    pub scale_threshold_pct: u32,
}

/// Why a set of annotations does not form a complete config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incomplete {
    Missing(Vec<&'static str>),
    Invalid(Vec<&'static str>),
    InvertedBounds { min_replicas: u32, max_replicas: u32 },
    Unreadable(String),
}

impl std::fmt::Display for Incomplete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Incomplete::Missing(keys) => write!(f, "missing annotations: {}", keys.join(", ")),
            Incomplete::Invalid(keys) => write!(f, "unparsable annotations: {}", keys.join(", ")),
            Incomplete::InvertedBounds {
                min_replicas,
                max_replicas,
            } => write!(
                f,
                "min replicas {} exceeds max replicas {}",
                min_replicas, max_replicas
            ),
            Incomplete::Unreadable(e) => write!(f, "annotations unreadable: {}", e),
        }
    }
}

impl WatcherConfig {
    /// Build a config from workload annotations.
    ///
    /// Empty values count as missing. Numeric values are trimmed before parsing.
    pub fn from_annotations(annotations: &HashMap<String, String>) -> Result<Self, Incomplete> {
        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| {
                annotations
                    .get(*key)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .collect();
        if !missing.is_empty() {
            return Err(Incomplete::Missing(missing));
        }

        let mut invalid = Vec::new();
        let max_replicas = parse_number::<u32>(annotations, MAX_REPLICAS, &mut invalid);
        let min_replicas = parse_number::<u32>(annotations, MIN_REPLICAS, &mut invalid);
        let target_usage_pct = parse_number::<u32>(annotations, TARGET_USAGE_PCT, &mut invalid);
        let scale_threshold_pct =
            parse_number::<u32>(annotations, SCALE_THRESHOLD_PCT, &mut invalid);

        match (
            max_replicas,
            min_replicas,
            target_usage_pct,
            scale_threshold_pct,
        ) {
            (
                Some(max_replicas),
                Some(min_replicas),
                Some(target_usage_pct),
                Some(scale_threshold_pct),
            ) => {
                if min_replicas > max_replicas {
                    return Err(Incomplete::InvertedBounds {
                        min_replicas,
                        max_replicas,
                    });
                }
                Ok(Self {
                    current_metric_name: annotations[CURRENT_METRIC_NAME].trim().to_string(),
                    max_metric_name: annotations[MAX_METRIC_NAME].trim().to_string(),
                    max_replicas,
                    min_replicas,
                    target_usage_pct,
                    scale_threshold_pct,
                })
            }
            _ => Err(Incomplete::Invalid(invalid)),
        }
    }
}

fn parse_number<T: FromStr>(
    annotations: &HashMap<String, String>,
    key: &'static str,
    invalid: &mut Vec<&'static str>,
) -> Option<T> {
    let parsed = annotations.get(key).and_then(|v| v.trim().parse().ok());
    if parsed.is_none() {
        invalid.push(key);
    }
    parsed
}
