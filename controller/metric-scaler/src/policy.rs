//! Threshold-based replica decision

/// Direction of a scaling decision, used for logging and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDirection {
    Up,
    Down,
    Hold,
}

impl ScaleDirection {
    pub fn between(current: u32, desired: u32) -> Self {
        match desired.cmp(&current) {
            std::cmp::Ordering::Greater => ScaleDirection::Up,
            std::cmp::Ordering::Less => ScaleDirection::Down,
            std::cmp::Ordering::Equal => ScaleDirection::Hold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleDirection::Up => "scale_up",
            ScaleDirection::Down => "scale_down",
            ScaleDirection::Hold => "hold",
        }
    }
}

/// Compute the next replica count for a workload.
///
/// Inside the tolerance band (`|average - target| < threshold`) the current
/// count is kept. Outside it the count moves by exactly one replica towards
/// the target, and the result is always clamped to `[min_replicas, max_replicas]`.
pub fn desired_replicas(
    current_replicas: u32,
    average_usage_pct: f64,
    target_usage_pct: u32,
    scale_threshold_pct: u32,
    min_replicas: u32,
    max_replicas: u32,
) -> u32 {
    let deviation = average_usage_pct - f64::from(target_usage_pct);

    let next = if deviation.abs() < f64::from(scale_threshold_pct) {
        current_replicas
    } else if deviation > 0.0 {
        current_replicas.saturating_add(1)
    } else {
        current_replicas.saturating_sub(1)
    };

    next.clamp(min_replicas, max_replicas.max(min_replicas))
}
