//! Best-effort thermal/CPU throttle detection, used once per clip by the
//! playback loop to decide whether to skip loudness processing.
//!
//! Any probe failure (file absent, parse error) is treated as "not
//! throttled" — this is a power-saving heuristic, never a correctness gate.

use std::fs;

/// Millidegrees Celsius above which the host is considered throttled.
const DEFAULT_THRESHOLD_MILLIDEGREES: i64 = 80_000;

pub fn should_reduce_cpu() -> bool {
    should_reduce_cpu_with_threshold(DEFAULT_THRESHOLD_MILLIDEGREES)
}

fn should_reduce_cpu_with_threshold(threshold: i64) -> bool {
    read_zone_temp("/sys/class/thermal/thermal_zone0/temp")
        .map(|temp| temp >= threshold)
        .unwrap_or(false)
}

fn read_zone_temp(path: &str) -> Option<i64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_thermal_zone_is_not_throttled() {
        assert!(read_zone_temp("/does/not/exist").is_none());
        assert!(!should_reduce_cpu_with_threshold(80_000));
    }
}
