use std::time::Duration;

/// Adaptive evaluation configuration.
#[derive(Clone, Debug)]
pub struct AbrOptions {
    /// Hysteresis ratio for down-switch.
    pub down_hysteresis_ratio: f64,
    /// Buffer level (seconds) that triggers down-switch.
    pub down_switch_buffer_secs: f64,
    /// Minimum buffer level (seconds) required for up-switch.
    pub min_buffer_for_up_switch_secs: f64,
    /// Safety factor for throughput estimation (e.g., 1.5 means use 66% of estimated throughput).
    pub throughput_safety_factor: f64,
    /// Hysteresis ratio for up-switch (bandwidth must exceed target by this factor).
    pub up_hysteresis_ratio: f64,
    /// Bitrate assumed for the first selection when the meter has no estimate yet.
    pub initial_bitrate_bps: u64,
}

impl Default for AbrOptions {
    fn default() -> Self {
        Self {
            down_hysteresis_ratio: 0.8,
            down_switch_buffer_secs: 5.0,
            min_buffer_for_up_switch_secs: 10.0,
            throughput_safety_factor: 1.5,
            up_hysteresis_ratio: 1.3,
            initial_bitrate_bps: 800_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ThroughputSampleSource {
    Network,
    Cache,
}

#[derive(Clone, Copy, Debug)]
pub struct ThroughputSample {
    pub bytes: u64,
    pub duration: Duration,
    pub source: ThroughputSampleSource,
}

impl ThroughputSample {
    pub fn network(bytes: u64, duration: Duration) -> Self {
        Self {
            bytes,
            duration,
            source: ThroughputSampleSource::Network,
        }
    }
}

/// A selectable bitrate variant of one track.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Format {
    /// Stable index of the variant within its stream.
    pub index: usize,
    /// Advertised bitrate in bits per second.
    pub bitrate_bps: u64,
}

impl Format {
    pub fn new(index: usize, bitrate_bps: u64) -> Self {
        Self { index, bitrate_bps }
    }
}
