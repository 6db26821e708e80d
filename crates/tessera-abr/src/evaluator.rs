use std::{fmt, sync::Arc, time::Duration};

use tracing::debug;

use super::{AbrOptions, BandwidthMeter, Format};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvaluationReason {
    Initial,
    UpSwitch,
    DownSwitch,
    NoEstimate,
    BufferTooLowForUpSwitch,
    AlreadyOptimal,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Evaluation {
    /// [`Format::index`] of the selected variant.
    pub format_index: usize,
    pub reason: EvaluationReason,
    pub changed: bool,
}

/// Policy selecting one of several bitrate variants for the next chunk.
pub trait FormatEvaluator: Send + Sync {
    /// Select a format for the next chunk.
    ///
    /// `current` is the [`Format::index`] used for the previous chunk, `buffered`
    /// the media duration already buffered ahead of the playhead.
    /// Returns `None` when `formats` is empty.
    fn evaluate(
        &self,
        formats: &[Format],
        current: Option<usize>,
        buffered: Duration,
    ) -> Option<Evaluation>;
}

/// Throughput-driven evaluator reading a shared [`BandwidthMeter`].
pub struct AdaptiveEvaluator {
    meter: Arc<dyn BandwidthMeter>,
    options: AbrOptions,
}

impl fmt::Debug for AdaptiveEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveEvaluator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AdaptiveEvaluator {
    pub fn new(meter: Arc<dyn BandwidthMeter>) -> Self {
        Self::with_options(meter, AbrOptions::default())
    }

    pub fn with_options(meter: Arc<dyn BandwidthMeter>, options: AbrOptions) -> Self {
        Self { meter, options }
    }

    pub fn options(&self) -> &AbrOptions {
        &self.options
    }

    fn adjusted(&self, bps: u64) -> f64 {
        (bps as f64 / self.options.throughput_safety_factor).max(0.0)
    }

    /// Highest bitrate not exceeding `budget_bps`, otherwise the lowest one.
    fn best_under(sorted: &[Format], budget_bps: f64) -> Format {
        sorted
            .iter()
            .rev()
            .find(|f| (f.bitrate_bps as f64) <= budget_bps)
            .or_else(|| sorted.first())
            .copied()
            .unwrap_or(Format::new(0, 0))
    }
}

impl FormatEvaluator for AdaptiveEvaluator {
    fn evaluate(
        &self,
        formats: &[Format],
        current: Option<usize>,
        buffered: Duration,
    ) -> Option<Evaluation> {
        if formats.is_empty() {
            return None;
        }

        let mut sorted = formats.to_vec();
        sorted.sort_by_key(|f| f.bitrate_bps);

        let estimate = self.meter.bitrate_estimate();
        let current = current.and_then(|idx| sorted.iter().find(|f| f.index == idx).copied());

        let Some(current) = current else {
            let budget = self.adjusted(estimate.unwrap_or(self.options.initial_bitrate_bps));
            let initial = Self::best_under(&sorted, budget);
            debug!(
                format = initial.index,
                bitrate = initial.bitrate_bps,
                ?estimate,
                "evaluate: initial selection"
            );
            return Some(Evaluation {
                format_index: initial.index,
                reason: EvaluationReason::Initial,
                changed: true,
            });
        };

        let Some(estimate_bps) = estimate else {
            return Some(Evaluation {
                format_index: current.index,
                reason: EvaluationReason::NoEstimate,
                changed: false,
            });
        };

        let adjusted_bps = self.adjusted(estimate_bps);
        let buffered_secs = buffered.as_secs_f64();
        let candidate = Self::best_under(&sorted, adjusted_bps);

        debug!(
            current = current.index,
            current_bw = current.bitrate_bps,
            candidate = candidate.index,
            candidate_bw = candidate.bitrate_bps,
            estimate_bps,
            adjusted_bps,
            buffered_secs,
            "evaluate: candidate selected"
        );

        if candidate.bitrate_bps > current.bitrate_bps {
            let buffer_ok = self.options.min_buffer_for_up_switch_secs <= 0.0
                || buffered_secs >= self.options.min_buffer_for_up_switch_secs;
            let headroom_ok =
                adjusted_bps >= (candidate.bitrate_bps as f64) * self.options.up_hysteresis_ratio;
            if buffer_ok && headroom_ok {
                return Some(Evaluation {
                    format_index: candidate.index,
                    reason: EvaluationReason::UpSwitch,
                    changed: true,
                });
            }
            return Some(Evaluation {
                format_index: current.index,
                reason: EvaluationReason::BufferTooLowForUpSwitch,
                changed: false,
            });
        }

        if candidate.bitrate_bps < current.bitrate_bps {
            let urgent_down = buffered_secs <= self.options.down_switch_buffer_secs;
            let margin_ok =
                adjusted_bps <= (current.bitrate_bps as f64) * self.options.down_hysteresis_ratio;
            if urgent_down || margin_ok {
                return Some(Evaluation {
                    format_index: candidate.index,
                    reason: EvaluationReason::DownSwitch,
                    changed: true,
                });
            }
        }

        Some(Evaluation {
            format_index: current.index,
            reason: EvaluationReason::AlreadyOptimal,
            changed: false,
        })
    }
}
