//! Bandwidth estimation and adaptive format evaluation.
//!
//! [`BandwidthMeter`] is the shared bandwidth observer handed to every track
//! of an assembled source. [`AdaptiveEvaluator`] is the policy that picks a
//! bitrate variant from that observer's estimate; only adaptive tracks get one.
//!
//! ## Example
//!
//! ```rust
//! use std::{sync::Arc, time::Duration};
//!
//! use tessera_abr::{
//!     AdaptiveEvaluator, BandwidthMeter, DefaultBandwidthMeter, Format, FormatEvaluator,
//! };
//!
//! let meter: Arc<dyn BandwidthMeter> = Arc::new(DefaultBandwidthMeter::new());
//! let evaluator = AdaptiveEvaluator::new(meter);
//!
//! let formats = [Format::new(0, 350_000), Format::new(1, 1_500_000)];
//! let evaluation = evaluator
//!     .evaluate(&formats, None, Duration::ZERO)
//!     .expect("formats are not empty");
//! assert_eq!(evaluation.format_index, 0);
//! ```

#![forbid(unsafe_code)]

mod estimator;
mod evaluator;
mod types;

pub use estimator::{BandwidthMeter, DefaultBandwidthMeter, ThroughputEstimator};
pub use evaluator::{AdaptiveEvaluator, Evaluation, EvaluationReason, FormatEvaluator};
pub use types::{AbrOptions, Format, ThroughputSample, ThroughputSampleSource};
