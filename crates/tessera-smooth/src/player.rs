use std::sync::Arc;

use tessera_abr::BandwidthMeter;
use tessera_events::EventBus;

use crate::{BuildError, context::CallbackContext, sample_source::MultiSampleSource};

/// Host player receiving the result of a source build.
///
/// `on_source_ready` and `on_build_error` are called on the player's
/// [`CallbackLoop`](crate::CallbackLoop), at most once per build and never both.
pub trait Player: Send + Sync + 'static {
    /// Context the build outcome is posted to.
    fn callback_context(&self) -> CallbackContext;

    /// Bandwidth meter shared by every track pipeline of a build.
    fn bandwidth_meter(&self) -> Arc<dyn BandwidthMeter>;

    /// Bus receiving track pipeline events.
    fn track_events(&self) -> EventBus;

    fn on_source_ready(&self, source: MultiSampleSource);

    fn on_build_error(&self, error: BuildError);
}
