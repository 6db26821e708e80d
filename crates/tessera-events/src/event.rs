use crate::TrackEvent;

/// Event published on the [`EventBus`](crate::EventBus).
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Event from one track pipeline.
    Track(TrackEvent),
}

impl From<TrackEvent> for Event {
    fn from(e: TrackEvent) -> Self {
        Self::Track(e)
    }
}

impl Event {
    /// Track role of the pipeline that produced this event.
    pub fn track(&self) -> crate::TrackRole {
        match self {
            Self::Track(e) => e.track(),
        }
    }
}
