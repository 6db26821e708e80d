#![forbid(unsafe_code)]

//! Event bus shared between the player and the track pipelines.

mod bus;
mod event;
mod track;

pub use bus::EventBus;
pub use event::Event;
pub use track::{TrackEvent, TrackRole};
