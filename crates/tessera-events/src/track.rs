use std::fmt;

/// Role of one track pipeline in a multi-track source.
///
/// The declaration order is the assembly order and the source of the
/// numeric ids the player uses for its renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackRole {
    Video,
    Audio,
    Text,
}

impl TrackRole {
    /// All roles, in assembly order.
    pub const ALL: [TrackRole; 3] = [TrackRole::Video, TrackRole::Audio, TrackRole::Text];

    /// Renderer id used by the player.
    pub const fn id(self) -> usize {
        match self {
            Self::Video => 0,
            Self::Audio => 1,
            Self::Text => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for TrackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by a single track pipeline, tagged with its role.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackEvent {
    /// Pipeline registered with the shared load control.
    Registered { track: TrackRole, buffer_size: usize },
    /// Chunk request started.
    LoadStarted {
        track: TrackRole,
        chunk_index: usize,
        format_index: usize,
    },
    /// Chunk fully loaded into the track buffer.
    LoadCompleted {
        track: TrackRole,
        chunk_index: usize,
        bytes: u64,
    },
    /// The selected format differs from the previous chunk's.
    FormatChanged {
        track: TrackRole,
        from: Option<usize>,
        to: usize,
    },
    /// Chunk load failed.
    LoadError { track: TrackRole, error: String },
}

impl TrackEvent {
    pub fn track(&self) -> TrackRole {
        match self {
            Self::Registered { track, .. }
            | Self::LoadStarted { track, .. }
            | Self::LoadCompleted { track, .. }
            | Self::FormatChanged { track, .. }
            | Self::LoadError { track, .. } => *track,
        }
    }
}
