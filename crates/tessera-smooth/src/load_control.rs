//! Shared buffer accounting for the track pipelines of one source.
//!
//! Memory is accounted in fixed-size segments. Every pipeline registers a byte
//! budget; chunks are admitted only while the pipeline stays within it, and the
//! segments return to the allocator when the [`Allocation`] is dropped.

use std::{
    fmt,
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{SmoothError, SmoothResult};

/// Segment-granular allocation counter.
#[derive(Debug)]
pub struct DefaultAllocator {
    segment_size: usize,
    allocated_segments: AtomicUsize,
}

impl DefaultAllocator {
    pub fn new(segment_size: usize) -> Self {
        Self {
            segment_size: segment_size.max(1),
            allocated_segments: AtomicUsize::new(0),
        }
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Number of segments needed to hold `bytes`.
    pub fn segments_for(&self, bytes: usize) -> usize {
        bytes.div_ceil(self.segment_size)
    }

    pub fn total_bytes_allocated(&self) -> usize {
        self.allocated_segments.load(Ordering::Acquire) * self.segment_size
    }

    fn acquire(&self, segments: usize) {
        self.allocated_segments.fetch_add(segments, Ordering::AcqRel);
    }

    fn release(&self, segments: usize) {
        self.allocated_segments.fetch_sub(segments, Ordering::AcqRel);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoaderId(usize);

#[derive(Debug)]
struct LoaderState {
    id: LoaderId,
    buffer_size: usize,
    allocated_segments: usize,
}

/// Load control shared by all pipelines of a source.
pub struct DefaultLoadControl {
    allocator: DefaultAllocator,
    loaders: Mutex<Vec<LoaderState>>,
    next_id: AtomicUsize,
}

impl fmt::Debug for DefaultLoadControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultLoadControl")
            .field("allocator", &self.allocator)
            .field("loaders", &self.loaders.lock().len())
            .finish()
    }
}

impl DefaultLoadControl {
    pub fn new(allocator: DefaultAllocator) -> Self {
        Self {
            allocator,
            loaders: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    pub fn allocator(&self) -> &DefaultAllocator {
        &self.allocator
    }

    /// Register a pipeline with a buffer budget in bytes.
    pub fn register(&self, buffer_size: usize) -> LoaderId {
        let id = LoaderId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.loaders.lock().push(LoaderState {
            id,
            buffer_size,
            allocated_segments: 0,
        });
        debug!(loader = id.0, buffer_size, "loader registered");
        id
    }

    pub fn unregister(&self, id: LoaderId) {
        self.loaders.lock().retain(|l| l.id != id);
        debug!(loader = id.0, "loader unregistered");
    }

    pub fn loader_count(&self) -> usize {
        self.loaders.lock().len()
    }

    /// Sum of all registered budgets.
    pub fn target_buffer_size(&self) -> usize {
        self.loaders.lock().iter().map(|l| l.buffer_size).sum()
    }

    /// Bytes currently held by loader `id`, in whole segments.
    pub fn buffered_bytes(&self, id: LoaderId) -> usize {
        self.loaders
            .lock()
            .iter()
            .find(|l| l.id == id)
            .map_or(0, |l| l.allocated_segments * self.allocator.segment_size())
    }

    /// Remaining budget of loader `id` in bytes.
    pub fn available(&self, id: LoaderId) -> usize {
        self.loaders
            .lock()
            .iter()
            .find(|l| l.id == id)
            .map_or(0, |l| {
                l.buffer_size
                    .saturating_sub(l.allocated_segments * self.allocator.segment_size())
            })
    }

    /// Account `data` against loader `id`'s budget.
    pub fn allocate(self: &Arc<Self>, id: LoaderId, data: Bytes) -> SmoothResult<Allocation> {
        let segments = self.allocator.segments_for(data.len()).max(1);
        let requested = segments * self.allocator.segment_size();

        let mut loaders = self.loaders.lock();
        let loader = loaders
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(SmoothError::UnknownLoader(id.0))?;

        let used = loader.allocated_segments * self.allocator.segment_size();
        let available = loader.buffer_size.saturating_sub(used);
        if requested > available {
            return Err(SmoothError::BufferFull {
                requested,
                available,
            });
        }

        loader.allocated_segments += segments;
        self.allocator.acquire(segments);
        trace!(loader = id.0, segments, used = used + requested, "allocated");

        Ok(Allocation {
            data,
            segments,
            loader: id,
            control: self.clone(),
        })
    }

    fn release(&self, id: LoaderId, segments: usize) {
        if let Some(loader) = self.loaders.lock().iter_mut().find(|l| l.id == id) {
            loader.allocated_segments = loader.allocated_segments.saturating_sub(segments);
        }
        self.allocator.release(segments);
    }
}

/// Chunk data admitted into a pipeline buffer. Releases its segments on drop.
pub struct Allocation {
    data: Bytes,
    segments: usize,
    loader: LoaderId,
    control: Arc<DefaultLoadControl>,
}

impl Allocation {
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn segments(&self) -> usize {
        self.segments
    }
}

impl Deref for Allocation {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("len", &self.data.len())
            .field("segments", &self.segments)
            .field("loader", &self.loader)
            .finish()
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.control.release(self.loader, self.segments);
    }
}
