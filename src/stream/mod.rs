//! Stream pool interfaces and variant selection
//!
//! The capture pipeline maintains a pool of pre-encoded variants of the same
//! desktop source (different bitrate/resolution ladders). The session core
//! consumes them by handle: it never touches capture or encoding, it only
//! resolves selectors to handles and asks a handle for its instantaneous
//! bitrate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{AppError, Result};

/// Handle to one pre-encoded stream variant
///
/// Implementations live in the capture layer; the core only reads the stable
/// identifier and the current bitrate estimate.
pub trait MediaStream: Send + Sync + std::fmt::Debug {
    /// Stable identifier of this variant
    fn id(&self) -> &str;

    /// Instantaneous bitrate estimate in bits per second, 0 while unknown
    fn bitrate(&self) -> u64;
}

/// Request for a stream out of the video pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSelector {
    /// Plain lookup by identifier
    Id(String),
    /// Exactly the named variant
    Exact(String),
    /// The next variant above the named one
    Higher(String),
    /// The next variant below the named one
    Lower(String),
}

impl StreamSelector {
    /// The identifier the selector is anchored on
    pub fn id(&self) -> &str {
        match self {
            StreamSelector::Id(id)
            | StreamSelector::Exact(id)
            | StreamSelector::Higher(id)
            | StreamSelector::Lower(id) => id,
        }
    }
}

/// Video stream pool, as exposed by the capture pipeline
pub trait StreamSelectorManager: Send + Sync {
    /// Resolve a selector to a variant handle, `None` when it does not
    /// resolve (unknown id, or already at the top/bottom of the ladder)
    fn get_stream(&self, selector: &StreamSelector) -> Option<Arc<dyn MediaStream>>;
}

/// Audio sink pool; a single stream, no variants
pub trait StreamSinkManager: Send + Sync {
    fn get_stream(&self) -> Option<Arc<dyn MediaStream>>;
}

/// Resolver adapter over the external video pool
///
/// Turns the pool's `Option` answers into crate errors so callers and the
/// bitrate loop share one miss signal.
#[derive(Clone)]
pub struct VariantSelector {
    pool: Arc<dyn StreamSelectorManager>,
}

impl VariantSelector {
    pub fn new(pool: Arc<dyn StreamSelectorManager>) -> Self {
        Self { pool }
    }

    /// Resolve a selector or fail with [`AppError::StreamNotFound`]
    pub fn resolve(&self, selector: &StreamSelector) -> Result<Arc<dyn MediaStream>> {
        self.pool
            .get_stream(selector)
            .ok_or(AppError::StreamNotFound)
    }
}

struct VariantEntry {
    quality: u32,
    seq: u64,
    stream: Arc<dyn MediaStream>,
}

/// Ordered in-memory variant pool
///
/// Canonical [`StreamSelectorManager`] implementation the capture layer
/// registers its ladder into. Variants are ordered by nominal quality,
/// lowest first; equal qualities keep their registration order, so
/// resolution is deterministic across runs.
#[derive(Default)]
pub struct VariantPool {
    entries: RwLock<Vec<VariantEntry>>,
    next_seq: AtomicU64,
}

impl VariantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variant under the given nominal quality rank.
    /// Replaces any previous registration with the same id.
    pub fn register(&self, stream: Arc<dyn MediaStream>, quality: u32) {
        let mut entries = self.entries.write().unwrap();
        entries.retain(|e| e.stream.id() != stream.id());

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry = VariantEntry {
            quality,
            seq,
            stream,
        };
        let at = entries
            .partition_point(|e| (e.quality, e.seq) <= (entry.quality, entry.seq));
        entries.insert(at, entry);
    }

    /// Remove a variant from the pool
    pub fn unregister(&self, id: &str) {
        self.entries.write().unwrap().retain(|e| e.stream.id() != id);
    }

    /// Variant identifiers in ladder order, lowest quality first
    pub fn ids(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .map(|e| e.stream.id().to_string())
            .collect()
    }

    fn position(entries: &[VariantEntry], id: &str) -> Option<usize> {
        entries.iter().position(|e| e.stream.id() == id)
    }
}

impl StreamSelectorManager for VariantPool {
    fn get_stream(&self, selector: &StreamSelector) -> Option<Arc<dyn MediaStream>> {
        let entries = self.entries.read().unwrap();

        let found = match selector {
            StreamSelector::Id(id) | StreamSelector::Exact(id) => {
                Self::position(&entries, id)
            }
            StreamSelector::Higher(id) => {
                let at = Self::position(&entries, id)?;
                at.checked_add(1).filter(|&next| next < entries.len())
            }
            StreamSelector::Lower(id) => {
                let at = Self::position(&entries, id)?;
                at.checked_sub(1)
            }
        };

        found.map(|at| entries[at].stream.clone())
    }
}
