//! Encoding records and the insertion-ordered encoding registry

use std::sync::Arc;

use indexmap::IndexMap;

use crate::capability::{FrameSource, RtpReceiver, SourceId};
use crate::error::{Result, SimulcastError};

/// One simulcast encoding: a source, its receiver and its depacketizer
///
/// Cheap to clone; the collaborator handles are reference counted.
#[derive(Clone)]
pub struct Encoding {
    /// Encoding id (original on a member track, remapped on the aggregate)
    pub id: String,
    /// Media source carrying this encoding
    pub source: SourceId,
    /// Receiver used for refresh requests
    pub receiver: Arc<dyn RtpReceiver>,
    /// Frame producer for this encoding
    pub depacketizer: Arc<dyn FrameSource>,
}

impl Encoding {
    /// Create a new encoding
    pub fn new(
        id: impl Into<String>,
        source: SourceId,
        receiver: Arc<dyn RtpReceiver>,
        depacketizer: Arc<dyn FrameSource>,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            receiver,
            depacketizer,
        }
    }

    /// Same collaborators under a different id
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }

    /// Ask this encoding's receiver for a refresh of its own source
    pub fn request_refresh(&self) {
        self.receiver.request_refresh(self.source);
    }
}

impl std::fmt::Debug for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoding")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Encodings of an aggregate, unique by id, in insertion order
#[derive(Debug, Default)]
pub struct EncodingRegistry {
    encodings: IndexMap<String, Encoding>,
}

impl EncodingRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an encoding under its own id
    pub fn insert(&mut self, encoding: Encoding) -> Result<()> {
        if self.encodings.contains_key(&encoding.id) {
            return Err(SimulcastError::DuplicateEncoding { id: encoding.id });
        }
        self.encodings.insert(encoding.id.clone(), encoding);
        Ok(())
    }

    /// Remove an encoding, keeping the order of the others
    pub fn remove(&mut self, id: &str) -> Option<Encoding> {
        self.encodings.shift_remove(id)
    }

    /// Look up an encoding by id
    pub fn get(&self, id: &str) -> Option<&Encoding> {
        self.encodings.get(id)
    }

    /// Check whether an id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.encodings.contains_key(id)
    }

    /// The first encoding still registered
    pub fn first(&self) -> Option<&Encoding> {
        self.encodings.first().map(|(_, encoding)| encoding)
    }

    /// Iterate encodings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Encoding> {
        self.encodings.values()
    }

    /// Registered ids in insertion order
    pub fn ids(&self) -> Vec<String> {
        self.encodings.keys().cloned().collect()
    }

    /// Remove and return every encoding
    pub fn drain(&mut self) -> Vec<Encoding> {
        self.encodings.drain(..).map(|(_, encoding)| encoding).collect()
    }

    /// Number of registered encodings
    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }
}
