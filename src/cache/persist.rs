//! Cache persistence: a stable JSON blob format and pluggable stores.
//!
//! The blob keeps value mappings as a list of pairs rather than a JSON map,
//! since discriminator values are arbitrary JSON-shaped data and most of them
//! are not valid object keys. Sorted entries make the output byte-stable so
//! a regenerated blob diffs cleanly against a committed one.

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{ComposedField, DiscriminatorCache, DiscriminatorMeta, UnknownPolicy};
use crate::descriptor::TypeRef;
use crate::error::PersistError;
use crate::tag::TagValue;

// -----------------------------------------------------------------------------
// Blob format

#[derive(Debug, Serialize, Deserialize)]
struct CacheBlob {
    entries: Vec<EntryBlob>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryBlob {
    base: TypeRef,
    #[serde(flatten)]
    meta: MetaBlob,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetaBlob {
    value_type: TypeRef,
    field_name: String,
    wire_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    policy: Option<UnknownPolicy>,
    values: Vec<(TagValue, TypeRef)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    composed: Vec<ComposedBlob>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ComposedBlob {
    field_name: String,
    wire_name: String,
    value_type: TypeRef,
}

impl DiscriminatorCache {
    /// Serializes the cache into its blob form.
    pub fn to_blob(&self) -> Result<Vec<u8>, PersistError> {
        let mut entries: Vec<EntryBlob> = self
            .iter()
            .map(|(base, meta)| EntryBlob {
                base: base.clone(),
                meta: MetaBlob::from_meta(meta),
            })
            .collect();
        entries.sort_by(|a, b| a.base.cmp(&b.base));

        let bytes = serde_json::to_vec_pretty(&CacheBlob { entries })?;
        Ok(bytes)
    }

    /// Rebuilds a cache from a blob previously produced by
    /// [`to_blob`](Self::to_blob).
    pub fn from_blob(bytes: &[u8]) -> Result<Self, PersistError> {
        let blob: CacheBlob = serde_json::from_slice(bytes)?;

        let mut entries = HashMap::with_capacity(blob.entries.len());
        for entry in blob.entries {
            entries.insert(entry.base, entry.meta.into_meta());
        }
        Ok(DiscriminatorCache::from_entries(entries))
    }

    /// Writes the cache through `store`.
    pub fn store(&self, store: &dyn BlobStore) -> Result<(), PersistError> {
        let bytes = self.to_blob()?;
        debug!("persisting discriminator cache ({} bytes)", bytes.len());
        store.write(&bytes)
    }

    /// Loads a cache through `store`.
    pub fn load(store: &dyn BlobStore) -> Result<Self, PersistError> {
        let bytes = store.read()?;
        Self::from_blob(&bytes)
    }
}

impl MetaBlob {
    fn from_meta(meta: &DiscriminatorMeta) -> Self {
        let mut values: Vec<(TagValue, TypeRef)> = meta
            .values()
            .map(|(value, target)| (value.clone(), target.clone()))
            .collect();
        values.sort();

        MetaBlob {
            value_type: meta.value_type().clone(),
            field_name: meta.field_name().to_owned(),
            wire_name: meta.wire_name().to_owned(),
            policy: meta.policy(),
            values,
            composed: meta
                .composed()
                .iter()
                .map(|field| ComposedBlob {
                    field_name: field.field_name().to_owned(),
                    wire_name: field.wire_name().to_owned(),
                    value_type: field.value_type().clone(),
                })
                .collect(),
        }
    }

    fn into_meta(self) -> DiscriminatorMeta {
        let mut meta = DiscriminatorMeta::new(
            self.value_type,
            self.field_name,
            self.wire_name,
            self.policy,
        );
        for (value, target) in self.values {
            meta.insert_value(value, target);
        }
        for field in self.composed {
            meta.push_composed(ComposedField::new(
                field.field_name,
                field.wire_name,
                field.value_type,
            ));
        }
        meta
    }
}

// -----------------------------------------------------------------------------
// BlobStore

/// Backing storage for a persisted cache blob.
pub trait BlobStore: Send + Sync {
    /// Reads the whole blob. [`PersistError::Unavailable`] means there is no
    /// blob to read, which callers typically answer by rebuilding.
    fn read(&self) -> Result<Vec<u8>, PersistError>;

    /// Replaces the stored blob.
    fn write(&self, bytes: &[u8]) -> Result<(), PersistError>;
}

/// A [`BlobStore`] backed by a single file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl BlobStore for FileStore {
    fn read(&self) -> Result<Vec<u8>, PersistError> {
        std::fs::read(&self.path).map_err(PersistError::Unavailable)
    }

    fn write(&self, bytes: &[u8]) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(PersistError::Write)?;
        }
        std::fs::write(&self.path, bytes).map_err(PersistError::Write)
    }
}

/// An in-memory [`BlobStore`], mainly for tests and tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn read(&self) -> Result<Vec<u8>, PersistError> {
        let guard = self
            .bytes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.clone().ok_or_else(|| {
            PersistError::Unavailable(io::Error::new(io::ErrorKind::NotFound, "no stored blob"))
        })
    }

    fn write(&self, bytes: &[u8]) -> Result<(), PersistError> {
        let mut guard = self
            .bytes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(bytes.to_vec());
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
