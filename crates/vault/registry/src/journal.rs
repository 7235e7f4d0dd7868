//! Append-only, hash-chained journal of accepted operations.
//!
//! The journal is the durable form of the registry: state is never written out
//! directly, it is rebuilt by replaying every entry through a fresh
//! [`Registry`]. On disk the journal is JSON Lines, one entry per line.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};
use vault_types::Identity;

use crate::error::RegistryError;
use crate::operation::Operation;
use crate::policy::InputPolicy;
use crate::state::Registry;

const ENTRY_HASH_DOMAIN: &[u8] = b"script-vault-journal-entry-v1:";

/// Errors raised while persisting, loading, or replaying a journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal serialization error: {0}")]
    Serialization(String),

    #[error("journal integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("journal replay failed at seq {seq}: {source}")]
    Replay {
        seq: u64,
        #[source]
        source: Box<RegistryError>,
    },

    #[error("journal file {0} holds a partial line from a failed append; appends are refused")]
    SinkUnusable(PathBuf),
}

/// One accepted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Dense sequence number starting at 1
    pub seq: u64,
    pub recorded_at: DateTime<Utc>,
    pub caller: Identity,
    pub operation: Operation,
    #[serde(with = "chain_hash::option")]
    pub prev_hash: Option<[u8; 32]>,
    #[serde(with = "chain_hash")]
    pub entry_hash: [u8; 32],
}

impl JournalEntry {
    /// Hash of this entry with `entry_hash` zeroed.
    pub fn compute_hash(&self) -> Result<[u8; 32], JournalError> {
        let mut canonical = self.clone();
        canonical.entry_hash = [0; 32];

        let encoded = serde_json::to_vec(&canonical)
            .map_err(|error| JournalError::Serialization(error.to_string()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(ENTRY_HASH_DOMAIN);
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }
}

/// Chain hashes as `0x`-prefixed hex, matching how content hashes are written.
mod chain_hash {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(hash)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(deserializer)?;
        decode(&text).map_err(de::Error::custom)
    }

    fn decode(text: &str) -> Result<[u8; 32], String> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(digits).map_err(|error| error.to_string())?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| format!("chain hash must be 32 bytes, got {}", len))
    }

    pub mod option {
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            hash: &Option<[u8; 32]>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match hash {
                Some(hash) => super::serialize(hash, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<[u8; 32]>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| super::decode(&text).map_err(de::Error::custom))
                .transpose()
        }
    }
}

/// Durable storage for journal lines.
///
/// A write either lands completely or is undone with `truncate`, so a failed
/// append never leaves bytes behind for a later append to carry along.
pub(crate) trait LineStorage: Send + Sync {
    /// Current size in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Write `bytes` at the end and make them durable.
    fn append_synced(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Cut the storage back to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LineStorage for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn append_synced(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.sync_data()
    }
}

/// Ordered journal, optionally mirrored to a file.
#[derive(Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    sink: Option<JournalFile>,
}

struct JournalFile {
    path: PathBuf,
    storage: Box<dyn LineStorage>,
    unusable: bool,
}

impl JournalFile {
    fn write_line(&mut self, line: &[u8]) -> Result<(), JournalError> {
        if self.unusable {
            return Err(JournalError::SinkUnusable(self.path.clone()));
        }

        let before = self.storage.size()?;
        if let Err(write_error) = self.storage.append_synced(line) {
            match self.storage.truncate(before) {
                Ok(()) => warn!(
                    path = %self.path.display(),
                    error = %write_error,
                    "Journal append failed; file rolled back"
                ),
                Err(rollback_error) => {
                    self.unusable = true;
                    error!(
                        path = %self.path.display(),
                        error = %write_error,
                        rollback_error = %rollback_error,
                        "Journal rollback failed; refusing further appends"
                    );
                }
            }
            return Err(write_error.into());
        }

        Ok(())
    }
}

impl Journal {
    /// Journal kept only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Build from already decoded entries, validating the chain.
    pub fn from_entries(entries: Vec<JournalEntry>) -> Result<Self, JournalError> {
        validate_entries(&entries)?;
        Ok(Self {
            entries,
            sink: None,
        })
    }

    /// Read and validate a journal file without opening it for append.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let entries = read_entries(path.as_ref())?;
        Self::from_entries(entries)
    }

    /// Open a journal file for append, creating it if absent.
    ///
    /// Existing entries are read and validated first; new entries are written
    /// and synced one line at a time.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let entries = if path.exists() {
            read_entries(path)?
        } else {
            Vec::new()
        };
        validate_entries(&entries)?;

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), entries = entries.len(), "Journal opened");

        Ok(Self::with_storage(entries, path, Box::new(file)))
    }

    pub(crate) fn with_storage(
        entries: Vec<JournalEntry>,
        path: &Path,
        storage: Box<dyn LineStorage>,
    ) -> Self {
        Self {
            entries,
            sink: Some(JournalFile {
                path: path.to_path_buf(),
                storage,
                unusable: false,
            }),
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head_hash(&self) -> Option<[u8; 32]> {
        self.entries.last().map(|entry| entry.entry_hash)
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|sink| sink.path.as_path())
    }

    /// Record an operation. The entry is written to the backing file before it
    /// becomes visible in memory; a failed write leaves both unchanged.
    pub fn append(
        &mut self,
        caller: &Identity,
        operation: Operation,
    ) -> Result<&JournalEntry, JournalError> {
        let mut entry = JournalEntry {
            seq: self.entries.len() as u64 + 1,
            recorded_at: Utc::now(),
            caller: caller.clone(),
            operation,
            prev_hash: self.head_hash(),
            entry_hash: [0; 32],
        };
        entry.entry_hash = entry.compute_hash()?;

        if let Some(sink) = self.sink.as_mut() {
            let mut line = serde_json::to_vec(&entry)
                .map_err(|error| JournalError::Serialization(error.to_string()))?;
            line.push(b'\n');
            sink.write_line(&line)?;
            debug!(path = %sink.path.display(), seq = entry.seq, "Journal entry persisted");
        }

        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Check sequence density, hash links, and entry hashes.
    pub fn validate(&self) -> Result<(), JournalError> {
        validate_entries(&self.entries)
    }

    /// Rebuild registry state from genesis.
    ///
    /// Entries were accepted under whatever bounds applied when they were
    /// recorded, so they are re-applied without input length limits; ownership
    /// and existence rules still hold, and the first failure is reported with
    /// its sequence number. `policy` is installed afterwards for new calls.
    pub fn replay(&self, policy: InputPolicy) -> Result<Registry, JournalError> {
        self.validate()?;

        let mut registry = Registry::with_policy(InputPolicy::unbounded());
        for entry in &self.entries {
            registry
                .execute(&entry.caller, &entry.operation)
                .map_err(|error| JournalError::Replay {
                    seq: entry.seq,
                    source: Box::new(error),
                })?;
        }
        registry.set_policy(policy);

        debug!(entries = self.entries.len(), "Journal replayed");
        Ok(registry)
    }
}

fn read_entries(path: &Path) -> Result<Vec<JournalEntry>, JournalError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: JournalEntry = serde_json::from_str(&line).map_err(|error| {
            JournalError::Serialization(format!("line {}: {}", index + 1, error))
        })?;
        entries.push(entry);
    }

    Ok(entries)
}

fn validate_entries(entries: &[JournalEntry]) -> Result<(), JournalError> {
    for (index, entry) in entries.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if entry.seq != expected_seq {
            return Err(JournalError::IntegrityViolation {
                seq: entry.seq,
                reason: format!("expected seq {}, found {}", expected_seq, entry.seq),
            });
        }

        let expected_prev = if index == 0 {
            None
        } else {
            Some(entries[index - 1].entry_hash)
        };
        if entry.prev_hash != expected_prev {
            return Err(JournalError::IntegrityViolation {
                seq: entry.seq,
                reason: "previous hash link mismatch".into(),
            });
        }

        if entry.compute_hash()? != entry.entry_hash {
            return Err(JournalError::IntegrityViolation {
                seq: entry.seq,
                reason: "entry hash mismatch".into(),
            });
        }
    }

    Ok(())
}
