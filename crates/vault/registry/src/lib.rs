//! Script Vault Registry - the versioned script registry state machine
//!
//! This crate provides:
//!
//! - **Registry**: scripts, append-only version histories, and access grants,
//!   with owner-only mutation rules enforced on every call
//! - **Journal**: hash-chained log of accepted operations, persisted as JSON
//!   Lines and replayed to rebuild state
//! - **SharedRegistry**: the registry and its journal behind one writer lock,
//!   for hosts that serve calls from several threads
//! - **VaultConfig**: input policy, journal location, and logging settings
//!
//! Callers arrive already authenticated; the registry only compares the
//! supplied [`Identity`](vault_types::Identity) against script owners and
//! grants.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod error;
pub mod journal;
pub mod operation;
pub mod policy;
pub mod shared;
pub mod state;
pub mod traits;

// Re-exports
pub use config::{JournalConfig, LoggingConfig, VaultConfig};
pub use error::{InputField, RegistryError, Result};
pub use journal::{Journal, JournalEntry, JournalError};
pub use operation::{Operation, Outcome};
pub use policy::InputPolicy;
pub use shared::SharedRegistry;
pub use state::Registry;
pub use traits::{ScriptReader, ScriptWriter};
