//! Script Vault Types - Core types for the versioned script registry
//!
//! A script is an opaque, content-addressed artifact with an owner, human
//! readable metadata, and an append-only version history.
//!
//! ## Key Concepts
//!
//! - **ScriptId**: Dense, sequentially assigned identifier (first id is 1)
//! - **VersionNumber**: Position in a script's history (first version is 1)
//! - **Identity**: Opaque, externally authenticated caller reference
//! - **ContentHash**: 32-byte digest supplied by the caller, never computed here
//! - **Script / ScriptVersion**: The stored records
//! - **ScriptView / VersionView**: Read-only snapshots returned to callers

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod hash;
pub mod ids;
pub mod script;

// Re-export main types
pub use hash::{ContentHash, ContentHashError, CONTENT_HASH_LEN};
pub use ids::{Identity, ScriptId, VersionNumber};
pub use script::{Script, ScriptVersion, ScriptView, VersionView};
