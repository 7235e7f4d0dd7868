//! Script records and the read views handed back to callers

use crate::hash::ContentHash;
use crate::ids::{Identity, ScriptId, VersionNumber};
use serde::{Deserialize, Serialize};

/// A registered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,

    /// Sole party allowed to update, share, or hand over the script
    pub owner: Identity,

    /// Set at registration and never changed
    pub title: String,

    pub description: String,

    /// Latest version; every version in `1..=current_version` exists
    pub current_version: VersionNumber,
}

impl Script {
    pub fn is_owner(&self, identity: &Identity) -> bool {
        &self.owner == identity
    }

    pub fn view(&self) -> ScriptView {
        ScriptView {
            owner: self.owner.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            current_version: self.current_version,
        }
    }
}

/// One immutable snapshot in a script's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptVersion {
    pub script_id: ScriptId,
    pub version: VersionNumber,
    pub content_hash: ContentHash,

    /// Empty for the initial version
    pub changelog: String,
}

impl ScriptVersion {
    pub fn view(&self) -> VersionView {
        VersionView {
            content_hash: self.content_hash,
            changelog: self.changelog.clone(),
        }
    }
}

/// Snapshot returned by `get-script`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptView {
    pub owner: Identity,
    pub title: String,
    pub description: String,
    pub current_version: VersionNumber,
}

/// Snapshot returned by `get-script-version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionView {
    pub content_hash: ContentHash,
    pub changelog: String,
}
