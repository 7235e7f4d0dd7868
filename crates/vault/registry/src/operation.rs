//! Mutations expressed as values.
//!
//! Every write the registry accepts is one [`Operation`]. The journal records
//! them and replay feeds them back through the same state machine.

use serde::{Deserialize, Serialize};
use vault_types::{ContentHash, Identity, ScriptId, VersionNumber};

use crate::error::{RegistryError, Result};

/// A mutating call on the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    RegisterScript {
        title: String,
        content_hash: ContentHash,
        description: String,
    },

    UpdateScript {
        script_id: ScriptId,
        content_hash: ContentHash,
        changelog: String,
    },

    GrantAccess {
        script_id: ScriptId,
        grantee: Identity,
    },

    RevokeAccess {
        script_id: ScriptId,
        grantee: Identity,
    },

    TransferOwnership {
        script_id: ScriptId,
        new_owner: Identity,
    },
}

impl Operation {
    pub fn register_script(title: &str, content_hash: ContentHash, description: &str) -> Self {
        Operation::RegisterScript {
            title: title.to_string(),
            content_hash,
            description: description.to_string(),
        }
    }

    pub fn update_script(script_id: ScriptId, content_hash: ContentHash, changelog: &str) -> Self {
        Operation::UpdateScript {
            script_id,
            content_hash,
            changelog: changelog.to_string(),
        }
    }

    pub fn grant_access(script_id: ScriptId, grantee: &Identity) -> Self {
        Operation::GrantAccess {
            script_id,
            grantee: grantee.clone(),
        }
    }

    pub fn revoke_access(script_id: ScriptId, grantee: &Identity) -> Self {
        Operation::RevokeAccess {
            script_id,
            grantee: grantee.clone(),
        }
    }

    pub fn transfer_ownership(script_id: ScriptId, new_owner: &Identity) -> Self {
        Operation::TransferOwnership {
            script_id,
            new_owner: new_owner.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::RegisterScript { .. } => "register-script",
            Operation::UpdateScript { .. } => "update-script",
            Operation::GrantAccess { .. } => "grant-access",
            Operation::RevokeAccess { .. } => "revoke-access",
            Operation::TransferOwnership { .. } => "transfer-ownership",
        }
    }

    /// Target script, `None` for registration.
    pub fn script_id(&self) -> Option<ScriptId> {
        match self {
            Operation::RegisterScript { .. } => None,
            Operation::UpdateScript { script_id, .. }
            | Operation::GrantAccess { script_id, .. }
            | Operation::RevokeAccess { script_id, .. }
            | Operation::TransferOwnership { script_id, .. } => Some(*script_id),
        }
    }
}

/// Result of a successful operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Registered(ScriptId),
    Updated(VersionNumber),
    AccessGranted,
    AccessRevoked,
    OwnershipTransferred,
}

impl Outcome {
    /// Id assigned by a registration.
    pub fn registered(self) -> Result<ScriptId> {
        match self {
            Outcome::Registered(id) => Ok(id),
            other => Err(other.unexpected("register-script")),
        }
    }

    /// Version appended by an update.
    pub fn updated(self) -> Result<VersionNumber> {
        match self {
            Outcome::Updated(version) => Ok(version),
            other => Err(other.unexpected("update-script")),
        }
    }

    fn unexpected(self, operation: &str) -> RegistryError {
        RegistryError::IntegrityViolation(format!(
            "{} produced unexpected outcome {:?}",
            operation, self
        ))
    }
}
