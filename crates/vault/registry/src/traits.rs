//! Reader and writer boundaries of the registry.

use crate::error::Result;
use crate::operation::{Operation, Outcome};
use vault_types::{ContentHash, Identity, ScriptId, ScriptView, VersionNumber, VersionView};

/// Read-only queries. None of them can fail; absence is a value.
pub trait ScriptReader {
    fn get_script(&self, script_id: ScriptId) -> Option<ScriptView>;

    fn get_script_version(
        &self,
        script_id: ScriptId,
        version: VersionNumber,
    ) -> Option<VersionView>;

    /// True iff `identity` owns the script or holds a grant on it.
    fn can_access(&self, script_id: ScriptId, identity: &Identity) -> bool;

    /// Highest id assigned so far, 0 when nothing is registered.
    fn last_script_id(&self) -> u64;

    /// All versions in ascending order, `None` for an unknown script.
    fn version_history(&self, script_id: ScriptId) -> Option<Vec<VersionView>>;

    /// Explicit grant holders, sorted by identity.
    fn grantees(&self, script_id: ScriptId) -> Vec<Identity>;

    fn scripts_owned_by(&self, identity: &Identity) -> Vec<ScriptId>;
}

/// Write boundary for hosts that share one registry between threads.
pub trait ScriptWriter {
    /// Execute one operation on behalf of an authenticated caller.
    fn submit(&self, caller: &Identity, operation: Operation) -> Result<Outcome>;

    fn register_script(
        &self,
        caller: &Identity,
        title: &str,
        content_hash: ContentHash,
        description: &str,
    ) -> Result<ScriptId> {
        self.submit(
            caller,
            Operation::register_script(title, content_hash, description),
        )?
        .registered()
    }

    fn update_script(
        &self,
        caller: &Identity,
        script_id: ScriptId,
        content_hash: ContentHash,
        changelog: &str,
    ) -> Result<VersionNumber> {
        self.submit(
            caller,
            Operation::update_script(script_id, content_hash, changelog),
        )?
        .updated()
    }

    fn grant_access(
        &self,
        caller: &Identity,
        script_id: ScriptId,
        grantee: &Identity,
    ) -> Result<bool> {
        self.submit(caller, Operation::grant_access(script_id, grantee))
            .map(|_| true)
    }

    fn revoke_access(
        &self,
        caller: &Identity,
        script_id: ScriptId,
        grantee: &Identity,
    ) -> Result<bool> {
        self.submit(caller, Operation::revoke_access(script_id, grantee))
            .map(|_| true)
    }

    fn transfer_ownership(
        &self,
        caller: &Identity,
        script_id: ScriptId,
        new_owner: &Identity,
    ) -> Result<bool> {
        self.submit(caller, Operation::transfer_ownership(script_id, new_owner))
            .map(|_| true)
    }
}
