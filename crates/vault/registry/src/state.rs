//! The registry state machine.
//!
//! [`Registry`] holds the three logical stores (scripts, versions, grants)
//! plus the id counter, and applies operations one at a time through `&mut
//! self`. It has no locking of its own; hosts that share it between threads
//! wrap it in [`SharedRegistry`](crate::SharedRegistry).
//!
//! Every mutation runs in two steps. `plan` checks all preconditions against
//! the current state without touching it and produces a [`Transition`];
//! `commit` applies that transition and cannot fail. A failed call therefore
//! never leaves partial state behind, and the journal can persist an operation
//! between the two steps.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};
use vault_types::{
    ContentHash, Identity, Script, ScriptId, ScriptVersion, ScriptView, VersionNumber, VersionView,
};

use crate::error::{RegistryError, Result};
use crate::operation::{Operation, Outcome};
use crate::policy::InputPolicy;
use crate::traits::ScriptReader;

/// In-memory registry of scripts, their versions, and access grants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    policy: InputPolicy,
    scripts: BTreeMap<ScriptId, Script>,
    versions: BTreeMap<(ScriptId, VersionNumber), ScriptVersion>,
    grants: BTreeSet<(ScriptId, Identity)>,
    last_script_id: u64,
}

/// A fully validated state change, ready to commit.
#[derive(Debug, Clone)]
pub(crate) enum Transition {
    Register {
        script: Script,
        initial: ScriptVersion,
    },
    AppendVersion(ScriptVersion),
    InsertGrant {
        script_id: ScriptId,
        grantee: Identity,
    },
    RemoveGrant {
        script_id: ScriptId,
        grantee: Identity,
    },
    SetOwner {
        script_id: ScriptId,
        from: Identity,
        to: Identity,
    },
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: InputPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &InputPolicy {
        &self.policy
    }

    /// Replace the bounds applied to later calls. Existing state is kept.
    pub fn set_policy(&mut self, policy: InputPolicy) {
        self.policy = policy;
    }

    /// Number of registered scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Execute one operation on behalf of `caller`.
    pub fn execute(&mut self, caller: &Identity, operation: &Operation) -> Result<Outcome> {
        let transition = self.plan(caller, operation)?;
        Ok(self.commit(transition))
    }

    pub fn register_script(
        &mut self,
        caller: &Identity,
        title: &str,
        content_hash: ContentHash,
        description: &str,
    ) -> Result<ScriptId> {
        self.execute(
            caller,
            &Operation::register_script(title, content_hash, description),
        )?
        .registered()
    }

    pub fn update_script(
        &mut self,
        caller: &Identity,
        script_id: ScriptId,
        content_hash: ContentHash,
        changelog: &str,
    ) -> Result<VersionNumber> {
        self.execute(
            caller,
            &Operation::update_script(script_id, content_hash, changelog),
        )?
        .updated()
    }

    pub fn grant_access(
        &mut self,
        caller: &Identity,
        script_id: ScriptId,
        grantee: &Identity,
    ) -> Result<bool> {
        self.execute(caller, &Operation::grant_access(script_id, grantee))
            .map(|_| true)
    }

    pub fn revoke_access(
        &mut self,
        caller: &Identity,
        script_id: ScriptId,
        grantee: &Identity,
    ) -> Result<bool> {
        self.execute(caller, &Operation::revoke_access(script_id, grantee))
            .map(|_| true)
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &Identity,
        script_id: ScriptId,
        new_owner: &Identity,
    ) -> Result<bool> {
        self.execute(caller, &Operation::transfer_ownership(script_id, new_owner))
            .map(|_| true)
    }

    /// Verify id density, gap-free version histories, and grant targets.
    pub fn check_invariants(&self) -> Result<()> {
        if self.scripts.len() as u64 != self.last_script_id {
            return Err(RegistryError::IntegrityViolation(format!(
                "{} scripts registered but id counter is {}",
                self.scripts.len(),
                self.last_script_id
            )));
        }

        let mut expected_versions = 0usize;
        for (index, (id, script)) in self.scripts.iter().enumerate() {
            let expected_id = ScriptId::new(index as u64 + 1);
            if *id != expected_id || script.id != expected_id {
                return Err(RegistryError::IntegrityViolation(format!(
                    "expected {} at position {}, found {}",
                    expected_id, index, id
                )));
            }

            for n in 1..=script.current_version.get() {
                if !self.versions.contains_key(&(*id, VersionNumber::new(n))) {
                    return Err(RegistryError::IntegrityViolation(format!(
                        "{} is missing version {}",
                        id, n
                    )));
                }
            }
            expected_versions += script.current_version.get() as usize;
        }

        if self.versions.len() != expected_versions {
            return Err(RegistryError::IntegrityViolation(format!(
                "{} versions stored but histories account for {}",
                self.versions.len(),
                expected_versions
            )));
        }

        if let Some((script_id, grantee)) = self
            .grants
            .iter()
            .find(|(script_id, _)| !self.scripts.contains_key(script_id))
        {
            return Err(RegistryError::IntegrityViolation(format!(
                "grant for {} references unknown {}",
                grantee, script_id
            )));
        }

        Ok(())
    }

    /// Validate `operation` against current state without changing it.
    pub(crate) fn plan(&self, caller: &Identity, operation: &Operation) -> Result<Transition> {
        match operation {
            Operation::RegisterScript {
                title,
                content_hash,
                description,
            } => {
                self.policy.check_title(title)?;
                self.policy.check_description(description)?;

                let id = self
                    .last_script_id
                    .checked_add(1)
                    .map(ScriptId::new)
                    .ok_or(RegistryError::CounterOverflow("script id"))?;

                Ok(Transition::Register {
                    script: Script {
                        id,
                        owner: caller.clone(),
                        title: title.clone(),
                        description: description.clone(),
                        current_version: VersionNumber::INITIAL,
                    },
                    initial: ScriptVersion {
                        script_id: id,
                        version: VersionNumber::INITIAL,
                        content_hash: *content_hash,
                        changelog: String::new(),
                    },
                })
            }

            Operation::UpdateScript {
                script_id,
                content_hash,
                changelog,
            } => {
                let script = self.owned_script(*script_id, caller, operation)?;
                self.policy.check_changelog(changelog)?;

                let version = script
                    .current_version
                    .next()
                    .ok_or(RegistryError::CounterOverflow("version"))?;

                Ok(Transition::AppendVersion(ScriptVersion {
                    script_id: *script_id,
                    version,
                    content_hash: *content_hash,
                    changelog: changelog.clone(),
                }))
            }

            Operation::GrantAccess { script_id, grantee } => {
                self.owned_script(*script_id, caller, operation)?;
                Ok(Transition::InsertGrant {
                    script_id: *script_id,
                    grantee: grantee.clone(),
                })
            }

            Operation::RevokeAccess { script_id, grantee } => {
                self.owned_script(*script_id, caller, operation)?;
                Ok(Transition::RemoveGrant {
                    script_id: *script_id,
                    grantee: grantee.clone(),
                })
            }

            Operation::TransferOwnership {
                script_id,
                new_owner,
            } => {
                let script = self.owned_script(*script_id, caller, operation)?;
                Ok(Transition::SetOwner {
                    script_id: *script_id,
                    from: script.owner.clone(),
                    to: new_owner.clone(),
                })
            }
        }
    }

    /// Apply a transition produced by `plan` on this same state.
    pub(crate) fn commit(&mut self, transition: Transition) -> Outcome {
        match transition {
            Transition::Register { script, initial } => {
                let id = script.id;
                info!(
                    script_id = id.get(),
                    owner = %script.owner,
                    content_hash = %initial.content_hash,
                    "Script registered"
                );
                self.last_script_id = id.get();
                self.versions.insert((id, initial.version), initial);
                self.scripts.insert(id, script);
                Outcome::Registered(id)
            }

            Transition::AppendVersion(version) => {
                let key = (version.script_id, version.version);
                if let Some(script) = self.scripts.get_mut(&version.script_id) {
                    script.current_version = version.version;
                }
                info!(
                    script_id = key.0.get(),
                    version = key.1.get(),
                    content_hash = %version.content_hash,
                    "Script version appended"
                );
                self.versions.insert(key, version);
                Outcome::Updated(key.1)
            }

            Transition::InsertGrant { script_id, grantee } => {
                info!(script_id = script_id.get(), grantee = %grantee, "Access granted");
                self.grants.insert((script_id, grantee));
                Outcome::AccessGranted
            }

            Transition::RemoveGrant { script_id, grantee } => {
                info!(script_id = script_id.get(), grantee = %grantee, "Access revoked");
                self.grants.remove(&(script_id, grantee));
                Outcome::AccessRevoked
            }

            Transition::SetOwner {
                script_id,
                from,
                to,
            } => {
                info!(
                    script_id = script_id.get(),
                    from = %from,
                    to = %to,
                    "Ownership transferred"
                );
                if let Some(script) = self.scripts.get_mut(&script_id) {
                    script.owner = to;
                }
                Outcome::OwnershipTransferred
            }
        }
    }

    fn owned_script(
        &self,
        script_id: ScriptId,
        caller: &Identity,
        operation: &Operation,
    ) -> Result<&Script> {
        let script = self
            .scripts
            .get(&script_id)
            .ok_or(RegistryError::NotFound(script_id))?;

        if !script.is_owner(caller) {
            warn!(
                script_id = script_id.get(),
                caller = %caller,
                operation = operation.name(),
                "Rejected non-owner call"
            );
            return Err(RegistryError::Unauthorized {
                script_id,
                caller: caller.clone(),
            });
        }

        Ok(script)
    }
}

impl ScriptReader for Registry {
    fn get_script(&self, script_id: ScriptId) -> Option<ScriptView> {
        self.scripts.get(&script_id).map(Script::view)
    }

    fn get_script_version(
        &self,
        script_id: ScriptId,
        version: VersionNumber,
    ) -> Option<VersionView> {
        self.versions
            .get(&(script_id, version))
            .map(ScriptVersion::view)
    }

    fn can_access(&self, script_id: ScriptId, identity: &Identity) -> bool {
        match self.scripts.get(&script_id) {
            Some(script) => {
                script.is_owner(identity)
                    || self.grants.contains(&(script_id, identity.clone()))
            }
            None => false,
        }
    }

    fn last_script_id(&self) -> u64 {
        self.last_script_id
    }

    fn version_history(&self, script_id: ScriptId) -> Option<Vec<VersionView>> {
        self.scripts.get(&script_id)?;
        let start = (script_id, VersionNumber::new(0));
        let end = (script_id, VersionNumber::new(u64::MAX));
        Some(
            self.versions
                .range(start..=end)
                .map(|(_, version)| version.view())
                .collect(),
        )
    }

    fn grantees(&self, script_id: ScriptId) -> Vec<Identity> {
        self.grants
            .range((script_id, Identity::new(String::new()))..)
            .take_while(|(id, _)| *id == script_id)
            .map(|(_, grantee)| grantee.clone())
            .collect()
    }

    fn scripts_owned_by(&self, identity: &Identity) -> Vec<ScriptId> {
        self.scripts
            .values()
            .filter(|script| script.is_owner(identity))
            .map(|script| script.id)
            .collect()
    }
}
