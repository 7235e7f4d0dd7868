//! Registry shared between threads.
//!
//! One `RwLock` guards the registry together with its journal, so every write
//! is serialized and readers never observe a write in progress. Per-script
//! locks would not help here: each write checks the script, its versions, and
//! its grants as one unit.

use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use tracing::info;
use vault_types::{Identity, ScriptId, ScriptView, VersionNumber, VersionView};

use crate::config::VaultConfig;
use crate::error::{RegistryError, Result};
use crate::journal::{Journal, JournalEntry};
use crate::operation::{Operation, Outcome};
use crate::policy::InputPolicy;
use crate::state::Registry;
use crate::traits::{ScriptReader, ScriptWriter};

/// Journaled registry behind a single writer lock
pub struct SharedRegistry {
    inner: RwLock<Inner>,
}

struct Inner {
    registry: Registry,
    journal: Journal,
}

impl SharedRegistry {
    /// Empty registry with an in-memory journal.
    pub fn new(policy: InputPolicy) -> Self {
        Self {
            inner: RwLock::new(Inner {
                registry: Registry::with_policy(policy),
                journal: Journal::in_memory(),
            }),
        }
    }

    /// Rebuild state from an existing journal and keep appending to it.
    pub fn from_journal(journal: Journal, policy: InputPolicy) -> Result<Self> {
        let registry = journal.replay(policy)?;
        registry.check_invariants()?;
        info!(
            entries = journal.len(),
            scripts = registry.len(),
            "Registry restored from journal"
        );

        Ok(Self {
            inner: RwLock::new(Inner { registry, journal }),
        })
    }

    /// Build from configuration: file-backed when a journal path is set.
    pub fn open(config: &VaultConfig) -> Result<Self> {
        match &config.journal.path {
            Some(path) => Self::from_journal(Journal::open(path)?, config.policy.clone()),
            None => Ok(Self::new(config.policy.clone())),
        }
    }

    /// Number of accepted operations.
    pub fn journal_len(&self) -> usize {
        self.read().journal.len()
    }

    pub fn journal_entries(&self) -> Vec<JournalEntry> {
        self.read().journal.entries().to_vec()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Registry {
        self.read().registry.clone()
    }

    // Writes never leave partial state, so a poisoned lock still guards a
    // consistent registry and readers may keep using it.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScriptWriter for SharedRegistry {
    fn submit(&self, caller: &Identity, operation: Operation) -> Result<Outcome> {
        let mut guard = self.inner.write().map_err(|_| RegistryError::Poisoned)?;
        let inner = &mut *guard;

        let transition = inner.registry.plan(caller, &operation)?;
        inner.journal.append(caller, operation)?;
        Ok(inner.registry.commit(transition))
    }
}

impl ScriptReader for SharedRegistry {
    fn get_script(&self, script_id: ScriptId) -> Option<ScriptView> {
        self.read().registry.get_script(script_id)
    }

    fn get_script_version(
        &self,
        script_id: ScriptId,
        version: VersionNumber,
    ) -> Option<VersionView> {
        self.read().registry.get_script_version(script_id, version)
    }

    fn can_access(&self, script_id: ScriptId, identity: &Identity) -> bool {
        self.read().registry.can_access(script_id, identity)
    }

    fn last_script_id(&self) -> u64 {
        self.read().registry.last_script_id()
    }

    fn version_history(&self, script_id: ScriptId) -> Option<Vec<VersionView>> {
        self.read().registry.version_history(script_id)
    }

    fn grantees(&self, script_id: ScriptId) -> Vec<Identity> {
        self.read().registry.grantees(script_id)
    }

    fn scripts_owned_by(&self, identity: &Identity) -> Vec<ScriptId> {
        self.read().registry.scripts_owned_by(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::test_support::FlakyStorage;
    use crate::journal::JournalError;
    use std::sync::Arc;
    use std::thread;
    use vault_types::ContentHash;

    fn hash(seed: u8) -> ContentHash {
        ContentHash::from_bytes([seed; 32])
    }

    #[test]
    fn writes_are_journaled() {
        let shared = SharedRegistry::new(InputPolicy::default());
        let owner = Identity::from("deployer");

        let id = shared
            .register_script(&owner, "Test Script", hash(1), "Test Description")
            .unwrap();
        shared.update_script(&owner, id, hash(2), "fix").unwrap();

        assert_eq!(shared.journal_len(), 2);
        let entries = shared.journal_entries();
        assert_eq!(entries[1].operation.name(), "update-script");
    }

    #[test]
    fn rejected_writes_are_not_journaled() {
        let shared = SharedRegistry::new(InputPolicy::default());
        let owner = Identity::from("deployer");
        let id = shared
            .register_script(&owner, "Test Script", hash(1), "Test Description")
            .unwrap();

        let error = shared
            .grant_access(&Identity::from("wallet_1"), id, &Identity::from("wallet_1"))
            .unwrap_err();

        assert!(matches!(error, RegistryError::Unauthorized { .. }));
        assert_eq!(shared.journal_len(), 1);
    }

    #[test]
    fn journal_failure_leaves_state_and_file_untouched() {
        let storage = FlakyStorage::default();
        let shared = SharedRegistry::from_journal(storage.open(), InputPolicy::default()).unwrap();
        let owner = Identity::from("deployer");
        let id = shared
            .register_script(&owner, "Test Script", hash(1), "Test Description")
            .unwrap();

        let before = shared.snapshot();
        let persisted = storage.contents();

        storage.fail_writes(true);
        let error = shared
            .update_script(&owner, id, hash(2), "lost write")
            .unwrap_err();
        assert!(matches!(error, RegistryError::Journal(JournalError::Io(_))));

        assert_eq!(shared.snapshot(), before);
        assert_eq!(shared.journal_len(), 1);
        assert_eq!(storage.contents(), persisted);

        storage.fail_writes(false);
        let version = shared.update_script(&owner, id, hash(3), "retry").unwrap();
        assert_eq!(version, VersionNumber::new(2));

        let restored = storage
            .journal()
            .unwrap()
            .replay(InputPolicy::default())
            .unwrap();
        assert_eq!(restored, shared.snapshot());
        assert_eq!(
            restored.get_script_version(id, version).unwrap().content_hash,
            hash(3)
        );
    }

    #[test]
    fn concurrent_registrations_get_dense_ids() {
        let shared = Arc::new(SharedRegistry::new(InputPolicy::default()));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let caller = Identity::new(format!("wallet_{}", n));
                    (0..10)
                        .map(|i| {
                            shared
                                .register_script(&caller, "script", hash(i), "concurrent")
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .map(ScriptId::get)
            .collect();
        ids.sort_unstable();

        assert_eq!(ids, (1..=80).collect::<Vec<_>>());
        shared.snapshot().check_invariants().unwrap();

        let replayed = Journal::from_entries(shared.journal_entries())
            .unwrap()
            .replay(InputPolicy::default())
            .unwrap();
        assert_eq!(replayed, shared.snapshot());
    }
}
