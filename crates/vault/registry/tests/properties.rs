//! Property tests: registry invariants hold for arbitrary operation sequences.

use proptest::prelude::*;
use vault_registry::{
    InputPolicy, Journal, Operation, Outcome, Registry, RegistryError, ScriptReader,
};
use vault_types::{ContentHash, Identity, ScriptId, VersionNumber};

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

const PARTIES: [&str; 4] = ["alice", "bob", "carol", "dave"];

fn arb_identity() -> impl Strategy<Value = Identity> {
    (0..PARTIES.len()).prop_map(|i| Identity::from(PARTIES[i]))
}

fn arb_hash() -> impl Strategy<Value = ContentHash> {
    any::<[u8; 32]>().prop_map(ContentHash::from_bytes)
}

/// Script ids slightly past what a short run registers, so unknown ids occur.
fn arb_script_id() -> impl Strategy<Value = ScriptId> {
    (1u64..6).prop_map(ScriptId::new)
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        ("[a-z]{1,12}", arb_hash(), "[a-z ]{1,24}").prop_map(|(title, content_hash, description)| {
            Operation::RegisterScript {
                title,
                content_hash,
                description,
            }
        }),
        (arb_script_id(), arb_hash(), "[a-z ]{0,24}").prop_map(
            |(script_id, content_hash, changelog)| Operation::UpdateScript {
                script_id,
                content_hash,
                changelog,
            }
        ),
        (arb_script_id(), arb_identity())
            .prop_map(|(script_id, grantee)| Operation::GrantAccess { script_id, grantee }),
        (arb_script_id(), arb_identity())
            .prop_map(|(script_id, grantee)| Operation::RevokeAccess { script_id, grantee }),
        (arb_script_id(), arb_identity()).prop_map(|(script_id, new_owner)| {
            Operation::TransferOwnership {
                script_id,
                new_owner,
            }
        }),
    ]
}

fn arb_calls(max: usize) -> impl Strategy<Value = Vec<(Identity, Operation)>> {
    prop::collection::vec((arb_identity(), arb_operation()), 1..max)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Version count equals current_version for every script after every call.
    #[test]
    fn histories_never_have_gaps(calls in arb_calls(40)) {
        let mut registry = Registry::new();
        for (caller, op) in &calls {
            let _ = registry.execute(caller, op);
            prop_assert!(registry.check_invariants().is_ok());
        }

        for n in 1..=registry.last_script_id() {
            let id = ScriptId::new(n);
            let script = registry.get_script(id).unwrap();
            let history = registry.version_history(id).unwrap();
            prop_assert_eq!(history.len() as u64, script.current_version.get());
        }
    }

    /// Owner-only operations succeed exactly when the caller owns the script.
    #[test]
    fn only_the_owner_at_call_time_may_mutate(calls in arb_calls(40)) {
        let mut registry = Registry::new();
        for (caller, op) in &calls {
            let target = op.script_id();
            let owner_before = target.and_then(|id| registry.get_script(id)).map(|s| s.owner);
            let before = registry.clone();

            let result = registry.execute(caller, op);

            match (target, owner_before) {
                (None, _) => prop_assert!(result.is_ok()),
                (Some(_), None) => {
                    prop_assert!(matches!(result, Err(RegistryError::NotFound(_))));
                    prop_assert_eq!(&registry, &before);
                }
                (Some(_), Some(owner)) if &owner == caller => prop_assert!(result.is_ok()),
                (Some(_), Some(_)) => {
                    let unauthorized = matches!(result, Err(RegistryError::Unauthorized { .. }));
                    prop_assert!(unauthorized);
                    prop_assert_eq!(&registry, &before);
                }
            }
        }
    }

    /// Updates always yield current_version + 1.
    #[test]
    fn updates_advance_by_exactly_one(calls in arb_calls(40)) {
        let mut registry = Registry::new();
        for (caller, op) in &calls {
            let previous = op
                .script_id()
                .and_then(|id| registry.get_script(id))
                .map(|s| s.current_version);

            if let Ok(Outcome::Updated(version)) = registry.execute(caller, op) {
                let expected = previous.and_then(VersionNumber::next);
                prop_assert_eq!(Some(version), expected);
            }
        }
    }

    /// can_access is exactly "owner or explicit grantee".
    #[test]
    fn access_matches_owner_or_grant(calls in arb_calls(40), party in arb_identity()) {
        let mut registry = Registry::new();
        for (caller, op) in &calls {
            let _ = registry.execute(caller, op);
        }

        for n in 1..=registry.last_script_id() + 1 {
            let id = ScriptId::new(n);
            let expected = match registry.get_script(id) {
                Some(script) => script.owner == party || registry.grantees(id).contains(&party),
                None => false,
            };
            prop_assert_eq!(registry.can_access(id, &party), expected);
        }
    }

    /// Replaying the journal of accepted calls reproduces the same registry.
    #[test]
    fn journal_replay_reproduces_state(calls in arb_calls(30)) {
        let mut registry = Registry::new();
        let mut journal = Journal::in_memory();
        for (caller, op) in calls {
            if registry.execute(&caller, &op).is_ok() {
                journal.append(&caller, op).unwrap();
            }
        }

        let replayed = journal.replay(InputPolicy::default()).unwrap();
        prop_assert_eq!(replayed, registry);
    }
}
