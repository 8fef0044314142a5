//! Integration tests for the vault: password verification and rekeying.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread;

use chrono::Utc;
use walletvault::crypto::kdf::MIN_MEMORY_KIB;
use walletvault::crypto::{Argon2Params, KeyCipher, PasswordHasher};
use walletvault::errors::WalletVaultError;
use walletvault::vault::accounts::{ACCOUNTS_KEY, ACTIVE_ACCOUNT_KEY, CREDENTIAL_KEY};
use walletvault::vault::{
    AbortReason, AccountRecord, AccountStore, ActiveAccountRecord, CommitStage, KeyValueStore,
    MemoryStore, NewAccount, PolicyViolation, RekeyCoordinator, RekeyOutcome, RekeyReport,
    StoreError, Verification,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: MIN_MEMORY_KIB,
        iterations: 1,
        parallelism: 1,
    }
}

/// Memory store whose writes to one chosen key fail.
#[derive(Default)]
struct FailingStore {
    inner: MemoryStore,
    fail_key: Mutex<Option<&'static str>>,
}

impl FailingStore {
    fn fail_writes_to(&self, key: &'static str) {
        *self.fail_key.lock().unwrap() = Some(key);
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if *self.fail_key.lock().unwrap() == Some(key) {
            return Err(StoreError::Backend(format!("injected failure writing {key}")));
        }
        self.inner.set(key, value)
    }
}

fn vault<S: KeyValueStore>(store: S) -> RekeyCoordinator<S> {
    RekeyCoordinator::new(AccountStore::new(store), fast_params()).unwrap()
}

/// Store a credential directly, bypassing the new-password policy.
fn seed_credential<S: KeyValueStore>(vault: &RekeyCoordinator<S>, password: &str) {
    let credential = PasswordHasher::new(fast_params())
        .hash(password.as_bytes())
        .unwrap();
    vault.store().set_credential(&credential).unwrap();
}

fn add<S: KeyValueStore>(vault: &RekeyCoordinator<S>, password: &str, name: &str, key: &[u8]) {
    vault
        .add_account(
            password,
            NewAccount {
                name,
                network: "mainnet",
                public_key: "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV",
                private_key: key,
                activate: false,
            },
        )
        .unwrap();
}

fn snapshot<S: KeyValueStore>(store: &S) -> Vec<Option<Vec<u8>>> {
    [CREDENTIAL_KEY, ACCOUNTS_KEY, ACTIVE_ACCOUNT_KEY]
        .iter()
        .map(|key| store.get(key).unwrap())
        .collect()
}

/// Vault with password "old" and two accounts, A1 active.
fn two_account_vault<S: KeyValueStore>(store: S) -> RekeyCoordinator<S> {
    let vault = vault(store);
    seed_credential(&vault, "old");
    add(&vault, "old", "A1", b"K1");
    add(&vault, "old", "A2", b"K2");
    vault
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[test]
fn empty_vault_has_no_credential() {
    let vault = vault(MemoryStore::new());

    assert_eq!(
        vault.check_current_password("").unwrap(),
        Verification::NoCredentialSet
    );
    assert_eq!(
        vault.change_password("", "NewPass1"),
        RekeyOutcome::Aborted(AbortReason::Mismatch)
    );
    assert!(vault.store().inner().is_empty(), "nothing may be written");
}

#[test]
fn initialize_then_verify() {
    let vault = vault(MemoryStore::new());
    vault.initialize("Secret99").unwrap();

    assert!(vault.check_current_password("Secret99").unwrap().is_matched());
    assert_eq!(
        vault.check_current_password("Secret98").unwrap(),
        Verification::Mismatched
    );
}

// ---------------------------------------------------------------------------
// Aborts leave the store untouched
// ---------------------------------------------------------------------------

#[test]
fn wrong_old_password_changes_nothing() {
    let vault = two_account_vault(MemoryStore::new());
    let before = snapshot(vault.store().inner());

    let outcome = vault.change_password("not-old", "NewPass1");
    assert_eq!(outcome, RekeyOutcome::Aborted(AbortReason::Mismatch));
    assert_eq!(snapshot(vault.store().inner()), before);
}

#[test]
fn policy_violation_changes_nothing() {
    let vault = two_account_vault(MemoryStore::new());
    let before = snapshot(vault.store().inner());

    assert_eq!(
        vault.change_password("old", "aaaaaaaa"),
        RekeyOutcome::Aborted(AbortReason::InvalidNewPassword(PolicyViolation::MissingDigit))
    );
    assert_eq!(
        vault.change_password("old", "12345678"),
        RekeyOutcome::Aborted(AbortReason::InvalidNewPassword(PolicyViolation::MissingLetter))
    );
    assert_eq!(
        vault.change_password("old", ""),
        RekeyOutcome::Aborted(AbortReason::InvalidNewPassword(PolicyViolation::Empty))
    );

    assert_eq!(snapshot(vault.store().inner()), before);
    assert!(vault.check_current_password("old").unwrap().is_matched());
}

#[test]
fn undecryptable_account_aborts_without_writes() {
    let vault = two_account_vault(MemoryStore::new());

    let mut accounts = vault.store().accounts().unwrap();
    accounts[1].encrypted_private_key = vec![1, 2, 3];
    vault.store().set_accounts(&accounts).unwrap();
    let before = snapshot(vault.store().inner());

    let outcome = vault.change_password("old", "NewPass1");
    assert_eq!(
        outcome,
        RekeyOutcome::Aborted(AbortReason::CorruptRecord {
            record: "A2".into()
        })
    );
    assert_eq!(snapshot(vault.store().inner()), before);

    // A1 still opens with the old password.
    let key = vault.reveal_private_key("old", "A1").unwrap();
    assert_eq!(key.as_slice(), b"K1");
}

#[test]
fn tampered_credential_params_abort_quickly() {
    use std::time::{Duration, Instant};

    let vault = two_account_vault(MemoryStore::new());
    let mut credential = vault.store().credential().unwrap().unwrap();
    credential.argon2_params.iterations = u32::MAX;
    vault.store().set_credential(&credential).unwrap();
    let before = snapshot(vault.store().inner());

    let started = Instant::now();
    assert_eq!(
        vault.change_password("old", "NewPass1"),
        RekeyOutcome::Aborted(AbortReason::CorruptRecord {
            record: CREDENTIAL_KEY.into()
        })
    );
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(snapshot(vault.store().inner()), before);
}

#[test]
fn malformed_accounts_list_aborts_as_corrupt() {
    let vault = two_account_vault(MemoryStore::new());
    vault
        .store()
        .inner()
        .set(ACCOUNTS_KEY, b"{ not json")
        .unwrap();
    let before = snapshot(vault.store().inner());

    assert_eq!(
        vault.change_password("old", "NewPass1"),
        RekeyOutcome::Aborted(AbortReason::CorruptRecord {
            record: ACCOUNTS_KEY.into()
        })
    );
    assert_eq!(snapshot(vault.store().inner()), before);
}

// ---------------------------------------------------------------------------
// Successful rekey
// ---------------------------------------------------------------------------

#[test]
fn two_account_happy_path() {
    let vault = two_account_vault(MemoryStore::new());
    let before = vault.store().accounts().unwrap();

    let outcome = vault.change_password("old", "new-Pass1");
    assert_eq!(
        outcome,
        RekeyOutcome::Done(RekeyReport {
            accounts_rekeyed: 2,
            active_rekeyed: true,
        })
    );

    assert!(vault.check_current_password("new-Pass1").unwrap().is_matched());
    assert_eq!(
        vault.check_current_password("old").unwrap(),
        Verification::Mismatched
    );

    let after = vault.store().accounts().unwrap();
    assert_eq!(after.len(), 2);
    for (old_record, new_record) in before.iter().zip(&after) {
        assert_eq!(old_record.name, new_record.name);
        assert_eq!(old_record.network, new_record.network);
        assert_eq!(old_record.public_key, new_record.public_key);
        assert_ne!(
            old_record.encrypted_private_key, new_record.encrypted_private_key,
            "ciphertext must be replaced"
        );
    }

    let cipher = KeyCipher::new(fast_params());
    for record in &after {
        assert!(cipher.decrypt(&record.encrypted_private_key, b"old").is_err());
    }

    assert_eq!(vault.reveal_private_key("new-Pass1", "A1").unwrap().as_slice(), b"K1");
    assert_eq!(vault.reveal_private_key("new-Pass1", "A2").unwrap().as_slice(), b"K2");
    assert!(matches!(
        vault.reveal_private_key("old", "A1"),
        Err(WalletVaultError::WrongPassword)
    ));

    let active = vault.store().active_account().unwrap().unwrap();
    assert_eq!(active.name(), "A1");
    assert!(vault.is_active_authenticated("new-Pass1").unwrap());
    assert!(!vault.is_active_authenticated("old").unwrap());
}

#[test]
fn rekey_with_no_accounts() {
    let vault = vault(MemoryStore::new());
    seed_credential(&vault, "old");

    assert_eq!(
        vault.change_password("old", "NewPass1"),
        RekeyOutcome::Done(RekeyReport {
            accounts_rekeyed: 0,
            active_rekeyed: false,
        })
    );
    assert!(vault.store().accounts().unwrap().is_empty());
    assert!(vault.store().active_account().unwrap().is_none());
    assert!(vault.check_current_password("NewPass1").unwrap().is_matched());
}

#[test]
fn active_account_missing_from_list_is_rekeyed() {
    let vault = vault(MemoryStore::new());
    seed_credential(&vault, "old");
    add(&vault, "old", "A1", b"K1");
    vault.store().set_accounts(&[]).unwrap();

    assert_eq!(
        vault.change_password("old", "NewPass1"),
        RekeyOutcome::Done(RekeyReport {
            accounts_rekeyed: 0,
            active_rekeyed: true,
        })
    );
    assert!(vault.is_active_authenticated("NewPass1").unwrap());
}

#[test]
fn active_account_keeps_its_own_ciphertext() {
    // The active slot is a copy; both copies must move to the new password.
    let vault = vault(MemoryStore::new());
    seed_credential(&vault, "old");
    let record = AccountRecord {
        name: "solo".into(),
        network: "testnet".into(),
        encrypted_private_key: KeyCipher::new(fast_params())
            .encrypt(b"solo-key", b"old")
            .unwrap(),
        public_key: "PK".into(),
        created_at: Utc::now(),
    };
    vault.store().set_accounts(&[record.clone()]).unwrap();
    vault
        .store()
        .set_active_account(&ActiveAccountRecord::new(record))
        .unwrap();

    assert!(vault.change_password("old", "NewPass1").is_done());
    let active = vault.store().active_account().unwrap().unwrap();
    let listed = &vault.store().accounts().unwrap()[0];
    assert_ne!(active.account.encrypted_private_key, listed.encrypted_private_key);
    assert!(vault.is_active_authenticated("NewPass1").unwrap());
    assert_eq!(
        vault.reveal_private_key("NewPass1", "solo").unwrap().as_slice(),
        b"solo-key"
    );
}

#[test]
fn retry_after_success_is_mismatch() {
    let vault = two_account_vault(MemoryStore::new());

    assert!(vault.change_password("old", "NewPass1").is_done());
    let after_first = snapshot(vault.store().inner());

    assert_eq!(
        vault.change_password("old", "NewPass1"),
        RekeyOutcome::Aborted(AbortReason::Mismatch)
    );
    assert_eq!(snapshot(vault.store().inner()), after_first);
}

// ---------------------------------------------------------------------------
// Commit ordering under write failures
// ---------------------------------------------------------------------------

#[test]
fn failure_writing_accounts_leaves_old_password_working() {
    let store = Arc::new(FailingStore::default());
    let vault = two_account_vault(Arc::clone(&store));
    let before = snapshot(&store);

    store.fail_writes_to(ACCOUNTS_KEY);
    let outcome = vault.change_password("old", "NewPass1");

    match outcome.abort_reason() {
        Some(AbortReason::PersistFailed { stage, .. }) => {
            assert_eq!(*stage, CommitStage::Accounts)
        }
        other => panic!("expected PersistFailed, got {other:?}"),
    }
    assert_eq!(snapshot(&store), before);
    assert!(vault.check_current_password("old").unwrap().is_matched());
    assert_eq!(vault.reveal_private_key("old", "A2").unwrap().as_slice(), b"K2");
}

#[test]
fn failure_writing_active_account_keeps_old_credential() {
    let store = Arc::new(FailingStore::default());
    let vault = two_account_vault(Arc::clone(&store));
    let credential_before = store.get(CREDENTIAL_KEY).unwrap();
    let active_before = store.get(ACTIVE_ACCOUNT_KEY).unwrap();

    store.fail_writes_to(ACTIVE_ACCOUNT_KEY);
    let outcome = vault.change_password("old", "NewPass1");

    assert!(matches!(
        outcome,
        RekeyOutcome::Aborted(AbortReason::PersistFailed {
            stage: CommitStage::ActiveAccount,
            ..
        })
    ));
    assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), credential_before);
    assert_eq!(store.get(ACTIVE_ACCOUNT_KEY).unwrap(), active_before);
    assert!(vault.check_current_password("old").unwrap().is_matched());
    assert!(vault.is_active_authenticated("old").unwrap());
}

#[test]
fn failure_writing_credential_is_reported_last() {
    let store = Arc::new(FailingStore::default());
    let vault = two_account_vault(Arc::clone(&store));

    store.fail_writes_to(CREDENTIAL_KEY);
    let outcome = vault.change_password("old", "NewPass1");

    let reason = outcome.abort_reason().cloned().unwrap();
    assert!(matches!(
        reason,
        AbortReason::PersistFailed {
            stage: CommitStage::Credential,
            ..
        }
    ));
    assert!(reason.to_string().contains("injected failure"));
    // Accounts and active account already moved; the credential did not.
    assert!(vault.check_current_password("old").unwrap().is_matched());
    assert!(vault.is_active_authenticated("NewPass1").unwrap());
}

// ---------------------------------------------------------------------------
// Hooks and concurrency
// ---------------------------------------------------------------------------

#[test]
fn hook_fires_once_per_successful_change() {
    let mut vault = two_account_vault(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let hook_calls = Arc::clone(&calls);
    let hook_seen = Arc::clone(&seen);
    vault.on_password_changed(move |report| {
        hook_calls.fetch_add(1, Ordering::SeqCst);
        hook_seen.lock().unwrap().push(*report);
    });

    assert!(!vault.change_password("wrong", "NewPass1").is_done());
    assert!(!vault.change_password("old", "weak").is_done());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert!(vault.change_password("old", "NewPass1").is_done());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[RekeyReport {
            accounts_rekeyed: 2,
            active_rekeyed: true,
        }]
    );
}

#[test]
fn hook_can_call_back_into_the_vault() {
    let vault_slot: Arc<OnceLock<Weak<RekeyCoordinator<MemoryStore>>>> = Arc::new(OnceLock::new());
    let revealed = Arc::new(Mutex::new(None));

    let mut vault = two_account_vault(MemoryStore::new());
    let hook_slot = Arc::clone(&vault_slot);
    let hook_revealed = Arc::clone(&revealed);
    vault.on_password_changed(move |_| {
        let vault = hook_slot.get().and_then(Weak::upgrade).unwrap();
        vault.use_account("A2").unwrap();
        let key = vault.reveal_private_key("NewPass1", "A2").unwrap();
        *hook_revealed.lock().unwrap() = Some(key.to_vec());
    });

    let vault = Arc::new(vault);
    vault_slot.set(Arc::downgrade(&vault)).unwrap();

    assert!(vault.change_password("old", "NewPass1").is_done());
    assert_eq!(vault.store().active_account().unwrap().unwrap().name(), "A2");
    assert_eq!(revealed.lock().unwrap().as_deref(), Some(&b"K2"[..]));
}

#[test]
fn reads_during_rekey_see_old_or_new_state() {
    let vault = Arc::new(two_account_vault(MemoryStore::new()));

    let rekey = {
        let vault = Arc::clone(&vault);
        thread::spawn(move || vault.change_password("old", "NewPass1"))
    };

    // Every read with the old password either sees the untouched vault
    // or the finished one; never a key rewritten under the new password.
    loop {
        match vault.reveal_private_key("old", "A1") {
            Ok(key) => assert_eq!(key.as_slice(), b"K1"),
            Err(WalletVaultError::WrongPassword) => break,
            Err(other) => panic!("read saw a half-committed rekey: {other}"),
        }
        match vault.is_active_authenticated("old") {
            Ok(_) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert!(rekey.join().unwrap().is_done());
    assert!(vault.is_active_authenticated("NewPass1").unwrap());
}

#[test]
fn concurrent_changes_are_serialized() {
    let vault = Arc::new(two_account_vault(MemoryStore::new()));

    let handles: Vec<_> = ["FirstPass1", "SecondPass2"]
        .into_iter()
        .map(|new| {
            let vault = Arc::clone(&vault);
            thread::spawn(move || (new, vault.change_password("old", new)))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<_> = results.iter().filter(|(_, o)| o.is_done()).collect();
    assert_eq!(winners.len(), 1, "exactly one change may win: {results:?}");
    let loser = results.iter().find(|(_, o)| !o.is_done()).unwrap();
    assert_eq!(loser.1, RekeyOutcome::Aborted(AbortReason::Mismatch));

    let winner = winners[0].0;
    assert!(vault.check_current_password(winner).unwrap().is_matched());
    assert_eq!(vault.reveal_private_key(winner, "A1").unwrap().as_slice(), b"K1");
    assert_eq!(vault.reveal_private_key(winner, "A2").unwrap().as_slice(), b"K2");
    assert!(vault.is_active_authenticated(winner).unwrap());
}
