//! Persistent storage using RocksDB.
//!
//! Key layout:
//! - `entry:{external_id}` -> JSON [`WaitlistEntry`]
//! - `code:{referral_code}` -> external id (uniqueness index)
//! - `tier:{tier}` -> big-endian `u64` count of entries in the tier
//!
//! Every [`WaitlistStore`] mutation runs in a pessimistic transaction that
//! locks the keys it reads with `get_for_update`. Creates lock the entry key,
//! the code key and the tier counter in that order, so concurrent signups in
//! one tier queue on the counter and each sees a distinct count.

use crate::error::Result;
use rocksdb::{
    Direction, ErrorKind, IteratorMode, Options, Transaction, TransactionDB, TransactionDBOptions,
};
use std::path::Path;
use waitlist_core::store::sort_entries;
use waitlist_core::{
    Adjustment, CreateOutcome, Field, OrderBy, Tier, WaitlistEntry, WaitlistStore,
};

/// How long a transaction waits on a locked key before giving up.
const LOCK_TIMEOUT_MS: i64 = 5_000;

/// Attempts for a transaction that fails with a retryable lock error.
const MAX_TXN_ATTEMPTS: u32 = 5;

const ENTRY_PREFIX: &str = "entry:";
const CODE_PREFIX: &str = "code:";
const TIER_PREFIX: &str = "tier:";

fn entry_key(external_id: &str) -> String {
    format!("{}{}", ENTRY_PREFIX, external_id)
}

fn code_key(code: &str) -> String {
    format!("{}{}", CODE_PREFIX, code)
}

fn tier_key(tier: Tier) -> String {
    format!("{}{}", TIER_PREFIX, tier.as_str())
}

fn decode_count(raw: Option<Vec<u8>>) -> waitlist_core::Result<u64> {
    match raw {
        None => Ok(0),
        Some(bytes) => {
            let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                waitlist_core::Error::StoreUnavailable("corrupt tier counter".into())
            })?;
            Ok(u64::from_be_bytes(bytes))
        }
    }
}

/// Failure inside one transaction attempt.
enum TxnError {
    Rocks(rocksdb::Error),
    Waitlist(waitlist_core::Error),
}

impl TxnError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            TxnError::Rocks(e)
                if matches!(e.kind(), ErrorKind::Busy | ErrorKind::TimedOut | ErrorKind::TryAgain)
        )
    }
}

impl From<rocksdb::Error> for TxnError {
    fn from(e: rocksdb::Error) -> Self {
        TxnError::Rocks(e)
    }
}

impl From<waitlist_core::Error> for TxnError {
    fn from(e: waitlist_core::Error) -> Self {
        TxnError::Waitlist(e)
    }
}

impl From<serde_json::Error> for TxnError {
    fn from(e: serde_json::Error) -> Self {
        TxnError::Waitlist(e.into())
    }
}

impl From<TxnError> for waitlist_core::Error {
    fn from(e: TxnError) -> Self {
        match e {
            TxnError::Rocks(e) => unavailable(e),
            TxnError::Waitlist(e) => e,
        }
    }
}

fn unavailable(e: rocksdb::Error) -> waitlist_core::Error {
    waitlist_core::Error::StoreUnavailable(e.to_string())
}

/// Storage backend for waitlist data.
pub struct Storage {
    db: TransactionDB,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(LOCK_TIMEOUT_MS);
        let db = TransactionDB::open(&opts, &txn_opts, path)?;
        Ok(Self { db })
    }

    fn read_entry(&self, external_id: &str) -> waitlist_core::Result<Option<WaitlistEntry>> {
        match self.db.get(entry_key(external_id)).map_err(unavailable)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// All entries, in key order.
    fn scan_entries(&self) -> waitlist_core::Result<Vec<WaitlistEntry>> {
        let prefix = ENTRY_PREFIX.as_bytes();
        let mut entries = Vec::new();

        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(unavailable)?;
            if key.starts_with(prefix) {
                entries.push(serde_json::from_slice(&value)?);
            } else {
                break;
            }
        }

        Ok(entries)
    }

    /// Run `op` in a fresh transaction, retrying lock timeouts a bounded number of times.
    fn in_transaction<T>(
        &self,
        op: impl Fn(&Transaction<'_, TransactionDB>) -> std::result::Result<T, TxnError>,
    ) -> waitlist_core::Result<T> {
        let mut attempt = 1;
        loop {
            let txn = self.db.transaction();
            let result = op(&txn).and_then(|value| {
                txn.commit()?;
                Ok(value)
            });
            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < MAX_TXN_ATTEMPTS => {
                    tracing::warn!(attempt, "storage transaction contended, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn create(
        &self,
        entry: &WaitlistEntry,
        allocate: Option<&dyn Fn(u64) -> u32>,
    ) -> waitlist_core::Result<CreateOutcome> {
        let entry_key = entry_key(&entry.external_id);
        let code_key = code_key(&entry.referral_code);
        let tier_key = tier_key(entry.tier);

        self.in_transaction(|txn| {
            if let Some(existing) = txn.get_for_update(&entry_key, true)? {
                return Ok(CreateOutcome::AlreadyExists(serde_json::from_slice(&existing)?));
            }
            if txn.get_for_update(&code_key, true)?.is_some() {
                return Ok(CreateOutcome::CodeTaken);
            }
            let in_tier = decode_count(txn.get_for_update(&tier_key, true)?)?;

            let mut entry = entry.clone();
            if let Some(allocate) = allocate {
                entry.position = allocate(in_tier);
            }
            txn.put(&entry_key, serde_json::to_vec(&entry)?)?;
            txn.put(&code_key, entry.external_id.as_bytes())?;
            txn.put(&tier_key, (in_tier + 1).to_be_bytes())?;
            Ok(CreateOutcome::Created(entry))
        })
    }
}

impl WaitlistStore for Storage {
    fn get_by_field(&self, field: Field, value: &str) -> waitlist_core::Result<Option<WaitlistEntry>> {
        match field {
            Field::ExternalId => self.read_entry(value),
            Field::ReferralCode => match self.db.get(code_key(value)).map_err(unavailable)? {
                Some(owner) => self.read_entry(&String::from_utf8_lossy(&owner)),
                None => Ok(None),
            },
            Field::Tier => Ok(self
                .scan_entries()?
                .into_iter()
                .find(|e| field.matches(e, value))),
        }
    }

    fn count_by_field(&self, field: Field, value: &str) -> waitlist_core::Result<u64> {
        let key = match field {
            Field::ExternalId => entry_key(value),
            Field::ReferralCode => code_key(value),
            Field::Tier => {
                return decode_count(
                    self.db.get(tier_key(Tier::parse(value))).map_err(unavailable)?,
                )
            }
        };
        Ok(u64::from(self.db.get(key).map_err(unavailable)?.is_some()))
    }

    fn create_if_absent(&self, entry: WaitlistEntry) -> waitlist_core::Result<CreateOutcome> {
        self.create(&entry, None)
    }

    fn create_allocated(
        &self,
        entry: WaitlistEntry,
        allocate: &dyn Fn(u64) -> u32,
    ) -> waitlist_core::Result<CreateOutcome> {
        self.create(&entry, Some(allocate))
    }

    fn atomic_adjust_many(
        &self,
        external_id: &str,
        adjustments: &[Adjustment],
    ) -> waitlist_core::Result<Vec<i64>> {
        let key = entry_key(external_id);
        self.in_transaction(|txn| {
            let raw = txn.get_for_update(&key, true)?.ok_or_else(|| {
                waitlist_core::Error::NotFound(format!("entry {}", external_id))
            })?;
            let mut entry: WaitlistEntry = serde_json::from_slice(&raw)?;
            let values = adjustments.iter().map(|a| a.apply(&mut entry)).collect();
            txn.put(&key, serde_json::to_vec(&entry)?)?;
            Ok(values)
        })
    }

    fn list_ordered_by(
        &self,
        order: OrderBy,
        ascending: bool,
    ) -> waitlist_core::Result<Vec<WaitlistEntry>> {
        let mut entries = self.scan_entries()?;
        sort_entries(&mut entries, order, ascending);
        Ok(entries)
    }

    fn backend_name(&self) -> &'static str {
        "rocksdb"
    }
}
