// condenser/core/execution/src/state/state_db.rs

// In-memory state database with copy-on-write tracked snapshots
use crate::state::{ContractState, StateError, StateRepository};
use condenser_primitives::{Address, Hash, UnspentOutput};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Everything the ledger stores for one contract address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub code: Option<Vec<u8>>,
    pub unspent: Option<UnspentOutput>,
    pub storage: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// Durable contract state
#[derive(Clone, Default)]
pub struct StateDB {
    accounts: Arc<DashMap<Address, AccountRecord>>,

    /// Serializes commits so no reader sees half of one snapshot's records.
    /// Commits replace whole account records and the last writer wins;
    /// detecting conflicting snapshots is left to the host.
    commit_lock: Arc<Mutex<()>>,
}

impl StateDB {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a durable account record
    pub fn get_account(&self, address: &Address) -> Option<AccountRecord> {
        self.accounts.get(address).map(|r| r.clone())
    }

    /// Write an account record directly, bypassing tracking
    pub fn insert_account(&self, address: Address, record: AccountRecord) {
        self.accounts.insert(address, record);
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Commitment to the full durable state
    pub fn state_root(&self) -> Result<Hash, StateError> {
        use sha3::{Digest, Keccak256};

        let ordered: BTreeMap<Address, AccountRecord> = self
            .accounts
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();

        let mut hasher = Keccak256::new();
        for (address, record) in &ordered {
            let encoded =
                bincode::serialize(record).map_err(|e| StateError::Encoding(e.to_string()))?;
            hasher.update(address.as_bytes());
            hasher.update((encoded.len() as u64).to_le_bytes());
            hasher.update(&encoded);
        }
        Ok(Hash::new(hasher.finalize().into()))
    }
}

impl StateRepository for StateDB {
    type Snapshot = TrackedState;

    fn start_tracking(&self) -> TrackedState {
        TrackedState {
            db: self.clone(),
            overlay: BTreeMap::new(),
            finished: false,
        }
    }
}

/// Tracked view over a [`StateDB`].
///
/// Modified accounts are copied into the overlay on first write; the durable
/// map is only touched by `commit`.
pub struct TrackedState {
    db: StateDB,
    overlay: BTreeMap<Address, AccountRecord>,
    finished: bool,
}

impl TrackedState {
    fn read(&self, address: &Address) -> Option<AccountRecord> {
        match self.overlay.get(address) {
            Some(record) => Some(record.clone()),
            None => self.db.get_account(address),
        }
    }

    fn record_mut(&mut self, address: Address) -> &mut AccountRecord {
        let db = &self.db;
        self.overlay
            .entry(address)
            .or_insert_with(|| db.get_account(&address).unwrap_or_default())
    }

    /// Number of accounts touched so far
    pub fn dirty_accounts(&self) -> usize {
        self.overlay.len()
    }
}

impl ContractState for TrackedState {
    fn account_exists(&self, address: &Address) -> Result<bool, StateError> {
        Ok(self.overlay.contains_key(address) || self.db.accounts.contains_key(address))
    }

    fn create_account(&mut self, address: Address) -> Result<(), StateError> {
        if self.account_exists(&address)? {
            return Err(StateError::AccountExists(address));
        }
        self.overlay.insert(address, AccountRecord::default());
        Ok(())
    }

    fn get_code(&self, address: &Address) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.read(address).and_then(|r| r.code))
    }

    fn set_code(&mut self, address: Address, code: Vec<u8>) -> Result<(), StateError> {
        if !self.account_exists(&address)? {
            return Err(StateError::AccountNotFound(address));
        }
        self.record_mut(address).code = Some(code);
        Ok(())
    }

    fn get_storage(&self, address: &Address, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self
            .overlay
            .get(address)
            .map(|r| r.storage.get(key).cloned())
            .unwrap_or_else(|| {
                self.db
                    .accounts
                    .get(address)
                    .and_then(|r| r.storage.get(key).cloned())
            }))
    }

    fn set_storage(
        &mut self,
        address: Address,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(), StateError> {
        self.record_mut(address).storage.insert(key, value);
        Ok(())
    }

    fn get_unspent(&self, address: &Address) -> Result<Option<UnspentOutput>, StateError> {
        Ok(self.read(address).and_then(|r| r.unspent))
    }

    fn set_unspent(&mut self, address: Address, unspent: UnspentOutput) -> Result<(), StateError> {
        self.record_mut(address).unspent = Some(unspent);
        Ok(())
    }

    fn clear_unspent(&mut self, address: Address) -> Result<(), StateError> {
        self.record_mut(address).unspent = None;
        Ok(())
    }

    fn commit(mut self) -> Result<(), StateError> {
        let overlay = std::mem::take(&mut self.overlay);
        let _guard = self.db.commit_lock.lock();
        let changed = overlay.len();
        for (address, record) in overlay {
            self.db.accounts.insert(address, record);
        }
        self.finished = true;
        debug!(changed, "Tracked state committed");
        Ok(())
    }

    fn rollback(mut self) -> Result<(), StateError> {
        let discarded = self.overlay.len();
        self.overlay.clear();
        self.finished = true;
        debug!(discarded, "Tracked state rolled back");
        Ok(())
    }
}

impl Drop for TrackedState {
    fn drop(&mut self) {
        if !self.finished && !self.overlay.is_empty() {
            debug!(
                discarded = self.overlay.len(),
                "Tracked state dropped without commit"
            );
        }
    }
}
