// condenser/core/execution/src/state/mod.rs

// State management module
// Transactional access to contract accounts, code, storage and balances

pub mod state_db;

pub use state_db::{AccountRecord, StateDB, TrackedState};

use condenser_primitives::{Address, UnspentOutput};

/// Storage engine failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Account already exists: {0}")]
    AccountExists(Address),

    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Isolated, mutable view over contract state for one invocation.
///
/// Nothing written through a snapshot reaches the durable store before
/// [`commit`](ContractState::commit). A snapshot that is rolled back, or
/// dropped without being committed, leaves the durable store unchanged.
///
/// Only [`create_account`](ContractState::create_account) and
/// [`set_code`](ContractState::set_code) care about account existence: code
/// can only be installed on an account created first. Storage and unspent
/// writers materialize an empty record for an unknown address.
pub trait ContractState {
    fn account_exists(&self, address: &Address) -> Result<bool, StateError>;

    /// Fails with [`StateError::AccountExists`] if the address is taken
    fn create_account(&mut self, address: Address) -> Result<(), StateError>;

    fn get_code(&self, address: &Address) -> Result<Option<Vec<u8>>, StateError>;

    fn set_code(&mut self, address: Address, code: Vec<u8>) -> Result<(), StateError>;

    fn get_storage(&self, address: &Address, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;

    fn set_storage(
        &mut self,
        address: Address,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(), StateError>;

    fn get_unspent(&self, address: &Address) -> Result<Option<UnspentOutput>, StateError>;

    fn set_unspent(&mut self, address: Address, unspent: UnspentOutput) -> Result<(), StateError>;

    fn clear_unspent(&mut self, address: Address) -> Result<(), StateError>;

    /// Publish every change to the durable store.
    ///
    /// On failure nothing is published and the snapshot is spent.
    fn commit(self) -> Result<(), StateError>
    where
        Self: Sized;

    /// Discard every change
    fn rollback(self) -> Result<(), StateError>
    where
        Self: Sized;
}

/// Source of tracked snapshots
pub trait StateRepository {
    type Snapshot: ContractState;

    fn start_tracking(&self) -> Self::Snapshot;
}
