// condenser/core/execution/src/address_utils.rs

// Contract address derivation
use condenser_primitives::{Address, Invocation};
use sha3::{Digest, Keccak256};

/// Derives the address of a contract created by an invocation
pub trait AddressGenerator: Send + Sync {
    fn contract_address(&self, invocation: &Invocation) -> Address;
}

/// `keccak256(sender || funding hash || funding index)`, last 20 bytes.
///
/// The funding outpoint is unique per ledger output, so two creations never
/// share an address.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakAddressGenerator;

impl AddressGenerator for KeccakAddressGenerator {
    fn contract_address(&self, invocation: &Invocation) -> Address {
        let mut hasher = Keccak256::default();
        hasher.update(invocation.sender.as_bytes());
        hasher.update(invocation.funding.hash.as_bytes());
        hasher.update(invocation.funding.n.to_le_bytes());
        let hash = hasher.finalize();

        let mut addr = [0u8; 20];
        addr.copy_from_slice(&hash[12..32]);
        Address(addr)
    }
}
