// condenser/core/primitives/src/transaction.rs

// UTXO transaction types and their consensus encoding
use crate::types::{Address, Hash, Money};
use serde::{Deserialize, Serialize};

/// Script opcodes used by settlement transactions
pub mod opcodes {
    pub const OP_DUP: u8 = 0x76;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_PUSH20: u8 = 0x14;

    pub const OP_CREATECONTRACT: u8 = 0xc0;
    pub const OP_CALLCONTRACT: u8 = 0xc1;
    /// Marks an input spent by the contract executor rather than a signature
    pub const OP_SPEND: u8 = 0xc2;
    /// Marks an output holding a contract's balance
    pub const OP_INTERNALCONTRACTTRANSFER: u8 = 0xc3;
}

use opcodes::*;

/// Reference to a transaction output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub n: u32,
}

impl OutPoint {
    pub fn new(hash: Hash, n: u32) -> Self {
        Self { hash, n }
    }
}

/// Locking or unlocking script
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Standard pay-to-pubkey-hash locking script
    pub fn pay_to_pubkey_hash(address: &Address) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(OP_DUP);
        bytes.push(OP_HASH160);
        bytes.push(OP_PUSH20);
        bytes.extend_from_slice(address.as_bytes());
        bytes.push(OP_EQUALVERIFY);
        bytes.push(OP_CHECKSIG);
        Self(bytes)
    }

    /// Locking script for an output owned by a contract
    pub fn contract_transfer(contract: &Address) -> Self {
        let mut bytes = Vec::with_capacity(22);
        bytes.push(OP_INTERNALCONTRACTTRANSFER);
        bytes.push(OP_PUSH20);
        bytes.extend_from_slice(contract.as_bytes());
        Self(bytes)
    }

    /// Unlocking script for inputs spent by the executor
    pub fn spend() -> Self {
        Self(vec![OP_SPEND])
    }

    pub fn is_spend(&self) -> bool {
        self.0 == [OP_SPEND]
    }

    /// Recipient of a pay-to-pubkey-hash script
    pub fn pubkey_hash(&self) -> Option<Address> {
        match self.0.as_slice() {
            [OP_DUP, OP_HASH160, OP_PUSH20, rest @ ..] if rest.len() == 22 => {
                if rest[20] != OP_EQUALVERIFY || rest[21] != OP_CHECKSIG {
                    return None;
                }
                let mut addr = [0u8; 20];
                addr.copy_from_slice(&rest[..20]);
                Some(Address(addr))
            }
            _ => None,
        }
    }

    /// Contract owning a contract-transfer script
    pub fn contract_address(&self) -> Option<Address> {
        match self.0.as_slice() {
            [OP_INTERNALCONTRACTTRANSFER, OP_PUSH20, rest @ ..] if rest.len() == 20 => {
                let mut addr = [0u8; 20];
                addr.copy_from_slice(rest);
                Some(Address(addr))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxIn {
    /// Input spent by the executor on behalf of a contract
    pub fn contract_spend(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Script::spend(),
            sequence: u32::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Money,
    pub script_pubkey: Script,
}

/// Ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Transaction id over the consensus encoding
    pub fn hash(&self) -> Hash {
        Hash::double_sha256(&self.encode())
    }

    pub fn total_output(&self) -> Money {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Consensus encoding: little-endian integers, compact-size lengths
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());

        write_compact_size(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(input.prevout.hash.as_bytes());
            buf.extend_from_slice(&input.prevout.n.to_le_bytes());
            write_script(&mut buf, &input.script_sig);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_compact_size(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            write_script(&mut buf, &output.script_pubkey);
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }
}

fn write_script(buf: &mut Vec<u8>, script: &Script) {
    write_compact_size(buf, script.as_bytes().len() as u64);
    buf.extend_from_slice(script.as_bytes());
}

fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Unspent output owned by a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub hash: Hash,
    pub n: u32,
    pub value: Money,
}

impl UnspentOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.hash, self.n)
    }
}
