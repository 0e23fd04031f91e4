// condenser/core/execution/src/settlement.rs

// Fund routing after a contract invocation.
//
// A reverted invocation refunds the value it carried. A successful one either
// does nothing, hands the funding output to the contract, or condenses every
// balance change into one ledger transaction.
use crate::state::{ContractState, StateError};
use crate::types::InternalTransfer;
use condenser_primitives::{
    Address, Invocation, Money, OutPoint, Script, Transaction, TxIn, TxOut, UnspentOutput,
};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("Insufficient balance at {address}: need {needed}, have {available}")]
    InsufficientBalance {
        address: Address,
        needed: Money,
        available: Money,
    },

    #[error("Balance overflow at {0}")]
    Overflow(Address),

    #[error("Condensing transaction does not balance: inputs {inputs}, outputs {outputs}")]
    Imbalance { inputs: Money, outputs: Money },

    #[error(transparent)]
    State(#[from] StateError),
}

/// Which success path settlement took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// No value arrived and none left
    Nothing,
    /// The contract now owns the funding output
    BalanceAssigned(UnspentOutput),
    /// All movements were folded into a condensing transaction
    Condensed(Transaction),
}

impl Settlement {
    pub fn path(&self) -> &'static str {
        match self {
            Settlement::Nothing => "nothing",
            Settlement::BalanceAssigned(_) => "balance_assigned",
            Settlement::Condensed(_) => "condensed",
        }
    }

    pub fn into_transaction(self) -> Option<Transaction> {
        match self {
            Settlement::Condensed(tx) => Some(tx),
            _ => None,
        }
    }
}

/// Returns the value of a reverted invocation to its sender.
///
/// Spends the funding output and pays exactly `invocation.value` to the
/// sender's public-key hash. `None` when no value was sent.
pub fn refund_transaction(invocation: &Invocation) -> Option<Transaction> {
    if invocation.value == 0 {
        return None;
    }

    Some(Transaction::new(
        vec![TxIn::contract_spend(invocation.funding)],
        vec![TxOut {
            value: invocation.value,
            script_pubkey: Script::pay_to_pubkey_hash(&invocation.sender),
        }],
    ))
}

/// Settles a successful invocation against `state`.
///
/// Cases are checked in order; a first funding of a contract with no
/// transfers must become a plain balance assignment, not a condensing
/// transaction.
pub fn settle<S: ContractState + ?Sized>(
    state: &mut S,
    invocation: &Invocation,
    contract: Address,
    transfers: &[InternalTransfer],
) -> Result<Settlement, SettlementError> {
    // Zero-value transfers move nothing and never reach the ledger
    let transfers: Vec<InternalTransfer> =
        transfers.iter().filter(|t| t.value > 0).copied().collect();

    if invocation.value == 0 && transfers.is_empty() {
        return Ok(Settlement::Nothing);
    }

    if transfers.is_empty() && state.get_unspent(&contract)?.is_none() {
        let unspent = UnspentOutput {
            hash: invocation.funding.hash,
            n: invocation.funding.n,
            value: invocation.value,
        };
        state.set_unspent(contract, unspent)?;
        debug!(%contract, value = invocation.value, "Assigned funding output to contract");
        return Ok(Settlement::BalanceAssigned(unspent));
    }

    let incoming = (invocation.value > 0).then_some((invocation.funding, invocation.value));
    let tx = CondensingTransaction::new(contract, incoming).build(state, &transfers)?;
    Ok(Settlement::Condensed(tx))
}

/// Builder for the transaction that condenses an invocation's balance changes.
///
/// Every contract touched by a transfer has its current unspent output
/// spent, so each contract ends with at most one unspent output. Outputs
/// follow the order recipients first appear in the transfer list, followed
/// by remaining change.
pub struct CondensingTransaction {
    contract: Address,
    incoming: Option<(OutPoint, Money)>,
    inputs: Vec<TxIn>,
    total_in: Money,
    balances: BTreeMap<Address, Money>,
    /// Addresses whose unspent output has been looked up, in lookup order
    loaded: Vec<Address>,
    /// Contracts whose previous unspent output is spent here
    spent: Vec<Address>,
    recipients: Vec<Address>,
}

impl CondensingTransaction {
    pub fn new(contract: Address, incoming: Option<(OutPoint, Money)>) -> Self {
        Self {
            contract,
            incoming,
            inputs: Vec::new(),
            total_in: 0,
            balances: BTreeMap::new(),
            loaded: Vec::new(),
            spent: Vec::new(),
            recipients: Vec::new(),
        }
    }

    pub fn build<S: ContractState + ?Sized>(
        mut self,
        state: &mut S,
        transfers: &[InternalTransfer],
    ) -> Result<Transaction, SettlementError> {
        let contract = self.contract;
        self.load(state, contract)?;

        if let Some((outpoint, value)) = self.incoming {
            self.inputs.push(TxIn::contract_spend(outpoint));
            self.total_in = self
                .total_in
                .checked_add(value)
                .ok_or(SettlementError::Overflow(contract))?;
            self.credit(contract, value)?;
        }

        for transfer in transfers {
            self.load(state, transfer.from)?;
            self.load(state, transfer.to)?;
            self.debit(transfer.from, transfer.value)?;
            self.credit(transfer.to, transfer.value)?;
            if !self.recipients.contains(&transfer.to) {
                self.recipients.push(transfer.to);
            }
        }

        let mut order: Vec<Address> = Vec::with_capacity(self.loaded.len());
        for address in self.recipients.iter().chain(self.loaded.iter()) {
            if !order.contains(address) {
                order.push(*address);
            }
        }

        let mut outputs = Vec::new();
        let mut owners = Vec::new();
        for address in order {
            let amount = self.balances.get(&address).copied().unwrap_or(0);
            if amount == 0 {
                continue;
            }
            let is_contract = state.get_code(&address)?.is_some();
            let script_pubkey = if is_contract {
                Script::contract_transfer(&address)
            } else {
                Script::pay_to_pubkey_hash(&address)
            };
            outputs.push(TxOut {
                value: amount,
                script_pubkey,
            });
            owners.push((address, is_contract));
        }

        let tx = Transaction::new(self.inputs, outputs);
        let total_out = tx.total_output();
        if total_out != self.total_in {
            return Err(SettlementError::Imbalance {
                inputs: self.total_in,
                outputs: total_out,
            });
        }

        let hash = tx.hash();
        for (n, ((address, is_contract), output)) in owners.iter().zip(&tx.outputs).enumerate() {
            if *is_contract {
                state.set_unspent(
                    *address,
                    UnspentOutput {
                        hash,
                        n: n as u32,
                        value: output.value,
                    },
                )?;
            }
        }
        for address in &self.spent {
            let still_holds = owners.iter().any(|(a, c)| a == address && *c);
            if !still_holds {
                state.clear_unspent(*address)?;
            }
        }

        debug!(
            %contract,
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            value = total_out,
            "Built condensing transaction"
        );
        Ok(tx)
    }

    fn load<S: ContractState + ?Sized>(
        &mut self,
        state: &S,
        address: Address,
    ) -> Result<(), SettlementError> {
        if self.loaded.contains(&address) {
            return Ok(());
        }
        self.loaded.push(address);

        if let Some(unspent) = state.get_unspent(&address)? {
            self.inputs.push(TxIn::contract_spend(unspent.outpoint()));
            self.total_in = self
                .total_in
                .checked_add(unspent.value)
                .ok_or(SettlementError::Overflow(address))?;
            self.credit(address, unspent.value)?;
            self.spent.push(address);
        }
        Ok(())
    }

    fn credit(&mut self, address: Address, value: Money) -> Result<(), SettlementError> {
        let balance = self.balances.entry(address).or_insert(0);
        *balance = balance
            .checked_add(value)
            .ok_or(SettlementError::Overflow(address))?;
        Ok(())
    }

    fn debit(&mut self, address: Address, value: Money) -> Result<(), SettlementError> {
        let available = self.balances.get(&address).copied().unwrap_or(0);
        if available < value {
            return Err(SettlementError::InsufficientBalance {
                address,
                needed: value,
                available,
            });
        }
        self.balances.insert(address, available - value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AccountRecord, StateDB, StateRepository};
    use condenser_primitives::{CallInvocation, Gas, Hash, InvocationKind};

    const CONTRACT: Address = Address([0xC0; 20]);
    const SENDER: Address = Address([0x01; 20]);

    fn invocation(value: Money) -> Invocation {
        Invocation {
            sender: SENDER,
            value,
            gas_limit: Gas::new(100_000),
            gas_price: 1,
            funding: OutPoint::new(Hash::new([0xF0; 32]), 2),
            kind: InvocationKind::Call(CallInvocation {
                contract: CONTRACT,
                method: "Pay".into(),
                params: vec![],
            }),
        }
    }

    fn contract_with_balance(db: &StateDB, address: Address, balance: Option<Money>) {
        db.insert_account(
            address,
            AccountRecord {
                code: Some(vec![0xAA]),
                unspent: balance.map(|value| UnspentOutput {
                    hash: Hash::new([address.0[0]; 32]),
                    n: 0,
                    value,
                }),
                ..AccountRecord::default()
            },
        );
    }

    fn transfer(from: Address, to: Address, value: Money) -> InternalTransfer {
        InternalTransfer { from, to, value }
    }

    #[test]
    fn test_refund_pays_exact_value_to_sender() {
        let inv = invocation(75);
        let refund = refund_transaction(&inv).unwrap();
        assert_eq!(refund.inputs.len(), 1);
        assert_eq!(refund.inputs[0].prevout, inv.funding);
        assert!(refund.inputs[0].script_sig.is_spend());
        assert_eq!(refund.outputs.len(), 1);
        assert_eq!(refund.outputs[0].value, 75);
        assert_eq!(refund.outputs[0].script_pubkey.pubkey_hash(), Some(SENDER));
    }

    #[test]
    fn test_no_refund_without_value() {
        assert!(refund_transaction(&invocation(0)).is_none());
    }

    #[test]
    fn test_nothing_to_settle() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, Some(40));
        let mut state = db.start_tracking();

        let settlement = settle(&mut state, &invocation(0), CONTRACT, &[]).unwrap();
        assert_eq!(settlement, Settlement::Nothing);
        assert_eq!(state.dirty_accounts(), 0);
    }

    #[test]
    fn test_zero_value_transfers_settle_nothing() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, None);
        let mut state = db.start_tracking();
        let alice = Address([0xA1; 20]);

        let settlement = settle(
            &mut state,
            &invocation(0),
            CONTRACT,
            &[transfer(CONTRACT, alice, 0), transfer(CONTRACT, SENDER, 0)],
        )
        .unwrap();
        assert_eq!(settlement, Settlement::Nothing);
        assert_eq!(state.dirty_accounts(), 0);
    }

    #[test]
    fn test_zero_value_transfers_ignored_on_first_funding() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, None);
        let mut state = db.start_tracking();

        let settlement = settle(
            &mut state,
            &invocation(25),
            CONTRACT,
            &[transfer(CONTRACT, SENDER, 0)],
        )
        .unwrap();
        assert_eq!(settlement.path(), "balance_assigned");
    }

    #[test]
    fn test_first_funding_assigns_balance() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, None);
        let mut state = db.start_tracking();
        let inv = invocation(100);

        let settlement = settle(&mut state, &inv, CONTRACT, &[]).unwrap();
        let expected = UnspentOutput {
            hash: inv.funding.hash,
            n: 2,
            value: 100,
        };
        assert_eq!(settlement, Settlement::BalanceAssigned(expected));
        assert_eq!(state.get_unspent(&CONTRACT).unwrap(), Some(expected));
    }

    #[test]
    fn test_funding_with_prior_balance_condenses() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, Some(40));
        let mut state = db.start_tracking();

        let tx = settle(&mut state, &invocation(60), CONTRACT, &[])
            .unwrap()
            .into_transaction()
            .unwrap();
        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].value, 100);
        assert_eq!(tx.outputs[0].script_pubkey.contract_address(), Some(CONTRACT));

        let unspent = state.get_unspent(&CONTRACT).unwrap().unwrap();
        assert_eq!(unspent.hash, tx.hash());
        assert_eq!(unspent.value, 100);
    }

    #[test]
    fn test_transfers_ordered_with_change_last() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, Some(50));
        let mut state = db.start_tracking();
        let alice = Address([0xA1; 20]);
        let bob = Address([0xB0; 20]);

        let tx = settle(
            &mut state,
            &invocation(0),
            CONTRACT,
            &[transfer(CONTRACT, alice, 10), transfer(CONTRACT, bob, 20)],
        )
        .unwrap()
        .into_transaction()
        .unwrap();

        assert_eq!(tx.inputs.len(), 1);
        let values: Vec<Money> = tx.outputs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![10, 20, 20]);
        assert_eq!(tx.outputs[0].script_pubkey.pubkey_hash(), Some(alice));
        assert_eq!(tx.outputs[1].script_pubkey.pubkey_hash(), Some(bob));
        assert_eq!(tx.outputs[2].script_pubkey.contract_address(), Some(CONTRACT));
        assert_eq!(
            state.get_unspent(&CONTRACT).unwrap(),
            Some(UnspentOutput {
                hash: tx.hash(),
                n: 2,
                value: 20
            })
        );
    }

    #[test]
    fn test_spending_everything_clears_unspent() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, Some(30));
        let mut state = db.start_tracking();

        let tx = settle(
            &mut state,
            &invocation(0),
            CONTRACT,
            &[transfer(CONTRACT, SENDER, 30)],
        )
        .unwrap()
        .into_transaction()
        .unwrap();

        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(state.get_unspent(&CONTRACT).unwrap(), None);
    }

    #[test]
    fn test_repeated_recipient_aggregated() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, None);
        let mut state = db.start_tracking();
        let alice = Address([0xA1; 20]);

        let tx = settle(
            &mut state,
            &invocation(50),
            CONTRACT,
            &[transfer(CONTRACT, alice, 5), transfer(CONTRACT, alice, 7)],
        )
        .unwrap()
        .into_transaction()
        .unwrap();

        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].prevout, invocation(50).funding);
        let values: Vec<Money> = tx.outputs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![12, 38]);
    }

    #[test]
    fn test_contract_recipient_balance_merged() {
        let db = StateDB::new();
        let other = Address([0xD0; 20]);
        contract_with_balance(&db, CONTRACT, Some(50));
        contract_with_balance(&db, other, Some(5));
        let mut state = db.start_tracking();

        let tx = settle(
            &mut state,
            &invocation(0),
            CONTRACT,
            &[transfer(CONTRACT, other, 15)],
        )
        .unwrap()
        .into_transaction()
        .unwrap();

        // Both previous outputs are spent
        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.outputs[0].value, 20);
        assert_eq!(tx.outputs[0].script_pubkey.contract_address(), Some(other));
        assert_eq!(tx.outputs[1].value, 35);
        assert_eq!(state.get_unspent(&other).unwrap().unwrap().value, 20);
        assert_eq!(state.get_unspent(&CONTRACT).unwrap().unwrap().n, 1);
    }

    #[test]
    fn test_overdraft_rejected() {
        let db = StateDB::new();
        contract_with_balance(&db, CONTRACT, Some(10));
        let mut state = db.start_tracking();

        let err = settle(
            &mut state,
            &invocation(0),
            CONTRACT,
            &[transfer(CONTRACT, SENDER, 11)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            SettlementError::InsufficientBalance {
                address: CONTRACT,
                needed: 11,
                available: 10,
            }
        );
    }
}
