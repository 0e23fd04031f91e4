// condenser/core/execution/src/types.rs

// Types for representing execution outcomes and failures
use crate::settlement::SettlementError;
use crate::state::StateError;
use crate::validation::ValidationViolation;
use condenser_primitives::{Address, Gas, Money, Transaction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value moved out of a contract by contract logic during execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalTransfer {
    pub from: Address,
    pub to: Address,
    pub value: Money,
}

/// Reason an invocation reverted.
///
/// Every variant ends up in a well-formed [`ExecutionResult`]; none of them is
/// ever returned past the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ExecutionError {
    #[error("Out of gas: requested {requested}, available {available}")]
    OutOfGas { requested: Gas, available: Gas },

    #[error("Contract validation failed with {} violation(s)", .0.len())]
    ValidationFailed(Vec<ValidationViolation>),

    #[error("Contract does not exist: {0}")]
    ContractNotFound(Address),

    #[error("Execution reverted: {0}")]
    Reverted(String),

    #[error("Internal fault: {0}")]
    Fault(String),
}

/// Unexpected failure inside the pipeline.
///
/// Caught once at the executor boundary, where the tracked state is discarded
/// and a best-effort result is produced instead.
#[derive(Debug, thiserror::Error)]
pub enum Defect {
    #[error("base fee could not be charged: {0}")]
    BaseFee(ExecutionError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("successful creation did not record a contract address")]
    MissingContractAddress,
}

/// Lifecycle position of an invocation inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    Created,
    PreExecuting,
    Executing,
    PostExecuting,
    Done,
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStage::Created => "created",
            ExecutionStage::PreExecuting => "pre-executing",
            ExecutionStage::Executing => "executing",
            ExecutionStage::PostExecuting => "post-executing",
            ExecutionStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of one contract invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub revert: bool,
    pub new_contract_address: Option<Address>,
    pub transfers: Vec<InternalTransfer>,
    /// Refund or condensing transaction produced by settlement
    pub internal_transaction: Option<Transaction>,
    pub gas_consumed: Gas,
    pub return_value: Option<Vec<u8>>,
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    pub fn success(
        return_value: Option<Vec<u8>>,
        transfers: Vec<InternalTransfer>,
        gas_consumed: Gas,
    ) -> Self {
        Self {
            revert: false,
            new_contract_address: None,
            transfers,
            internal_transaction: None,
            gas_consumed,
            return_value,
            error: None,
        }
    }

    pub fn reverted(error: ExecutionError, gas_consumed: Gas) -> Self {
        Self {
            revert: true,
            new_contract_address: None,
            transfers: Vec::new(),
            internal_transaction: None,
            gas_consumed,
            return_value: None,
            error: Some(error),
        }
    }

    pub fn validation_failed(violations: Vec<ValidationViolation>, gas_consumed: Gas) -> Self {
        Self::reverted(ExecutionError::ValidationFailed(violations), gas_consumed)
    }

    pub fn contract_not_found(address: Address, gas_consumed: Gas) -> Self {
        Self::reverted(ExecutionError::ContractNotFound(address), gas_consumed)
    }

    /// Result reported when the pipeline hit a defect
    pub fn aborted(defect: &Defect, gas_consumed: Gas) -> Self {
        let error = match defect {
            Defect::BaseFee(e) => e.clone(),
            other => ExecutionError::Fault(other.to_string()),
        };
        Self::reverted(error, gas_consumed)
    }

    pub fn is_out_of_gas(&self) -> bool {
        matches!(self.error, Some(ExecutionError::OutOfGas { .. }))
    }

    /// Short label for logs and metrics
    pub fn outcome(&self) -> &'static str {
        match &self.error {
            None => "success",
            Some(ExecutionError::OutOfGas { .. }) => "out_of_gas",
            Some(ExecutionError::ValidationFailed(_)) => "validation_failed",
            Some(ExecutionError::ContractNotFound(_)) => "contract_not_found",
            Some(ExecutionError::Reverted(_)) => "reverted",
            Some(ExecutionError::Fault(_)) => "fault",
        }
    }
}
