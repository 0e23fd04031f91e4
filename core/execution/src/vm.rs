// condenser/core/execution/src/vm.rs

// Boundary with the contract virtual machine
use crate::context::ExecutionContext;
use crate::gas::GasMeter;
use crate::state::{ContractState, StateError};
use crate::types::{ExecutionError, InternalTransfer};

/// What a successful VM run hands back to the executor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmOutput {
    pub return_value: Option<Vec<u8>>,
    /// Transfers in the order the contract made them
    pub transfers: Vec<InternalTransfer>,
}

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// The contract failed; the invocation reverts
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The storage engine failed underneath the VM
    #[error(transparent)]
    State(#[from] StateError),
}

/// Sandboxed contract virtual machine.
///
/// Implementations meter work through `gas` and persist contract state only
/// through `state`; they never touch durable storage directly.
pub trait ContractVm: Send + Sync {
    /// Run the constructor of freshly submitted `code`
    fn create(
        &self,
        state: &mut dyn ContractState,
        code: &[u8],
        context: &ExecutionContext,
        gas: &mut GasMeter,
    ) -> Result<VmOutput, VmError>;

    /// Run `method` of stored `code`
    fn call(
        &self,
        state: &mut dyn ContractState,
        code: &[u8],
        method: &str,
        context: &ExecutionContext,
        gas: &mut GasMeter,
    ) -> Result<VmOutput, VmError>;
}
