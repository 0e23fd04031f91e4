// condenser/core/execution/src/context.rs

// Facts visible to the virtual machine for one invocation
use condenser_primitives::{Address, Gas, Invocation, MethodParameter, Money};
use serde::{Deserialize, Serialize};

/// Block the invocation is executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub coinbase: Address,
}

impl BlockInfo {
    pub fn new(height: u64, coinbase: Address) -> Self {
        Self { height, coinbase }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Contract receiving the message
    pub contract_address: Address,
    pub sender: Address,
    pub value: Money,
    pub gas_limit: Gas,
}

/// Execution context for a contract invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub block: BlockInfo,
    pub message: Message,
    pub gas_price: Money,
    /// `None` when running a constructor
    pub method_name: Option<String>,
    pub parameters: Vec<MethodParameter>,
}

impl ExecutionContext {
    /// Builds the context for `invocation` addressed to `contract_address`.
    ///
    /// Pure: the same inputs always produce an equal context.
    pub fn build(block: &BlockInfo, invocation: &Invocation, contract_address: Address) -> Self {
        Self {
            block: *block,
            message: Message {
                contract_address,
                sender: invocation.sender,
                value: invocation.value,
                gas_limit: invocation.gas_limit,
            },
            gas_price: invocation.gas_price,
            method_name: invocation.method_name().map(str::to_owned),
            parameters: invocation.params().to_vec(),
        }
    }

    pub fn contract_address(&self) -> Address {
        self.message.contract_address
    }
}
