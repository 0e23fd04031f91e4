// condenser/core/execution/src/lib.rs

// Re-export modules
pub mod address_utils;
pub mod config;
pub mod context;
pub mod executor;
pub mod gas;
pub mod metrics;
pub mod post_process;
pub mod settlement;
pub mod state;
pub mod types;
pub mod validation;
pub mod vm;

pub use address_utils::{AddressGenerator, KeccakAddressGenerator};
pub use config::{ConfigError, ExecutorConfig};
pub use context::{BlockInfo, ExecutionContext, Message};
pub use executor::ContractExecutor;
pub use gas::GasMeter;
pub use post_process::{FeeSummary, NoopResultProcessor, RefundCollector, ResultProcessor};
pub use settlement::{refund_transaction, settle, CondensingTransaction, Settlement, SettlementError};
pub use state::{AccountRecord, ContractState, StateDB, StateError, StateRepository, TrackedState};
pub use types::{Defect, ExecutionError, ExecutionResult, ExecutionStage, InternalTransfer};
pub use validation::{
    CodeSizeRule, DecompiledModule, EntryPointRule, ModuleDecompiler, ModuleValidator, RuleSet,
    ValidationResult, ValidationRule, ValidationViolation,
};
pub use vm::{ContractVm, VmError, VmOutput};

// Ledger types used throughout the public API
pub use condenser_primitives as primitives;
