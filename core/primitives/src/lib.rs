// condenser/core/primitives/src/lib.rs

pub mod invocation;
pub mod transaction;
pub mod types;

pub use invocation::{CallInvocation, CreateInvocation, Invocation, InvocationKind, MethodParameter};
pub use transaction::{opcodes, OutPoint, Script, Transaction, TxIn, TxOut, UnspentOutput};
pub use types::{Address, AddressParseError, Gas, Hash, Money};
