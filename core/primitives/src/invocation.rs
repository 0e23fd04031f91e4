// condenser/core/primitives/src/invocation.rs

// Decoded contract invocation carried by a ledger transaction
use crate::transaction::OutPoint;
use crate::types::{Address, Gas, Money};
use serde::{Deserialize, Serialize};

/// Typed argument passed to a contract method or constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodParameter {
    Bool(bool),
    Byte(u8),
    Char(char),
    String(String),
    UInt(u32),
    Int(i32),
    ULong(u64),
    Long(i64),
    Address(Address),
    ByteArray(Vec<u8>),
}

/// Deploy new contract code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvocation {
    pub code: Vec<u8>,
    pub constructor_params: Vec<MethodParameter>,
}

/// Call a method of an existing contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInvocation {
    pub contract: Address,
    pub method: String,
    pub params: Vec<MethodParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationKind {
    Create(CreateInvocation),
    Call(CallInvocation),
}

/// A contract invocation as decoded from its carrier output.
///
/// `funding` is the transaction output that carried the invocation and any
/// value sent with it. It is spent by refund and condensing transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub sender: Address,
    pub value: Money,
    pub gas_limit: Gas,
    pub gas_price: Money,
    pub funding: OutPoint,
    pub kind: InvocationKind,
}

impl Invocation {
    pub fn is_create(&self) -> bool {
        matches!(self.kind, InvocationKind::Create(_))
    }

    /// Target contract for calls, `None` for creations
    pub fn contract_address(&self) -> Option<Address> {
        match &self.kind {
            InvocationKind::Call(call) => Some(call.contract),
            InvocationKind::Create(_) => None,
        }
    }

    pub fn method_name(&self) -> Option<&str> {
        match &self.kind {
            InvocationKind::Call(call) => Some(call.method.as_str()),
            InvocationKind::Create(_) => None,
        }
    }

    pub fn params(&self) -> &[MethodParameter] {
        match &self.kind {
            InvocationKind::Call(call) => &call.params,
            InvocationKind::Create(create) => &create.constructor_params,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            InvocationKind::Create(_) => "create",
            InvocationKind::Call(_) => "call",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash;

    fn call(value: Money) -> Invocation {
        Invocation {
            sender: Address([1; 20]),
            value,
            gas_limit: Gas::new(50_000),
            gas_price: 1,
            funding: OutPoint::new(Hash::new([2; 32]), 0),
            kind: InvocationKind::Call(CallInvocation {
                contract: Address([3; 20]),
                method: "Transfer".to_string(),
                params: vec![MethodParameter::ULong(10)],
            }),
        }
    }

    #[test]
    fn test_call_accessors() {
        let inv = call(0);
        assert!(!inv.is_create());
        assert_eq!(inv.contract_address(), Some(Address([3; 20])));
        assert_eq!(inv.method_name(), Some("Transfer"));
        assert_eq!(inv.params(), &[MethodParameter::ULong(10)]);
        assert_eq!(inv.kind_name(), "call");
    }

    #[test]
    fn test_create_accessors() {
        let inv = Invocation {
            kind: InvocationKind::Create(CreateInvocation {
                code: vec![0xde, 0xad],
                constructor_params: vec![MethodParameter::Bool(true)],
            }),
            ..call(0)
        };
        assert!(inv.is_create());
        assert_eq!(inv.contract_address(), None);
        assert_eq!(inv.method_name(), None);
        assert_eq!(inv.params(), &[MethodParameter::Bool(true)]);
    }

    #[test]
    fn test_serde_shape() {
        let inv = call(42);
        let json = serde_json::to_value(&inv).unwrap();
        assert_eq!(json["value"], 42);
        assert_eq!(json["gas_limit"], 50_000);
        assert!(json["kind"]["Call"].is_object());
        let back: Invocation = serde_json::from_value(json).unwrap();
        assert_eq!(back, inv);
    }
}
