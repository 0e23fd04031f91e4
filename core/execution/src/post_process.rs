// condenser/core/execution/src/post_process.rs

// Fee bookkeeping once an invocation has been settled
use crate::types::ExecutionResult;
use condenser_primitives::{Address, Invocation, Money};
use parking_lot::Mutex;
use tracing::debug;

/// Receives every finished result together with the fee the mempool charged
pub trait ResultProcessor: Send + Sync {
    fn process(&self, result: &ExecutionResult, invocation: &Invocation, mempool_fee: Money);
}

/// Discards results
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResultProcessor;

impl ResultProcessor for NoopResultProcessor {
    fn process(&self, _result: &ExecutionResult, _invocation: &Invocation, _mempool_fee: Money) {}
}

/// How the fee of one invocation is split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSummary {
    pub sender: Address,
    /// Price of the gas actually consumed
    pub gas_fee: Money,
    /// Price of the unused gas, owed back to the sender
    pub gas_refund: Money,
    /// What the block producer keeps
    pub miner_fee: Money,
}

impl FeeSummary {
    /// The mempool fee covers the whole gas budget; unused gas is refunded.
    pub fn compute(result: &ExecutionResult, invocation: &Invocation, mempool_fee: Money) -> Self {
        let consumed = result.gas_consumed.min(invocation.gas_limit);
        let unused = invocation.gas_limit.saturating_sub(consumed);
        let gas_fee = consumed.cost(invocation.gas_price).unwrap_or(Money::MAX);
        let gas_refund = unused
            .cost(invocation.gas_price)
            .unwrap_or(Money::MAX)
            .min(mempool_fee);

        Self {
            sender: invocation.sender,
            gas_fee,
            gas_refund,
            miner_fee: mempool_fee - gas_refund,
        }
    }
}

/// Records gas refunds for the block assembler
#[derive(Debug, Default)]
pub struct RefundCollector {
    summaries: Mutex<Vec<FeeSummary>>,
}

impl RefundCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summaries with a non-zero refund, in processing order
    pub fn refunds(&self) -> Vec<FeeSummary> {
        self.summaries
            .lock()
            .iter()
            .filter(|s| s.gas_refund > 0)
            .copied()
            .collect()
    }

    pub fn total_miner_fee(&self) -> Money {
        self.summaries.lock().iter().map(|s| s.miner_fee).sum()
    }

    /// Hand over everything recorded so far
    pub fn drain(&self) -> Vec<FeeSummary> {
        std::mem::take(&mut *self.summaries.lock())
    }
}

impl ResultProcessor for RefundCollector {
    fn process(&self, result: &ExecutionResult, invocation: &Invocation, mempool_fee: Money) {
        let summary = FeeSummary::compute(result, invocation, mempool_fee);
        debug!(
            sender = %summary.sender,
            gas_fee = summary.gas_fee,
            gas_refund = summary.gas_refund,
            miner_fee = summary.miner_fee,
            "Recorded invocation fee"
        );
        self.summaries.lock().push(summary);
    }
}
