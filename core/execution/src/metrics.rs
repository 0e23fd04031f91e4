// condenser/core/execution/src/metrics.rs

// Metrics for tracking contract executions and settlement
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram, CounterVec, Histogram};

pub static CONTRACT_EXECUTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "condenser_contract_executions_total",
        "Number of contract invocations by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("register condenser_contract_executions_total")
});

pub static CONTRACT_GAS_USED: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "condenser_contract_gas_used",
        "Gas consumed per contract invocation"
    )
    .expect("register condenser_contract_gas_used")
});

pub static SETTLEMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "condenser_settlements_total",
        "Settlement paths taken after execution",
        &["path"]
    )
    .expect("register condenser_settlements_total")
});

pub static EXECUTION_DEFECTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "condenser_execution_defects_total",
        "Invocations aborted by an unexpected failure, by stage",
        &["stage"]
    )
    .expect("register condenser_execution_defects_total")
});
