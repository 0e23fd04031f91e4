// condenser/core/execution/src/executor.rs

use crate::address_utils::{AddressGenerator, KeccakAddressGenerator};
use crate::config::{ConfigError, ExecutorConfig};
use crate::context::{BlockInfo, ExecutionContext};
use crate::gas::GasMeter;
use crate::metrics::{
    CONTRACT_EXECUTIONS_TOTAL, CONTRACT_GAS_USED, EXECUTION_DEFECTS_TOTAL, SETTLEMENTS_TOTAL,
};
use crate::post_process::{NoopResultProcessor, ResultProcessor};
use crate::settlement::{self, refund_transaction};
use crate::state::{ContractState, StateRepository};
use crate::types::{Defect, ExecutionResult, ExecutionStage};
use crate::validation::{ModuleDecompiler, ModuleValidator, RuleSet};
use crate::vm::{ContractVm, VmError, VmOutput};
use condenser_primitives::{
    Address, CallInvocation, CreateInvocation, Invocation, InvocationKind, Money,
};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

/// Runs contract invocations and settles their outcome.
///
/// Each call to [`execute`](ContractExecutor::execute) walks one invocation
/// through pre-execute, execute and post-execute against its own tracked
/// snapshot. Exactly one of commit or rollback happens per invocation.
pub struct ContractExecutor {
    vm: Arc<dyn ContractVm>,
    decompiler: Arc<dyn ModuleDecompiler>,
    validator: Arc<dyn ModuleValidator>,
    result_processor: Arc<dyn ResultProcessor>,
    address_generator: Arc<dyn AddressGenerator>,
    config: ExecutorConfig,
}

impl ContractExecutor {
    /// Builds an executor from a config the caller has already validated.
    ///
    /// Use [`try_new`](ContractExecutor::try_new) for configs assembled in code.
    pub fn new(
        vm: Arc<dyn ContractVm>,
        decompiler: Arc<dyn ModuleDecompiler>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            vm,
            decompiler,
            validator: Arc::new(RuleSet::from_config(&config)),
            result_processor: Arc::new(NoopResultProcessor),
            address_generator: Arc::new(KeccakAddressGenerator),
            config,
        }
    }

    /// Like [`new`](ContractExecutor::new), rejecting an invalid config
    pub fn try_new(
        vm: Arc<dyn ContractVm>,
        decompiler: Arc<dyn ModuleDecompiler>,
        config: ExecutorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError)?;
        Ok(Self::new(vm, decompiler, config))
    }

    /// Replace the rule set derived from the config
    pub fn with_validator(mut self, validator: Arc<dyn ModuleValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Attach fee bookkeeping (e.g. a mempool refund collector)
    pub fn with_result_processor(mut self, processor: Arc<dyn ResultProcessor>) -> Self {
        self.result_processor = processor;
        self
    }

    pub fn with_address_generator(mut self, generator: Arc<dyn AddressGenerator>) -> Self {
        self.address_generator = generator;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute one contract invocation.
    ///
    /// Never fails: expected failures come back as reverted results, and an
    /// unexpected defect is logged, its tracked state discarded, and turned
    /// into a best-effort reverted result.
    pub fn execute<R: StateRepository>(
        &self,
        repository: &R,
        invocation: &Invocation,
        block: &BlockInfo,
        mempool_fee: Money,
    ) -> ExecutionResult {
        let span = info_span!(
            "contract_execution",
            kind = invocation.kind_name(),
            sender = %invocation.sender,
            height = block.height
        );
        let _entered = span.enter();

        let mut gas = GasMeter::new(invocation.gas_limit);
        let mut stage = ExecutionStage::Created;
        let mut snapshot = repository.start_tracking();

        let outcome = match self.run(&mut snapshot, invocation, block, &mut gas, &mut stage) {
            Ok(result) => Self::finish_snapshot(snapshot, &result).map(|()| result),
            Err(defect) => {
                if let Err(e) = snapshot.rollback() {
                    error!(%stage, error = %e, "Rollback after defect failed");
                }
                Err(defect)
            }
        };

        let result = match outcome {
            Ok(result) => {
                stage = ExecutionStage::Done;
                debug!(%stage, "Invocation complete");
                result
            }
            Err(defect) => {
                error!(%stage, %defect, "Contract execution aborted, tracked state discarded");
                EXECUTION_DEFECTS_TOTAL
                    .with_label_values(&[stage.to_string().as_str()])
                    .inc();
                let mut result = ExecutionResult::aborted(&defect, gas.consumed());
                if result.is_out_of_gas() {
                    result.gas_consumed = gas.limit();
                }
                result.internal_transaction = refund_transaction(invocation);
                result
            }
        };

        CONTRACT_EXECUTIONS_TOTAL
            .with_label_values(&[invocation.kind_name(), result.outcome()])
            .inc();
        CONTRACT_GAS_USED.observe(result.gas_consumed.as_u64() as f64);

        self.result_processor
            .process(&result, invocation, mempool_fee);

        info!(
            outcome = result.outcome(),
            gas_used = %result.gas_consumed,
            settlement_tx = result.internal_transaction.is_some(),
            "Contract invocation finished"
        );
        result
    }

    fn run<S: ContractState>(
        &self,
        snapshot: &mut S,
        invocation: &Invocation,
        block: &BlockInfo,
        gas: &mut GasMeter,
        stage: &mut ExecutionStage,
    ) -> Result<ExecutionResult, Defect> {
        *stage = ExecutionStage::PreExecuting;
        self.pre_execute(gas)?;

        *stage = ExecutionStage::Executing;
        let result = match &invocation.kind {
            InvocationKind::Create(create) => {
                self.execute_create(snapshot, invocation, create, block, gas)?
            }
            InvocationKind::Call(call) => {
                self.execute_call(snapshot, invocation, call, block, gas)?
            }
        };

        *stage = ExecutionStage::PostExecuting;
        self.post_execute(snapshot, invocation, result)
    }

    /// The single terminal operation on a snapshot whose run succeeded
    fn finish_snapshot<S: ContractState>(
        snapshot: S,
        result: &ExecutionResult,
    ) -> Result<(), Defect> {
        if result.revert {
            snapshot.rollback()?;
            debug!(error = ?result.error, "Invocation reverted, state rolled back");
        } else {
            snapshot.commit()?;
        }
        Ok(())
    }

    /// Charge the base fee
    fn pre_execute(&self, gas: &mut GasMeter) -> Result<(), Defect> {
        gas.spend(self.config.base_fee).map_err(Defect::BaseFee)
    }

    /// Execute contract deployment
    fn execute_create<S: ContractState>(
        &self,
        snapshot: &mut S,
        invocation: &Invocation,
        create: &CreateInvocation,
        block: &BlockInfo,
        gas: &mut GasMeter,
    ) -> Result<ExecutionResult, Defect> {
        let address = self.address_generator.contract_address(invocation);
        snapshot.create_account(address)?;

        let module = match self.decompiler.decompile(&create.code) {
            Ok(module) => module,
            Err(violation) => {
                warn!(%address, rule = %violation.rule, "Contract bytecode could not be decompiled");
                return Ok(ExecutionResult::validation_failed(
                    vec![violation],
                    gas.consumed(),
                ));
            }
        };

        let validation = self.validator.validate(&module);
        if !validation.is_valid() {
            warn!(
                %address,
                violations = validation.violations.len(),
                "Contract bytecode failed validation"
            );
            return Ok(ExecutionResult::validation_failed(
                validation.violations,
                gas.consumed(),
            ));
        }

        let context = ExecutionContext::build(block, invocation, address);
        debug!(?context, "Invoking contract constructor");

        let vm_result = self.vm.create(snapshot, &create.code, &context, gas);
        let mut result = Self::finish(vm_result, gas)?;
        if result.revert {
            return Ok(result);
        }

        result.new_contract_address = Some(address);
        snapshot.set_code(address, create.code.clone())?;
        info!(%address, code_size = create.code.len(), "Contract deployed");
        Ok(result)
    }

    /// Execute contract call
    fn execute_call<S: ContractState>(
        &self,
        snapshot: &mut S,
        invocation: &Invocation,
        call: &CallInvocation,
        block: &BlockInfo,
        gas: &mut GasMeter,
    ) -> Result<ExecutionResult, Defect> {
        let code = match snapshot.get_code(&call.contract)? {
            Some(code) => code,
            None => {
                warn!(contract = %call.contract, "Call to address without contract code");
                return Ok(ExecutionResult::contract_not_found(
                    call.contract,
                    gas.consumed(),
                ));
            }
        };

        let context = ExecutionContext::build(block, invocation, call.contract);
        debug!(?context, method = %call.method, "Invoking contract method");

        let vm_result = self.vm.call(snapshot, &code, &call.method, &context, gas);
        Self::finish(vm_result, gas)
    }

    /// Turn the VM's answer into a result; storage failures are defects
    fn finish(
        vm_result: Result<VmOutput, VmError>,
        gas: &GasMeter,
    ) -> Result<ExecutionResult, Defect> {
        match vm_result {
            Ok(output) => Ok(ExecutionResult::success(
                output.return_value,
                output.transfers,
                gas.consumed(),
            )),
            Err(VmError::Execution(error)) => {
                let result = ExecutionResult::reverted(error, gas.consumed());
                // Exhaustion forfeits the whole budget
                if result.is_out_of_gas() {
                    return Ok(ExecutionResult {
                        gas_consumed: gas.limit(),
                        ..result
                    });
                }
                Ok(result)
            }
            Err(VmError::State(error)) => Err(Defect::State(error)),
        }
    }

    /// Settle funds; the caller finishes the tracked state
    fn post_execute<S: ContractState>(
        &self,
        snapshot: &mut S,
        invocation: &Invocation,
        mut result: ExecutionResult,
    ) -> Result<ExecutionResult, Defect> {
        if result.revert {
            result.transfers.clear();
            result.internal_transaction = refund_transaction(invocation);
            if result.internal_transaction.is_some() {
                SETTLEMENTS_TOTAL.with_label_values(&["refund"]).inc();
            }
            return Ok(result);
        }

        let contract = self.settled_contract(invocation, &result)?;
        let settlement = settlement::settle(snapshot, invocation, contract, &result.transfers)?;
        SETTLEMENTS_TOTAL
            .with_label_values(&[settlement.path()])
            .inc();
        debug!(%contract, path = settlement.path(), "Invocation settled");

        result.internal_transaction = settlement.into_transaction();
        Ok(result)
    }

    fn settled_contract(
        &self,
        invocation: &Invocation,
        result: &ExecutionResult,
    ) -> Result<Address, Defect> {
        match &invocation.kind {
            InvocationKind::Call(call) => Ok(call.contract),
            InvocationKind::Create(_) => result
                .new_contract_address
                .ok_or(Defect::MissingContractAddress),
        }
    }
}
