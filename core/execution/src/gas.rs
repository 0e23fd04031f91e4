// condenser/core/execution/src/gas.rs

// Gas budget for a single invocation
use crate::types::ExecutionError;
use condenser_primitives::Gas;

/// Tracks the gas still available to an invocation.
///
/// A failed spend leaves the budget untouched; the caller treats it as
/// terminal for the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: Gas,
    available: Gas,
}

impl GasMeter {
    pub fn new(limit: Gas) -> Self {
        Self {
            limit,
            available: limit,
        }
    }

    /// Consume gas
    pub fn spend(&mut self, amount: Gas) -> Result<(), ExecutionError> {
        match self.available.checked_sub(amount) {
            Some(remaining) => {
                self.available = remaining;
                Ok(())
            }
            None => Err(ExecutionError::OutOfGas {
                requested: amount,
                available: self.available,
            }),
        }
    }

    pub fn limit(&self) -> Gas {
        self.limit
    }

    pub fn available(&self) -> Gas {
        self.available
    }

    pub fn consumed(&self) -> Gas {
        self.limit.saturating_sub(self.available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_decrements() {
        let mut meter = GasMeter::new(Gas::new(100));
        meter.spend(Gas::new(30)).unwrap();
        meter.spend(Gas::new(70)).unwrap();
        assert_eq!(meter.available(), Gas::ZERO);
        assert_eq!(meter.consumed(), Gas::new(100));
    }

    #[test]
    fn test_out_of_gas_leaves_budget() {
        let mut meter = GasMeter::new(Gas::new(100));
        meter.spend(Gas::new(60)).unwrap();

        let err = meter.spend(Gas::new(41)).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::OutOfGas {
                requested: Gas::new(41),
                available: Gas::new(40),
            }
        );
        assert_eq!(meter.available(), Gas::new(40));
        assert_eq!(meter.consumed(), Gas::new(60));

        // Exact remainder is still affordable
        meter.spend(Gas::new(40)).unwrap();
        assert!(meter.spend(Gas::new(1)).is_err());
    }

    #[test]
    fn test_zero_spend_always_succeeds() {
        let mut meter = GasMeter::new(Gas::ZERO);
        assert!(meter.spend(Gas::ZERO).is_ok());
        assert_eq!(meter.limit(), Gas::ZERO);
    }
}
