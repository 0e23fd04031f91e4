// condenser/core/execution/src/validation.rs

// Static checks applied to contract bytecode before deployment
use crate::config::ExecutorConfig;
use condenser_primitives::Hash;
use serde::{Deserialize, Serialize};

/// Contract module as recovered from submitted bytecode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledModule {
    pub code_hash: Hash,
    pub code_size: usize,
    pub type_name: String,
    pub methods: Vec<String>,
}

/// A single rule the module does not satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub message: String,
}

impl ValidationViolation {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Recovers a module from bytecode; supplied by the VM integration
pub trait ModuleDecompiler: Send + Sync {
    fn decompile(&self, code: &[u8]) -> Result<DecompiledModule, ValidationViolation>;
}

pub trait ModuleValidator: Send + Sync {
    fn validate(&self, module: &DecompiledModule) -> ValidationResult;
}

pub trait ValidationRule: Send + Sync {
    fn check(&self, module: &DecompiledModule) -> Option<ValidationViolation>;
}

/// Rejects modules above a byte size
pub struct CodeSizeRule {
    pub max_code_size: usize,
}

impl ValidationRule for CodeSizeRule {
    fn check(&self, module: &DecompiledModule) -> Option<ValidationViolation> {
        (module.code_size > self.max_code_size).then(|| {
            ValidationViolation::new(
                "CodeSize",
                format!(
                    "module is {} bytes, limit is {}",
                    module.code_size, self.max_code_size
                ),
            )
        })
    }
}

/// Rejects modules exposing no callable method
pub struct EntryPointRule;

impl ValidationRule for EntryPointRule {
    fn check(&self, module: &DecompiledModule) -> Option<ValidationViolation> {
        if module.methods.is_empty() {
            return Some(ValidationViolation::new(
                "EntryPoint",
                format!("{} exposes no methods", module.type_name),
            ));
        }
        module
            .methods
            .iter()
            .find(|m| m.trim().is_empty())
            .map(|_| ValidationViolation::new("EntryPoint", "method with empty name"))
    }
}

/// Runs every rule and collects all violations
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        let mut rules = Self::new().with_rule(CodeSizeRule {
            max_code_size: config.max_code_size,
        });
        if config.require_entry_points {
            rules = rules.with_rule(EntryPointRule);
        }
        rules
    }

    pub fn with_rule<R: ValidationRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ModuleValidator for RuleSet {
    fn validate(&self, module: &DecompiledModule) -> ValidationResult {
        ValidationResult {
            violations: self.rules.iter().filter_map(|r| r.check(module)).collect(),
        }
    }
}
