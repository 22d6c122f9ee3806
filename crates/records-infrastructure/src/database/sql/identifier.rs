//! Identifier and table validation

use std::fmt;
use std::sync::OnceLock;

use records_shared::constants::MAX_IDENTIFIER_LENGTH;
use regex::Regex;

use crate::error::CrudError;

static IDENTIFIER_PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn identifier_pattern() -> Result<&'static Regex, CrudError> {
    IDENTIFIER_PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"))
        .as_ref()
        .map_err(|e| CrudError::InvalidIdentifier(format!("identifier pattern unavailable: {}", e)))
}

/// A column or table name that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate_identifier(name: &str) -> Result<Identifier, CrudError> {
    if name.is_empty() {
        return Err(CrudError::InvalidIdentifier("identifier is empty".to_string()));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(CrudError::InvalidIdentifier(format!(
            "identifier exceeds {} characters",
            MAX_IDENTIFIER_LENGTH
        )));
    }
    if !identifier_pattern()?.is_match(name) {
        return Err(CrudError::InvalidIdentifier(name.to_string()));
    }
    Ok(Identifier(name.to_string()))
}

/// Tables the generic engine may address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Contracts,
    ContractItems,
    Customers,
    Services,
    ContractHistory,
    ContractPrintJobs,
    ContractTemplates,
    GeneratedContracts,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Contracts,
        Table::ContractItems,
        Table::Customers,
        Table::Services,
        Table::ContractHistory,
        Table::ContractPrintJobs,
        Table::ContractTemplates,
        Table::GeneratedContracts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Contracts => "contracts",
            Table::ContractItems => "contract_items",
            Table::Customers => "customers",
            Table::Services => "services",
            Table::ContractHistory => "contract_history",
            Table::ContractPrintJobs => "contract_print_jobs",
            Table::ContractTemplates => "contract_templates",
            Table::GeneratedContracts => "generated_contracts",
        }
    }

    /// Entity name used in not-found errors.
    pub fn entity(&self) -> &'static str {
        match self {
            Table::Contracts => "Contract",
            Table::ContractItems => "ContractItem",
            Table::Customers => "Customer",
            Table::Services => "Service",
            Table::ContractHistory => "ContractHistory",
            Table::ContractPrintJobs => "PrintJob",
            Table::ContractTemplates => "ContractTemplate",
            Table::GeneratedContracts => "GeneratedContract",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match against the allowlist.
pub fn validate_table(name: &str) -> Result<Table, CrudError> {
    Table::ALL
        .into_iter()
        .find(|t| t.as_str() == name)
        .ok_or_else(|| CrudError::TableNotAllowed(name.to_string()))
}
