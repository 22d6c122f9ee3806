// ============================================================================
// Records Core - Contract Entity
// File: crates/records-core/src/domain/contract.rs
// Description: Contract aggregate, lifecycle status and editable columns
// ============================================================================

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use records_shared::{ActorId, RecordId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::contract_item::{ContractItem, NewContractItem};
use super::fields::{ChangeSet, Column, FieldValue};
use super::money;
use crate::error::DomainError;

/// Contract lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Draft,
    Pending,
    Active,
    Suspended,
    Completed,
    Cancelled,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 6] = [
        ContractStatus::Draft,
        ContractStatus::Pending,
        ContractStatus::Active,
        ContractStatus::Suspended,
        ContractStatus::Completed,
        ContractStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "DRAFT",
            ContractStatus::Pending => "PENDING",
            ContractStatus::Active => "ACTIVE",
            ContractStatus::Suspended => "SUSPENDED",
            ContractStatus::Completed => "COMPLETED",
            ContractStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(ContractStatus::Draft),
            "PENDING" => Some(ContractStatus::Pending),
            "ACTIVE" => Some(ContractStatus::Active),
            "SUSPENDED" => Some(ContractStatus::Suspended),
            "COMPLETED" => Some(ContractStatus::Completed),
            "CANCELLED" => Some(ContractStatus::Cancelled),
            _ => None,
        }
    }

    /// Adjacency table of the lifecycle graph.
    pub fn allowed_transitions(&self) -> &'static [ContractStatus] {
        use ContractStatus::*;
        match self {
            Draft => &[Pending],
            Pending => &[Active],
            Active => &[Suspended, Completed, Cancelled],
            Suspended => &[Active, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Field edits are allowed until the contract is signed.
    pub fn allows_field_edits(&self) -> bool {
        matches!(self, ContractStatus::Draft | ContractStatus::Pending)
    }

    /// Line items may only be added or removed while drafting.
    pub fn allows_item_changes(&self) -> bool {
        matches!(self, ContractStatus::Draft)
    }

    pub fn can_sign(&self) -> bool {
        matches!(self, ContractStatus::Pending)
    }

    pub fn can_delete(&self) -> bool {
        matches!(self, ContractStatus::Draft)
    }
}

impl Default for ContractStatus {
    fn default() -> Self {
        ContractStatus::Draft
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_valid_transition(from: ContractStatus, to: ContractStatus) -> bool {
    from.can_transition_to(to)
}

/// Contract type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
    Service,
    Maintenance,
    Subscription,
    OneTime,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Service => "SERVICE",
            ContractType::Maintenance => "MAINTENANCE",
            ContractType::Subscription => "SUBSCRIPTION",
            ContractType::OneTime => "ONE_TIME",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SERVICE" => Some(ContractType::Service),
            "MAINTENANCE" => Some(ContractType::Maintenance),
            "SUBSCRIPTION" => Some(ContractType::Subscription),
            "ONE_TIME" => Some(ContractType::OneTime),
            _ => None,
        }
    }
}

impl Default for ContractType {
    fn default() -> Self {
        ContractType::Service
    }
}

/// Billing cycle enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Yearly,
    OneTime,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "MONTHLY",
            BillingCycle::Quarterly => "QUARTERLY",
            BillingCycle::Yearly => "YEARLY",
            BillingCycle::OneTime => "ONE_TIME",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MONTHLY" => Some(BillingCycle::Monthly),
            "QUARTERLY" => Some(BillingCycle::Quarterly),
            "YEARLY" => Some(BillingCycle::Yearly),
            "ONE_TIME" => Some(BillingCycle::OneTime),
            _ => None,
        }
    }
}

impl Default for BillingCycle {
    fn default() -> Self {
        BillingCycle::Monthly
    }
}

/// Contract entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub contract_number: String,
    pub contract_type: ContractType,
    pub customer_id: RecordId,
    pub title: String,
    pub notes: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub billing_cycle: BillingCycle,
    pub status: ContractStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by: Option<ActorId>,
    pub total_value: Decimal,
    pub currency: String,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<ActorId>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<ActorId>,
}

impl Contract {
    pub fn is_signed(&self) -> bool {
        self.signed_at.is_some()
    }
}

/// Contract together with its line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractWithItems {
    pub contract: Contract,
    pub items: Vec<ContractItem>,
}

impl ContractWithItems {
    /// Total recomputed from the loaded items.
    pub fn computed_total(&self) -> Result<Decimal, DomainError> {
        money::sum_totals(self.items.iter().map(|i| i.line_total))
    }
}

/// Request to create a contract with its initial items
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_date_range"))]
pub struct NewContract {
    #[validate(length(min = 1, max = 50, message = "Contract number must be between 1 and 50 characters"))]
    pub contract_number: String,

    pub contract_type: ContractType,

    pub customer_id: RecordId,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 4000, message = "Notes too long"))]
    pub notes: Option<String>,

    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,

    pub billing_cycle: BillingCycle,

    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: String,

    #[validate(nested)]
    pub items: Vec<NewContractItem>,
}

fn validate_date_range(contract: &NewContract) -> Result<(), ValidationError> {
    if ends_before_start(contract.start_date, contract.end_date) {
        Err(ValidationError::new("end_before_start"))
    } else {
        Ok(())
    }
}

fn ends_before_start(start: NaiveDate, end: Option<NaiveDate>) -> bool {
    matches!(end, Some(end) if end < start)
}

/// An end date, when present, may not precede the start date.
pub fn ensure_date_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), DomainError> {
    if ends_before_start(start, end) {
        Err(DomainError::ValidationError("end_date must not precede start_date".to_string()))
    } else {
        Ok(())
    }
}

impl NewContract {
    /// Total the contract will carry once created.
    pub fn expected_total(&self) -> Result<Decimal, DomainError> {
        let totals = self
            .items
            .iter()
            .map(NewContractItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        money::sum_totals(totals)
    }
}

/// Columns of `contracts` that field edits may touch. Status, signature
/// and total are owned by the lifecycle operations and are not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractColumn {
    ContractType,
    CustomerId,
    Title,
    Notes,
    StartDate,
    EndDate,
    BillingCycle,
    Currency,
}

impl Column for ContractColumn {
    fn name(&self) -> &'static str {
        match self {
            ContractColumn::ContractType => "contract_type",
            ContractColumn::CustomerId => "customer_id",
            ContractColumn::Title => "title",
            ContractColumn::Notes => "notes",
            ContractColumn::StartDate => "start_date",
            ContractColumn::EndDate => "end_date",
            ContractColumn::BillingCycle => "billing_cycle",
            ContractColumn::Currency => "currency",
        }
    }
}

pub type ContractChanges = ChangeSet<ContractColumn>;

impl ChangeSet<ContractColumn> {
    pub fn contract_type(self, value: ContractType) -> Self {
        self.set(ContractColumn::ContractType, value.as_str())
    }

    pub fn customer_id(self, value: RecordId) -> Self {
        self.set(ContractColumn::CustomerId, value)
    }

    pub fn title(self, value: impl Into<String>) -> Self {
        self.set(ContractColumn::Title, value.into())
    }

    pub fn notes(self, value: Option<String>) -> Self {
        self.set(ContractColumn::Notes, value)
    }

    pub fn start_date(self, value: NaiveDate) -> Self {
        self.set(ContractColumn::StartDate, value)
    }

    pub fn end_date(self, value: Option<NaiveDate>) -> Self {
        self.set(ContractColumn::EndDate, value)
    }

    pub fn billing_cycle(self, value: BillingCycle) -> Self {
        self.set(ContractColumn::BillingCycle, value.as_str())
    }

    pub fn currency(self, value: impl Into<String>) -> Self {
        self.set(ContractColumn::Currency, value.into())
    }

    /// Start and end dates after applying these changes over the stored ones.
    pub fn merged_dates(&self, start: NaiveDate, end: Option<NaiveDate>) -> (NaiveDate, Option<NaiveDate>) {
        let start = match self.get(ContractColumn::StartDate) {
            Some(FieldValue::Date(d)) => *d,
            _ => start,
        };
        let end = match self.get(ContractColumn::EndDate) {
            Some(FieldValue::Date(d)) => Some(*d),
            Some(FieldValue::Null) => None,
            _ => end,
        };
        (start, end)
    }

    /// Customer the changes reassign the contract to, if any.
    pub fn new_customer(&self) -> Option<RecordId> {
        match self.get(ContractColumn::CustomerId) {
            Some(FieldValue::Int(id)) => Some(*id),
            _ => None,
        }
    }
}

/// Partial update payload; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateContractRequest {
    pub contract_type: Option<ContractType>,
    pub customer_id: Option<RecordId>,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,

    pub start_date: Option<NaiveDate>,

    /// `Some(None)` makes the contract open-ended.
    pub end_date: Option<Option<NaiveDate>>,

    pub billing_cycle: Option<BillingCycle>,

    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: Option<String>,
}

impl UpdateContractRequest {
    pub fn into_changes(self) -> ContractChanges {
        let mut changes = ContractChanges::new();
        if let Some(v) = self.contract_type {
            changes = changes.contract_type(v);
        }
        if let Some(v) = self.customer_id {
            changes = changes.customer_id(v);
        }
        if let Some(v) = self.title {
            changes = changes.title(v.trim());
        }
        if let Some(v) = self.notes {
            changes = changes.notes(v);
        }
        if let Some(v) = self.start_date {
            changes = changes.start_date(v);
        }
        if let Some(v) = self.end_date {
            changes = changes.end_date(v);
        }
        if let Some(v) = self.billing_cycle {
            changes = changes.billing_cycle(v);
        }
        if let Some(v) = self.currency {
            changes = changes.currency(v.to_uppercase());
        }
        changes
    }
}

/// List filter for contracts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub customer_id: Option<RecordId>,
    /// Prefix match on the contract number.
    pub number_prefix: Option<String>,
}
