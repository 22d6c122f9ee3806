//! Contract line item entity

use chrono::{DateTime, Utc};
use records_shared::{RecordId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::money;
use crate::error::DomainError;

/// Line item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::InProgress => "IN_PROGRESS",
            ItemStatus::Completed => "COMPLETED",
            ItemStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(ItemStatus::Pending),
            "IN_PROGRESS" => Some(ItemStatus::InProgress),
            "COMPLETED" => Some(ItemStatus::Completed),
            "CANCELLED" => Some(ItemStatus::Cancelled),
            _ => None,
        }
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Pending
    }
}

/// Contract item entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractItem {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub contract_id: RecordId,
    pub service_id: RecordId,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_pct: Decimal,
    pub line_total: Decimal,
    pub status: ItemStatus,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Request to add a line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_line_total"))]
pub struct NewContractItem {
    pub service_id: RecordId,

    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_non_negative"))]
    pub unit_price: Decimal,

    #[validate(custom(function = "validate_percentage"))]
    pub discount_pct: Decimal,

    pub sort_order: Option<i32>,
}

impl NewContractItem {
    pub fn line_total(&self) -> Result<Decimal, DomainError> {
        money::line_total(self.quantity, self.unit_price, self.discount_pct)
    }
}

fn validate_line_total(item: &NewContractItem) -> Result<(), ValidationError> {
    item.line_total()
        .map(|_| ())
        .map_err(|_| ValidationError::new("line_total_out_of_range"))
}

fn validate_storable(value: &Decimal) -> Result<(), ValidationError> {
    if money::within_storage_bound(*value) {
        Ok(())
    } else {
        Err(ValidationError::new("amount_out_of_range"))
    }
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        validate_storable(value)
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        validate_storable(value)
    } else {
        Err(ValidationError::new("must_not_be_negative"))
    }
}

fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO && *value <= Decimal::ONE_HUNDRED {
        Ok(())
    } else {
        Err(ValidationError::new("percentage_out_of_range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, unit_price: i64, discount_pct: i64) -> NewContractItem {
        NewContractItem {
            service_id: 1,
            description: Some("Consulting".to_string()),
            quantity: Decimal::from(quantity),
            unit_price: Decimal::from(unit_price),
            discount_pct: Decimal::from(discount_pct),
            sort_order: None,
        }
    }

    #[test]
    fn test_valid_item() {
        assert!(item(2, 100, 10).validate().is_ok());
        assert_eq!(item(2, 100, 10).line_total().unwrap(), Decimal::from(180));
    }

    #[test]
    fn test_discount_out_of_range() {
        assert!(item(1, 100, 101).validate().is_err());
        assert!(item(1, 100, -1).validate().is_err());
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(item(0, 100, 0).validate().is_err());
        assert!(item(-3, 100, 0).validate().is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        assert!(item(1, -5, 0).validate().is_err());
        assert!(item(1, 0, 0).validate().is_ok());
    }

    #[test]
    fn test_oversized_amounts_rejected() {
        let huge = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let mut oversized = item(1, 1, 0);
        oversized.quantity = huge;
        oversized.unit_price = huge;
        assert!(oversized.validate().is_err());
        assert!(oversized.line_total().is_err());
    }

    #[test]
    fn test_line_total_over_storage_bound_rejected() {
        // each operand fits, the product does not
        let mut item = item(1, 1, 0);
        item.quantity = Decimal::from(1_000_000_000_i64);
        item.unit_price = Decimal::from(1_000_000_000_i64);
        assert!(item.validate().is_err());
        item.unit_price = Decimal::from(1_000_000_i64);
        assert!(item.validate().is_ok());
    }
}
