//! Catalog service entity

use chrono::{DateTime, Utc};
use records_shared::constants::DEFAULT_CURRENCY;
use records_shared::{ActorId, RecordId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::fields::{ChangeSet, Column};

/// Catalog item a contract line can reference.
///
/// Tax rates distinguish "not specified" (`None`) from an explicit 0% rate
/// (`Some(Decimal::ZERO)`); both survive storage unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub service_code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub currency: String,
    pub price_unit: String,
    pub vat_rate: Option<Decimal>,
    pub withholding_rate: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<ActorId>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<ActorId>,
}

impl Service {
    pub fn has_vat_rate(&self) -> bool {
        self.vat_rate.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewService {
    #[validate(length(min = 1, max = 50, message = "Service code must be between 1 and 50 characters"))]
    pub service_code: String,

    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub unit_price: Decimal,

    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Price unit must be between 1 and 20 characters"))]
    pub price_unit: String,

    #[validate(custom(function = "validate_rate"))]
    pub vat_rate: Option<Decimal>,

    #[validate(custom(function = "validate_rate"))]
    pub withholding_rate: Option<Decimal>,
}

fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("price_negative"))
    }
}

fn validate_rate(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO && *value <= Decimal::ONE_HUNDRED {
        Ok(())
    } else {
        Err(ValidationError::new("rate_out_of_range"))
    }
}

impl NewService {
    pub fn into_changes(self) -> ServiceChanges {
        ServiceChanges::new()
            .set(ServiceColumn::ServiceCode, self.service_code.trim())
            .set(ServiceColumn::Name, self.name.trim())
            .set(ServiceColumn::Description, self.description)
            .set(ServiceColumn::UnitPrice, self.unit_price)
            .set(
                ServiceColumn::Currency,
                self.currency
                    .map(|c| c.to_uppercase())
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            )
            .set(ServiceColumn::PriceUnit, self.price_unit.trim().to_uppercase())
            .vat_rate(self.vat_rate)
            .withholding_rate(self.withholding_rate)
            .set(ServiceColumn::IsActive, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceColumn {
    ServiceCode,
    Name,
    Description,
    UnitPrice,
    Currency,
    PriceUnit,
    VatRate,
    WithholdingRate,
    IsActive,
}

impl Column for ServiceColumn {
    fn name(&self) -> &'static str {
        match self {
            ServiceColumn::ServiceCode => "service_code",
            ServiceColumn::Name => "name",
            ServiceColumn::Description => "description",
            ServiceColumn::UnitPrice => "unit_price",
            ServiceColumn::Currency => "currency",
            ServiceColumn::PriceUnit => "price_unit",
            ServiceColumn::VatRate => "vat_rate",
            ServiceColumn::WithholdingRate => "withholding_rate",
            ServiceColumn::IsActive => "is_active",
        }
    }
}

pub type ServiceChanges = ChangeSet<ServiceColumn>;

impl ChangeSet<ServiceColumn> {
    /// `None` stores NULL ("not specified"), `Some(0)` stores an explicit 0%.
    pub fn vat_rate(self, rate: Option<Decimal>) -> Self {
        self.set(ServiceColumn::VatRate, rate)
    }

    pub fn withholding_rate(self, rate: Option<Decimal>) -> Self {
        self.set(ServiceColumn::WithholdingRate, rate)
    }

    pub fn unit_price(self, price: Decimal) -> Self {
        self.set(ServiceColumn::UnitPrice, price)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceFilter {
    pub include_inactive: bool,
    pub name_contains: Option<String>,
}
