// ============================================================================
// Records Core - Customer Entity
// File: crates/records-core/src/domain/customer.rs
// ============================================================================

use chrono::{DateTime, Utc};
use records_shared::{ActorId, RecordId, TenantId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::fields::{ChangeSet, Column};

/// Customer classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerType {
    Individual,
    Company,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Individual => "INDIVIDUAL",
            CustomerType::Company => "COMPANY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INDIVIDUAL" => Some(CustomerType::Individual),
            "COMPANY" => Some(CustomerType::Company),
            _ => None,
        }
    }
}

impl Default for CustomerType {
    fn default() -> Self {
        CustomerType::Company
    }
}

/// Customer entity. Never hard-deleted; deactivation clears `is_active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub customer_code: String,
    pub customer_type: CustomerType,
    pub name: String,
    pub tax_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_active: bool,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<ActorId>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<ActorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 50, message = "Customer code must be between 1 and 50 characters"))]
    pub customer_code: String,

    pub customer_type: CustomerType,

    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 50, message = "Tax number too long"))]
    pub tax_number: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 50, message = "Phone too long"))]
    pub phone: Option<String>,

    #[validate(length(max = 500, message = "Address too long"))]
    pub address: Option<String>,

    #[validate(length(max = 100, message = "City too long"))]
    pub city: Option<String>,

    #[validate(length(max = 20, message = "Postal code too long"))]
    pub postal_code: Option<String>,

    #[validate(length(equal = 2, message = "Country must be an ISO 3166-1 alpha-2 code"))]
    pub country: Option<String>,
}

impl NewCustomer {
    pub fn into_changes(self) -> CustomerChanges {
        CustomerChanges::new()
            .set(CustomerColumn::CustomerCode, self.customer_code.trim())
            .set(CustomerColumn::CustomerType, self.customer_type.as_str())
            .set(CustomerColumn::Name, self.name.trim())
            .set(CustomerColumn::TaxNumber, self.tax_number)
            .set(CustomerColumn::Email, self.email.map(|e| e.trim().to_lowercase()))
            .set(CustomerColumn::Phone, self.phone)
            .set(CustomerColumn::Address, self.address)
            .set(CustomerColumn::City, self.city)
            .set(CustomerColumn::PostalCode, self.postal_code)
            .set(CustomerColumn::Country, self.country.map(|c| c.to_uppercase()))
            .set(CustomerColumn::IsActive, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerColumn {
    CustomerCode,
    CustomerType,
    Name,
    TaxNumber,
    Email,
    Phone,
    Address,
    City,
    PostalCode,
    Country,
    IsActive,
}

impl Column for CustomerColumn {
    fn name(&self) -> &'static str {
        match self {
            CustomerColumn::CustomerCode => "customer_code",
            CustomerColumn::CustomerType => "customer_type",
            CustomerColumn::Name => "name",
            CustomerColumn::TaxNumber => "tax_number",
            CustomerColumn::Email => "email",
            CustomerColumn::Phone => "phone",
            CustomerColumn::Address => "address",
            CustomerColumn::City => "city",
            CustomerColumn::PostalCode => "postal_code",
            CustomerColumn::Country => "country",
            CustomerColumn::IsActive => "is_active",
        }
    }
}

pub type CustomerChanges = ChangeSet<CustomerColumn>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerFilter {
    pub customer_type: Option<CustomerType>,
    pub include_inactive: bool,
    /// Substring match on the name (`LIKE`).
    pub name_contains: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;

    fn new_customer() -> NewCustomer {
        NewCustomer {
            customer_code: " C-001 ".to_string(),
            customer_type: CustomerType::Company,
            name: "Acme d.o.o.".to_string(),
            tax_number: None,
            email: Some("Billing@Acme.example".to_string()),
            phone: None,
            address: None,
            city: Some("Zagreb".to_string()),
            postal_code: None,
            country: Some("hr".to_string()),
        }
    }

    #[test]
    fn test_valid_customer() {
        assert!(new_customer().validate().is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut customer = new_customer();
        customer.email = Some("not-an-email".to_string());
        assert!(customer.validate().is_err());
    }

    #[test]
    fn test_into_changes_normalizes() {
        let changes = new_customer().into_changes();
        assert_eq!(changes.get(CustomerColumn::CustomerCode), Some(&FieldValue::Text("C-001".into())));
        assert_eq!(
            changes.get(CustomerColumn::Email),
            Some(&FieldValue::Text("billing@acme.example".into()))
        );
        assert_eq!(changes.get(CustomerColumn::Country), Some(&FieldValue::Text("HR".into())));
        assert_eq!(changes.get(CustomerColumn::TaxNumber), Some(&FieldValue::Null));
        assert_eq!(changes.get(CustomerColumn::IsActive), Some(&FieldValue::Bool(true)));
    }
}
