//! HTML rendering of a contract and its line items.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use records_core::{Contract, ContractItem, ContractWithItems};
use serde::Serialize;

use crate::utils::error::WorkerError;

const TEMPLATE_NAME: &str = "contract";
const TEMPLATE_SOURCE: &str = include_str!("../../templates/contract.html");

/// Line items that fit on one printed page after the header block.
const ITEMS_PER_PAGE: usize = 25;

static REGISTRY: OnceLock<Result<Handlebars<'static>, String>> = OnceLock::new();

fn registry() -> Result<&'static Handlebars<'static>, WorkerError> {
    REGISTRY
        .get_or_init(|| {
            let mut hb = Handlebars::new();
            hb.register_template_string(TEMPLATE_NAME, TEMPLATE_SOURCE)
                .map_err(|e| e.to_string())?;
            Ok(hb)
        })
        .as_ref()
        .map_err(|e| WorkerError::RenderError(e.clone()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub content: String,
    pub page_count: i32,
}

#[derive(Serialize)]
struct ItemView<'a> {
    position: usize,
    item: &'a ContractItem,
}

#[derive(Serialize)]
struct TemplateContext<'a> {
    contract: &'a Contract,
    items: Vec<ItemView<'a>>,
    generated_at: String,
}

/// Estimated printed pages: one page per started block of items, at least one.
pub fn page_count(item_count: usize) -> i32 {
    let pages = item_count.div_ceil(ITEMS_PER_PAGE).max(1);
    i32::try_from(pages).unwrap_or(i32::MAX)
}

/// Render the contract header and item table. Every interpolated value is
/// HTML-escaped.
pub fn render_contract(
    document: &ContractWithItems,
    generated_at: DateTime<Utc>,
) -> Result<RenderedDocument, WorkerError> {
    let context = TemplateContext {
        contract: &document.contract,
        items: document
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| ItemView { position: i + 1, item })
            .collect(),
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    };
    let content = registry()?.render(TEMPLATE_NAME, &context)?;

    Ok(RenderedDocument { content, page_count: page_count(document.items.len()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use records_core::{BillingCycle, Contract, ContractItem, ContractStatus, ContractType, ItemStatus};
    use records_shared::TenantId;
    use rust_decimal::Decimal;

    fn document(items: usize) -> ContractWithItems {
        let tenant_id = TenantId::new_v4();
        let contract = Contract {
            id: 1,
            tenant_id,
            contract_number: "CTR-2024-001".into(),
            contract_type: ContractType::Service,
            customer_id: 9,
            title: "Support <b>Gold</b> & Maintenance".into(),
            notes: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            billing_cycle: BillingCycle::Monthly,
            status: ContractStatus::Draft,
            signed_at: None,
            signed_by: None,
            total_value: Decimal::new(23000, 2),
            currency: "EUR".into(),
            created_at: Utc::now(),
            created_by: None,
            modified_at: None,
            modified_by: None,
        };
        let items = (0..items)
            .map(|i| ContractItem {
                id: i as i64 + 1,
                tenant_id,
                contract_id: 1,
                service_id: 3,
                description: Some(format!("Line {}", i + 1)),
                quantity: Decimal::ONE,
                unit_price: Decimal::new(1000, 2),
                discount_pct: Decimal::ZERO,
                line_total: Decimal::new(1000, 2),
                status: ItemStatus::Pending,
                sort_order: i as i32,
                created_at: Utc::now(),
            })
            .collect();
        ContractWithItems { contract, items }
    }

    #[test]
    fn test_renders_contract_fields() {
        let rendered = render_contract(&document(2), Utc::now()).unwrap();
        assert!(rendered.content.contains("CTR-2024-001"));
        assert!(rendered.content.contains("Line 2"));
        assert!(rendered.content.contains("230.00"));
        assert_eq!(rendered.page_count, 1);
    }

    #[test]
    fn test_escapes_markup() {
        let rendered = render_contract(&document(0), Utc::now()).unwrap();
        assert!(!rendered.content.contains("<b>Gold</b>"));
        assert!(rendered.content.contains("&lt;b&gt;Gold&lt;"));
        assert!(rendered.content.contains("&amp; Maintenance"));
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(25), 1);
        assert_eq!(page_count(26), 2);
        assert_eq!(render_contract(&document(60), Utc::now()).unwrap().page_count, 3);
    }
}
