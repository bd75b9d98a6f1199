//! Community Agreement Entity
//!
//! Commercial terms under which a partner community is billed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Record;
use crate::invoice::Currency;
use crate::storage::CollectionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentModel {
    /// Billed per developer reaching a `Pass` grade
    #[serde(rename = "Per_Certification")]
    PerCertification,
    /// Flat amount each billing cycle
    #[serde(rename = "Fixed_Recurring")]
    FixedRecurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityAgreement {
    #[serde(default = "crate::shared::new_id")]
    pub id: String,
    pub partner_code: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub contact_email: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub payment_model: PaymentModel,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub fixed_amount: f64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub payment_method: String,
    /// e.g. "Net 30"
    #[serde(default)]
    pub payment_terms: String,
}

fn default_active() -> bool {
    true
}

impl CommunityAgreement {
    /// Active and `date` falls inside the validity window
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.start_date <= date && self.end_date.map_or(true, |end| date <= end)
    }

    /// Days until payment is due, parsed from terms such as "Net 45". Defaults to 30.
    pub fn payment_terms_days(&self) -> i64 {
        self.payment_terms
            .split_whitespace()
            .find_map(|part| part.parse::<i64>().ok())
            .filter(|days| *days >= 0)
            .unwrap_or(30)
    }
}

impl Record for CommunityAgreement {
    const COLLECTION: CollectionKey = CollectionKey::Agreements;
    const ENTITY_TYPE: &'static str = "Agreement";
    const TENANT_SCOPED: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn partner_code(&self) -> Option<&str> {
        Some(&self.partner_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agreement() -> CommunityAgreement {
        serde_json::from_value(json!({
            "partnerCode": "P1",
            "startDate": "2024-01-01",
            "endDate": "2024-12-31",
            "paymentModel": "Per_Certification",
            "unitPrice": 40.0,
            "paymentTerms": "Net 45"
        }))
        .unwrap()
    }

    #[test]
    fn test_payment_model_wire_names() {
        assert_eq!(serde_json::to_value(PaymentModel::FixedRecurring).unwrap(), json!("Fixed_Recurring"));
        assert_eq!(agreement().payment_model, PaymentModel::PerCertification);
    }

    #[test]
    fn test_effective_window() {
        let a = agreement();
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert!(a.is_effective_on(date("2024-06-01")));
        assert!(a.is_effective_on(date("2024-12-31")));
        assert!(!a.is_effective_on(date("2025-01-01")));

        let inactive = CommunityAgreement { is_active: false, ..a };
        assert!(!inactive.is_effective_on(date("2024-06-01")));
    }

    #[test]
    fn test_payment_terms_days() {
        assert_eq!(agreement().payment_terms_days(), 45);
        let blank = CommunityAgreement {
            payment_terms: String::new(),
            ..agreement()
        };
        assert_eq!(blank.payment_terms_days(), 30);
    }
}
