//! Developer Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Record;
use crate::shared::error::Result;
use crate::storage::CollectionKey;

/// Certification outcome. `Pass` is what billing counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum Grade {
    Pass,
    Fail,
    #[default]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperRecord {
    #[serde(default = "crate::shared::new_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub partner_code: String,
    #[serde(default)]
    pub wallet_address: String,
    /// 0 to 100
    #[serde(default)]
    pub completion_percentage: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub grade: Grade,
    #[serde(default)]
    pub sybil_flagged: bool,
    /// When the grade last moved to `Pass`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl DeveloperRecord {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        partner_code: impl Into<String>,
        wallet_address: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::shared::new_id(),
            email: email.into(),
            name: name.into(),
            partner_code: partner_code.into(),
            wallet_address: wallet_address.into(),
            completion_percentage: 0.0,
            score: 0.0,
            grade: Grade::Pending,
            sybil_flagged: false,
            passed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_grade(mut self, grade: Grade) -> Self {
        self.grade = grade;
        self.passed_at = (grade == Grade::Pass).then(Utc::now);
        self
    }

    /// Wallet in the form used for uniqueness checks
    pub fn wallet_key(&self) -> Option<String> {
        let wallet = self.wallet_address.trim();
        if wallet.is_empty() {
            None
        } else {
            Some(wallet.to_ascii_lowercase())
        }
    }

    pub fn is_passed(&self) -> bool {
        self.grade == Grade::Pass
    }

    /// Certification time used for billing. Records stored before
    /// `passedAt` existed fall back to their creation time.
    pub fn certified_at(&self) -> Option<DateTime<Utc>> {
        if self.is_passed() {
            Some(self.passed_at.unwrap_or(self.created_at))
        } else {
            None
        }
    }
}

impl Record for DeveloperRecord {
    const COLLECTION: CollectionKey = CollectionKey::Developers;
    const ENTITY_TYPE: &'static str = "Developer";
    const TENANT_SCOPED: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn partner_code(&self) -> Option<&str> {
        Some(&self.partner_code)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn before_insert(&mut self, existing: &[Self]) -> Result<()> {
        if let Some(wallet) = self.wallet_key() {
            if existing.iter().any(|d| d.wallet_key().as_deref() == Some(wallet.as_str())) {
                self.sybil_flagged = true;
            }
        }
        if self.is_passed() && self.passed_at.is_none() {
            self.passed_at = Some(Utc::now());
        }
        Ok(())
    }

    fn before_replace(&mut self, previous: &Self) -> Result<()> {
        self.passed_at = match (previous.is_passed(), self.is_passed()) {
            (_, false) => None,
            (false, true) => Some(Utc::now()),
            (true, true) => previous.passed_at.or(self.passed_at),
        };
        Ok(())
    }
}
