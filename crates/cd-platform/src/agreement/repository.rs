//! Agreement Repository

use chrono::NaiveDate;

use super::entity::CommunityAgreement;
use crate::collection::CollectionRepository;
use crate::shared::error::Result;

pub type AgreementRepository = CollectionRepository<CommunityAgreement>;

impl CollectionRepository<CommunityAgreement> {
    /// Agreements of `partner_code` in force on `date`
    pub async fn active_for(&self, partner_code: &str, date: NaiveDate) -> Result<Vec<CommunityAgreement>> {
        let agreements = self.get_all(Some(partner_code)).await?;
        Ok(agreements.into_iter().filter(|a| a.is_effective_on(date)).collect())
    }
}
