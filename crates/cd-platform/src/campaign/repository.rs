//! Campaign Repository

use chrono::Utc;
use tracing::info;

use super::entity::{CampaignStatus, OutreachCampaign};
use crate::audit::{Actor, AuditAction, NewAuditEntry};
use crate::collection::{CollectionRepository, Record};
use crate::shared::error::{PlatformError, Result};

pub type CampaignRepository = CollectionRepository<OutreachCampaign>;

impl CollectionRepository<OutreachCampaign> {
    /// Mark a send as finished and record it as an `EMAIL` audit entry
    pub async fn complete_send(&self, id: &str, sent_count: u32, actor: &Actor) -> Result<OutreachCampaign> {
        let campaign = self
            .modify_silently(id, |campaign| {
                if campaign.status == CampaignStatus::Completed {
                    return Err(PlatformError::validation(format!("Campaign {} was already sent", campaign.id)));
                }
                if sent_count > campaign.audience_size {
                    return Err(PlatformError::validation(format!(
                        "Sent count {} exceeds audience size {}",
                        sent_count, campaign.audience_size
                    )));
                }
                campaign.sent_count = sent_count;
                campaign.status = CampaignStatus::Completed;
                campaign.sent_at = Some(Utc::now());
                Ok(())
            })
            .await?;

        info!(campaign_id = %campaign.id, sent_count, "Campaign send completed");
        self.audit()
            .record(
                NewAuditEntry::new(actor, AuditAction::Email, OutreachCampaign::ENTITY_TYPE)
                    .entity_id(&campaign.id)
                    .partner_code(campaign.partner_code.as_deref())
                    .details(format!("Sent '{}' to {} recipients", campaign.subject, sent_count)),
            )
            .await;
        Ok(campaign)
    }
}
