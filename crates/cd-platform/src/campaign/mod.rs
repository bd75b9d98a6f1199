//! Outreach Campaign Aggregate

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::{CampaignStatus, OutreachCampaign};
pub use repository::CampaignRepository;
pub use api::{campaigns_router, CampaignsState};
