//! The record-storage collaborator.
//!
//! Stores hand back plain typed records. Listings are newest first, stages are
//! ascending by `order`. Updates are partial and the store owns the
//! `updated_at`/`closed_at` stamps.

mod memory;
mod sea;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::model::{
    Account, AccountPatch, Activity, ActivityPatch, Contact, ContactPatch, Deal, DealPatch, Lead,
    LeadPatch, NewAccount, NewActivity, NewContact, NewDeal, NewLead, PipelineStage,
};

pub use memory::MemoryStore;
pub use sea::SeaOrmStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_stages(&self) -> StoreResult<Vec<PipelineStage>>;

    async fn list_deals(&self) -> StoreResult<Vec<Deal>>;
    async fn list_deals_for_contact(&self, contact_id: Uuid) -> StoreResult<Vec<Deal>>;
    async fn get_deal(&self, id: Uuid) -> StoreResult<Option<Deal>>;
    async fn create_deal(&self, input: NewDeal) -> StoreResult<Deal>;
    async fn update_deal(&self, id: Uuid, patch: DealPatch) -> StoreResult<Deal>;
    async fn delete_deal(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_contacts(&self) -> StoreResult<Vec<Contact>>;
    async fn get_contact(&self, id: Uuid) -> StoreResult<Option<Contact>>;
    async fn create_contact(&self, input: NewContact) -> StoreResult<Contact>;
    async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> StoreResult<Contact>;
    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;
    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn create_account(&self, input: NewAccount) -> StoreResult<Account>;
    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> StoreResult<Account>;
    async fn delete_account(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_leads(&self) -> StoreResult<Vec<Lead>>;
    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>>;
    async fn create_lead(&self, input: NewLead) -> StoreResult<Lead>;
    async fn update_lead(&self, id: Uuid, patch: LeadPatch) -> StoreResult<Lead>;
    async fn delete_lead(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_activities(&self) -> StoreResult<Vec<Activity>>;
    async fn list_activities_for_contact(&self, contact_id: Uuid) -> StoreResult<Vec<Activity>>;
    async fn list_activities_for_deal(&self, deal_id: Uuid) -> StoreResult<Vec<Activity>>;
    async fn get_activity(&self, id: Uuid) -> StoreResult<Option<Activity>>;
    async fn create_activity(&self, input: NewActivity) -> StoreResult<Activity>;
    async fn update_activity(&self, id: Uuid, patch: ActivityPatch) -> StoreResult<Activity>;
    async fn delete_activity(&self, id: Uuid) -> StoreResult<bool>;
}
