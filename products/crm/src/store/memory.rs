use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    Account, AccountPatch, Activity, ActivityPatch, Contact, ContactPatch, Deal, DealPatch, Lead,
    LeadPatch, NewAccount, NewActivity, NewContact, NewDeal, NewLead, PipelineStage,
};
use crate::pipeline::default_stages;

/// In-memory mock of the record store.
///
/// Rows live in insertion order and are listed newest first. Reads and writes
/// can be made to fail on demand, and deal updates are counted, so board
/// behaviour can be exercised without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    deal_updates: AtomicUsize,
}

#[derive(Debug, Default)]
struct Tables {
    stages: Vec<PipelineStage>,
    deals: Vec<Deal>,
    contacts: Vec<Contact>,
    accounts: Vec<Account>,
    leads: Vec<Lead>,
    activities: Vec<Activity>,
}

trait Keyed {
    const COLLECTION: &'static str;
    fn key(&self) -> Uuid;
}

macro_rules! keyed {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(impl Keyed for $ty {
            const COLLECTION: &'static str = $name;
            fn key(&self) -> Uuid {
                self.id
            }
        })*
    };
}

keyed!(
    Deal => "deal",
    Contact => "contact",
    Account => "account",
    Lead => "lead",
    Activity => "activity",
);

fn newest_first<T: Clone>(rows: &[T]) -> Vec<T> {
    rows.iter().rev().cloned().collect()
}

fn find<T: Keyed + Clone>(rows: &[T], id: Uuid) -> Option<T> {
    rows.iter().find(|row| row.key() == id).cloned()
}

fn row_mut<T: Keyed>(rows: &mut [T], id: Uuid) -> StoreResult<&mut T> {
    rows.iter_mut()
        .find(|row| row.key() == id)
        .ok_or_else(|| StoreError::not_found(T::COLLECTION, id))
}

fn remove<T: Keyed>(rows: &mut Vec<T>, id: Uuid) -> bool {
    let before = rows.len();
    rows.retain(|row| row.key() != id);
    rows.len() != before
}

impl MemoryStore {
    /// A store seeded with the default pipeline stages and no records.
    pub fn new() -> Self {
        Self::with_stages(default_stages())
    }

    pub fn with_stages(stages: Vec<PipelineStage>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                stages,
                ..Tables::default()
            }),
            ..Self::default()
        }
    }

    /// Inserts a fully formed deal as-is, bypassing stamping and checks.
    pub async fn insert_deal(&self, deal: Deal) {
        self.tables.write().await.deals.push(deal);
    }

    pub async fn insert_contact(&self, contact: Contact) {
        self.tables.write().await.contacts.push(contact);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `update_deal` calls received, including failed ones.
    pub fn deal_update_calls(&self) -> usize {
        self.deal_updates.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            debug!("memory store rejecting read");
            return Err(StoreError::Unavailable("read rejected by memory store".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            debug!("memory store rejecting write");
            return Err(StoreError::Unavailable("write rejected by memory store".into()));
        }
        Ok(())
    }
}

impl Tables {
    fn check_stage(&self, stage: &str) -> StoreResult<()> {
        if self.stages.iter().any(|known| known.name == stage) {
            Ok(())
        } else {
            Err(StoreError::UnknownStage(stage.to_string()))
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_stages(&self) -> StoreResult<Vec<PipelineStage>> {
        self.check_read()?;
        let mut stages = self.tables.read().await.stages.clone();
        stages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(stages)
    }

    async fn list_deals(&self) -> StoreResult<Vec<Deal>> {
        self.check_read()?;
        Ok(newest_first(&self.tables.read().await.deals))
    }

    async fn list_deals_for_contact(&self, contact_id: Uuid) -> StoreResult<Vec<Deal>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        Ok(tables
            .deals
            .iter()
            .rev()
            .filter(|deal| deal.contact_id == contact_id)
            .cloned()
            .collect())
    }

    async fn get_deal(&self, id: Uuid) -> StoreResult<Option<Deal>> {
        self.check_read()?;
        Ok(find(&self.tables.read().await.deals, id))
    }

    async fn create_deal(&self, input: NewDeal) -> StoreResult<Deal> {
        self.check_write()?;
        input.check()?;
        let mut tables = self.tables.write().await;
        tables.check_stage(input.stage_or_default())?;
        let deal = input.into_deal(Uuid::new_v4(), Utc::now());
        tables.deals.push(deal.clone());
        Ok(deal)
    }

    async fn update_deal(&self, id: Uuid, patch: DealPatch) -> StoreResult<Deal> {
        self.deal_updates.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        patch.check()?;
        let mut tables = self.tables.write().await;
        if let Some(stage) = patch.stage.as_deref() {
            tables.check_stage(stage)?;
        }
        let deal = row_mut(&mut tables.deals, id)?;
        deal.apply(patch, Utc::now());
        Ok(deal.clone())
    }

    async fn delete_deal(&self, id: Uuid) -> StoreResult<bool> {
        self.check_write()?;
        Ok(remove(&mut self.tables.write().await.deals, id))
    }

    async fn list_contacts(&self) -> StoreResult<Vec<Contact>> {
        self.check_read()?;
        Ok(newest_first(&self.tables.read().await.contacts))
    }

    async fn get_contact(&self, id: Uuid) -> StoreResult<Option<Contact>> {
        self.check_read()?;
        Ok(find(&self.tables.read().await.contacts, id))
    }

    async fn create_contact(&self, input: NewContact) -> StoreResult<Contact> {
        self.check_write()?;
        let contact = input.into_contact(Uuid::new_v4(), Utc::now());
        self.tables.write().await.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> StoreResult<Contact> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let contact = row_mut(&mut tables.contacts, id)?;
        contact.apply(patch, Utc::now());
        Ok(contact.clone())
    }

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool> {
        self.check_write()?;
        Ok(remove(&mut self.tables.write().await.contacts, id))
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        self.check_read()?;
        Ok(newest_first(&self.tables.read().await.accounts))
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        self.check_read()?;
        Ok(find(&self.tables.read().await.accounts, id))
    }

    async fn create_account(&self, input: NewAccount) -> StoreResult<Account> {
        self.check_write()?;
        let account = input.into_account(Uuid::new_v4(), Utc::now());
        self.tables.write().await.accounts.push(account.clone());
        Ok(account)
    }

    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> StoreResult<Account> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let account = row_mut(&mut tables.accounts, id)?;
        account.apply(patch, Utc::now());
        Ok(account.clone())
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<bool> {
        self.check_write()?;
        Ok(remove(&mut self.tables.write().await.accounts, id))
    }

    async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
        self.check_read()?;
        Ok(newest_first(&self.tables.read().await.leads))
    }

    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>> {
        self.check_read()?;
        Ok(find(&self.tables.read().await.leads, id))
    }

    async fn create_lead(&self, input: NewLead) -> StoreResult<Lead> {
        self.check_write()?;
        let lead = input.into_lead(Uuid::new_v4(), Utc::now());
        self.tables.write().await.leads.push(lead.clone());
        Ok(lead)
    }

    async fn update_lead(&self, id: Uuid, patch: LeadPatch) -> StoreResult<Lead> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let lead = row_mut(&mut tables.leads, id)?;
        lead.apply(patch, Utc::now());
        Ok(lead.clone())
    }

    async fn delete_lead(&self, id: Uuid) -> StoreResult<bool> {
        self.check_write()?;
        Ok(remove(&mut self.tables.write().await.leads, id))
    }

    async fn list_activities(&self) -> StoreResult<Vec<Activity>> {
        self.check_read()?;
        let mut rows = newest_first(&self.tables.read().await.activities);
        rows.sort_by_key(|activity| Reverse(activity.timestamp));
        Ok(rows)
    }

    async fn list_activities_for_contact(&self, contact_id: Uuid) -> StoreResult<Vec<Activity>> {
        let mut rows = self.list_activities().await?;
        rows.retain(|activity| activity.contact_id == contact_id);
        Ok(rows)
    }

    async fn list_activities_for_deal(&self, deal_id: Uuid) -> StoreResult<Vec<Activity>> {
        let mut rows = self.list_activities().await?;
        rows.retain(|activity| activity.deal_id == Some(deal_id));
        Ok(rows)
    }

    async fn get_activity(&self, id: Uuid) -> StoreResult<Option<Activity>> {
        self.check_read()?;
        Ok(find(&self.tables.read().await.activities, id))
    }

    async fn create_activity(&self, input: NewActivity) -> StoreResult<Activity> {
        self.check_write()?;
        let activity = input.into_activity(Uuid::new_v4(), Utc::now());
        self.tables.write().await.activities.push(activity.clone());
        Ok(activity)
    }

    async fn update_activity(&self, id: Uuid, patch: ActivityPatch) -> StoreResult<Activity> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let activity = row_mut(&mut tables.activities, id)?;
        activity.apply(patch);
        Ok(activity.clone())
    }

    async fn delete_activity(&self, id: Uuid) -> StoreResult<bool> {
        self.check_write()?;
        Ok(remove(&mut self.tables.write().await.activities, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CLOSED_WON, DEFAULT_STAGE};

    #[tokio::test]
    async fn stages_list_in_board_order() {
        let store = MemoryStore::new();
        let names: Vec<String> = store
            .list_stages()
            .await
            .unwrap()
            .into_iter()
            .map(|stage| stage.name)
            .collect();
        assert_eq!(
            names,
            ["Lead", "Qualified", "Proposal", "Negotiation", "Closed Won", "Closed Lost"]
        );
    }

    #[tokio::test]
    async fn update_stamps_closed_at_on_terminal_stage() {
        let store = MemoryStore::new();
        let deal = store
            .create_deal(NewDeal::new("Renewal", Uuid::new_v4(), 42_00))
            .await
            .unwrap();
        assert_eq!(deal.stage, DEFAULT_STAGE);

        let won = store
            .update_deal(deal.id, DealPatch::stage(CLOSED_WON))
            .await
            .unwrap();
        assert!(won.closed_at.is_some());
        assert!(won.updated_at >= deal.updated_at);
        assert_eq!(store.deal_update_calls(), 1);
    }

    #[tokio::test]
    async fn closed_deal_without_timestamp_is_stamped_by_any_patch() {
        let store = MemoryStore::new();
        let mut deal = NewDeal::new("Legacy", Uuid::new_v4(), 10)
            .in_stage(CLOSED_WON)
            .into_deal(Uuid::new_v4(), Utc::now());
        deal.closed_at = None;
        store.insert_deal(deal.clone()).await;

        let patch = DealPatch {
            notes: Some("imported".into()),
            ..DealPatch::default()
        };
        let updated = store.update_deal(deal.id, patch).await.unwrap();
        assert_eq!(updated.stage, CLOSED_WON);
        assert!(updated.closed_at.is_some());
    }

    #[tokio::test]
    async fn unknown_stage_and_missing_deal_are_rejected() {
        let store = MemoryStore::new();
        let deal = store
            .create_deal(NewDeal::new("Renewal", Uuid::new_v4(), 1))
            .await
            .unwrap();
        let err = store
            .update_deal(deal.id, DealPatch::stage("Limbo"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownStage(ref name) if name == "Limbo"));

        let err = store
            .update_deal(Uuid::new_v4(), DealPatch::stage("Proposal"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_unavailable() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);
        assert!(matches!(
            store.list_deals().await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_fail_reads(false);
        store.set_fail_writes(true);
        assert!(store.create_contact(NewContact::default()).await.is_err());
        assert!(store.list_contacts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_deletes_report_presence() {
        let store = MemoryStore::new();
        let first = store
            .create_lead(NewLead {
                name: "First".into(),
                ..NewLead::default()
            })
            .await
            .unwrap();
        let second = store
            .create_lead(NewLead {
                name: "Second".into(),
                ..NewLead::default()
            })
            .await
            .unwrap();
        let ids: Vec<Uuid> = store
            .list_leads()
            .await
            .unwrap()
            .iter()
            .map(|lead| lead.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);

        assert!(store.delete_lead(first.id).await.unwrap());
        assert!(!store.delete_lead(first.id).await.unwrap());
    }
}
