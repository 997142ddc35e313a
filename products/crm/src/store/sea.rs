use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::{account, activity, contact, deal, lead, pipeline_stage};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    Account, AccountPatch, Activity, ActivityKind, ActivityPatch, Contact, ContactPatch, Deal,
    DealPatch, Lead, LeadPatch, LeadStatus, NewAccount, NewActivity, NewContact, NewDeal, NewLead,
    PipelineStage, closed_at_after, normalize_tags,
};

/// Relational record store over the `entity` tables.
#[derive(Clone, Debug)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    async fn check_stage(&self, stage: &str) -> StoreResult<()> {
        let known = pipeline_stage::Entity::find()
            .filter(pipeline_stage::Column::Name.eq(stage))
            .one(self.connection())
            .await?;
        match known {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownStage(stage.to_string())),
        }
    }
}

fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

// Storage <-> domain mappings, one block per collection.

impl From<pipeline_stage::Model> for PipelineStage {
    fn from(model: pipeline_stage::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            order: model.sort_order,
            color: model.color,
        }
    }
}

impl From<deal::Model> for Deal {
    fn from(model: deal::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            contact_id: model.contact_id,
            value: model.value_cents,
            stage: model.stage,
            probability: model.probability.clamp(0, 100) as u8,
            expected_close_date: model.expected_close_date,
            notes: model.notes,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
            closed_at: model.closed_at.map(utc),
        }
    }
}

fn deal_active_model(deal: &Deal) -> deal::ActiveModel {
    deal::ActiveModel {
        id: Set(deal.id),
        title: Set(deal.title.clone()),
        contact_id: Set(deal.contact_id),
        value_cents: Set(deal.value),
        stage: Set(deal.stage.clone()),
        probability: Set(deal.probability as i16),
        expected_close_date: Set(deal.expected_close_date),
        notes: Set(deal.notes.clone()),
        created_at: Set(deal.created_at.into()),
        updated_at: Set(deal.updated_at.into()),
        closed_at: Set(deal.closed_at.map(Into::into)),
    }
}

impl From<contact::Model> for Contact {
    fn from(model: contact::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            company: model.company,
            title: model.title,
            notes: model.notes,
            gender: model.gender,
            date_of_birth: model.date_of_birth,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

fn contact_active_model(contact: &Contact) -> contact::ActiveModel {
    contact::ActiveModel {
        id: Set(contact.id),
        name: Set(contact.name.clone()),
        email: Set(contact.email.clone()),
        phone: Set(contact.phone.clone()),
        company: Set(contact.company.clone()),
        title: Set(contact.title.clone()),
        notes: Set(contact.notes.clone()),
        gender: Set(contact.gender.clone()),
        date_of_birth: Set(contact.date_of_birth),
        created_at: Set(contact.created_at.into()),
        updated_at: Set(contact.updated_at.into()),
    }
}

fn join_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(","))
    }
}

fn split_tags(raw: Option<String>) -> Vec<String> {
    raw.map(|joined| normalize_tags(joined.split(',').map(str::to_string).collect()))
        .unwrap_or_default()
}

impl From<account::Model> for Account {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            tags: split_tags(model.tags),
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

fn account_active_model(account: &Account) -> account::ActiveModel {
    account::ActiveModel {
        id: Set(account.id),
        name: Set(account.name.clone()),
        email: Set(account.email.clone()),
        phone: Set(account.phone.clone()),
        tags: Set(join_tags(&account.tags)),
        created_at: Set(account.created_at.into()),
        updated_at: Set(account.updated_at.into()),
    }
}

impl From<lead::Status> for LeadStatus {
    fn from(value: lead::Status) -> Self {
        match value {
            lead::Status::New => LeadStatus::New,
            lead::Status::Contacted => LeadStatus::Contacted,
            lead::Status::Qualified => LeadStatus::Qualified,
            lead::Status::Lost => LeadStatus::Lost,
        }
    }
}

impl From<LeadStatus> for lead::Status {
    fn from(value: LeadStatus) -> Self {
        match value {
            LeadStatus::New => lead::Status::New,
            LeadStatus::Contacted => lead::Status::Contacted,
            LeadStatus::Qualified => lead::Status::Qualified,
            LeadStatus::Lost => lead::Status::Lost,
        }
    }
}

impl From<lead::Model> for Lead {
    fn from(model: lead::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            company: model.company,
            title: model.title,
            notes: model.notes,
            status: model.status.into(),
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

fn lead_active_model(lead: &Lead) -> lead::ActiveModel {
    lead::ActiveModel {
        id: Set(lead.id),
        name: Set(lead.name.clone()),
        email: Set(lead.email.clone()),
        phone: Set(lead.phone.clone()),
        company: Set(lead.company.clone()),
        title: Set(lead.title.clone()),
        notes: Set(lead.notes.clone()),
        status: Set(lead.status.into()),
        created_at: Set(lead.created_at.into()),
        updated_at: Set(lead.updated_at.into()),
    }
}

impl From<activity::Kind> for ActivityKind {
    fn from(value: activity::Kind) -> Self {
        match value {
            activity::Kind::Call => ActivityKind::Call,
            activity::Kind::Email => ActivityKind::Email,
            activity::Kind::Meeting => ActivityKind::Meeting,
            activity::Kind::Note => ActivityKind::Note,
        }
    }
}

impl From<ActivityKind> for activity::Kind {
    fn from(value: ActivityKind) -> Self {
        match value {
            ActivityKind::Call => activity::Kind::Call,
            ActivityKind::Email => activity::Kind::Email,
            ActivityKind::Meeting => activity::Kind::Meeting,
            ActivityKind::Note => activity::Kind::Note,
        }
    }
}

impl From<activity::Model> for Activity {
    fn from(model: activity::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind.into(),
            contact_id: model.contact_id,
            deal_id: model.deal_id,
            subject: model.subject,
            description: model.description,
            timestamp: utc(model.timestamp),
            created_by: model.created_by,
        }
    }
}

fn activity_active_model(activity: &Activity) -> activity::ActiveModel {
    activity::ActiveModel {
        id: Set(activity.id),
        kind: Set(activity.kind.into()),
        contact_id: Set(activity.contact_id),
        deal_id: Set(activity.deal_id),
        subject: Set(activity.subject.clone()),
        description: Set(activity.description.clone()),
        timestamp: Set(activity.timestamp.into()),
        created_by: Set(activity.created_by.clone()),
    }
}

/// Stamps `closed_at` whenever the resulting stage is terminal and it is
/// still unset, matching `Deal::apply`.
fn apply_deal_patch(
    active: &mut deal::ActiveModel,
    patch: DealPatch,
    previous: &deal::Model,
    now: DateTime<Utc>,
) {
    if let Some(title) = patch.title {
        active.title = Set(title);
    }
    if let Some(contact_id) = patch.contact_id {
        active.contact_id = Set(contact_id);
    }
    if let Some(value) = patch.value {
        active.value_cents = Set(value);
    }
    if let Some(probability) = patch.probability {
        active.probability = Set(probability as i16);
    }
    if let Some(date) = patch.expected_close_date {
        active.expected_close_date = Set(Some(date));
    }
    if let Some(notes) = patch.notes {
        active.notes = Set(Some(notes));
    }
    let stage = patch.stage.unwrap_or_else(|| previous.stage.clone());
    if previous.closed_at.is_none() {
        if let Some(closed_at) = closed_at_after(None, &stage, now) {
            active.closed_at = Set(Some(closed_at.into()));
        }
    }
    active.stage = Set(stage);
    active.updated_at = Set(now.into());
}

#[async_trait]
impl RecordStore for SeaOrmStore {
    async fn list_stages(&self) -> StoreResult<Vec<PipelineStage>> {
        let rows = pipeline_stage::Entity::find()
            .order_by_asc(pipeline_stage::Column::SortOrder)
            .order_by_asc(pipeline_stage::Column::Name)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(PipelineStage::from).collect())
    }

    async fn list_deals(&self) -> StoreResult<Vec<Deal>> {
        let rows = deal::Entity::find()
            .order_by_desc(deal::Column::CreatedAt)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Deal::from).collect())
    }

    async fn list_deals_for_contact(&self, contact_id: Uuid) -> StoreResult<Vec<Deal>> {
        let rows = deal::Entity::find()
            .filter(deal::Column::ContactId.eq(contact_id))
            .order_by_desc(deal::Column::CreatedAt)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Deal::from).collect())
    }

    async fn get_deal(&self, id: Uuid) -> StoreResult<Option<Deal>> {
        let row = deal::Entity::find_by_id(id).one(self.connection()).await?;
        Ok(row.map(Deal::from))
    }

    async fn create_deal(&self, input: NewDeal) -> StoreResult<Deal> {
        input.check()?;
        self.check_stage(input.stage_or_default()).await?;
        let deal = input.into_deal(Uuid::new_v4(), Utc::now());
        let model = deal_active_model(&deal)
            .insert(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn update_deal(&self, id: Uuid, patch: DealPatch) -> StoreResult<Deal> {
        patch.check()?;
        if let Some(stage) = patch.stage.as_deref() {
            self.check_stage(stage).await?;
        }
        let span = info_span!("crm.store.update_deal", %id, stage = ?patch.stage);
        async move {
            let txn = self.db.begin().await?;
            let existing = deal::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| StoreError::not_found("deal", id))?;
            let mut active: deal::ActiveModel = existing.clone().into();
            apply_deal_patch(&mut active, patch, &existing, Utc::now());
            let updated = active.update(&txn).await?;
            txn.commit().await?;
            debug!(stage = %updated.stage, "deal updated");
            Ok(updated.into())
        }
        .instrument(span)
        .await
    }

    async fn delete_deal(&self, id: Uuid) -> StoreResult<bool> {
        let res = deal::Entity::delete_by_id(id)
            .exec(self.connection())
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn list_contacts(&self) -> StoreResult<Vec<Contact>> {
        let rows = contact::Entity::find()
            .order_by_desc(contact::Column::CreatedAt)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn get_contact(&self, id: Uuid) -> StoreResult<Option<Contact>> {
        let row = contact::Entity::find_by_id(id)
            .one(self.connection())
            .await?;
        Ok(row.map(Contact::from))
    }

    async fn create_contact(&self, input: NewContact) -> StoreResult<Contact> {
        let contact = input.into_contact(Uuid::new_v4(), Utc::now());
        let model = contact_active_model(&contact)
            .insert(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> StoreResult<Contact> {
        let mut current: Contact = contact::Entity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| StoreError::not_found("contact", id))?
            .into();
        current.apply(patch, Utc::now());
        let model = contact_active_model(&current)
            .update(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool> {
        let res = contact::Entity::delete_by_id(id)
            .exec(self.connection())
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = account::Entity::find()
            .order_by_desc(account::Column::CreatedAt)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let row = account::Entity::find_by_id(id)
            .one(self.connection())
            .await?;
        Ok(row.map(Account::from))
    }

    async fn create_account(&self, input: NewAccount) -> StoreResult<Account> {
        let account = input.into_account(Uuid::new_v4(), Utc::now());
        let model = account_active_model(&account)
            .insert(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> StoreResult<Account> {
        let mut current: Account = account::Entity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| StoreError::not_found("account", id))?
            .into();
        current.apply(patch, Utc::now());
        let model = account_active_model(&current)
            .update(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<bool> {
        let res = account::Entity::delete_by_id(id)
            .exec(self.connection())
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
        let rows = lead::Entity::find()
            .order_by_desc(lead::Column::CreatedAt)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Lead::from).collect())
    }

    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>> {
        let row = lead::Entity::find_by_id(id).one(self.connection()).await?;
        Ok(row.map(Lead::from))
    }

    async fn create_lead(&self, input: NewLead) -> StoreResult<Lead> {
        let lead = input.into_lead(Uuid::new_v4(), Utc::now());
        let model = lead_active_model(&lead)
            .insert(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn update_lead(&self, id: Uuid, patch: LeadPatch) -> StoreResult<Lead> {
        let mut current: Lead = lead::Entity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| StoreError::not_found("lead", id))?
            .into();
        current.apply(patch, Utc::now());
        let model = lead_active_model(&current)
            .update(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn delete_lead(&self, id: Uuid) -> StoreResult<bool> {
        let res = lead::Entity::delete_by_id(id)
            .exec(self.connection())
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn list_activities(&self) -> StoreResult<Vec<Activity>> {
        let rows = activity::Entity::find()
            .order_by_desc(activity::Column::Timestamp)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }

    async fn list_activities_for_contact(&self, contact_id: Uuid) -> StoreResult<Vec<Activity>> {
        let rows = activity::Entity::find()
            .filter(activity::Column::ContactId.eq(contact_id))
            .order_by_desc(activity::Column::Timestamp)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }

    async fn list_activities_for_deal(&self, deal_id: Uuid) -> StoreResult<Vec<Activity>> {
        let rows = activity::Entity::find()
            .filter(activity::Column::DealId.eq(deal_id))
            .order_by_desc(activity::Column::Timestamp)
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }

    async fn get_activity(&self, id: Uuid) -> StoreResult<Option<Activity>> {
        let row = activity::Entity::find_by_id(id)
            .one(self.connection())
            .await?;
        Ok(row.map(Activity::from))
    }

    async fn create_activity(&self, input: NewActivity) -> StoreResult<Activity> {
        let activity = input.into_activity(Uuid::new_v4(), Utc::now());
        let model = activity_active_model(&activity)
            .insert(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn update_activity(&self, id: Uuid, patch: ActivityPatch) -> StoreResult<Activity> {
        let mut current: Activity = activity::Entity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| StoreError::not_found("activity", id))?
            .into();
        current.apply(patch);
        let model = activity_active_model(&current)
            .update(self.connection())
            .await?;
        Ok(model.into())
    }

    async fn delete_activity(&self, id: Uuid) -> StoreResult<bool> {
        let res = activity::Entity::delete_by_id(id)
            .exec(self.connection())
            .await?;
        Ok(res.rows_affected > 0)
    }
}
