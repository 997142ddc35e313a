//! Domain records shared by every record store and the pipeline board.
//!
//! Each collection has three shapes: the stored record, a `New*` input for
//! creation and a `*Patch` for partial updates where `None` leaves the field
//! untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Stage every new deal starts in unless told otherwise.
pub const DEFAULT_STAGE: &str = "Lead";
pub const CLOSED_WON: &str = "Closed Won";
pub const CLOSED_LOST: &str = "Closed Lost";
pub const DEFAULT_PROBABILITY: u8 = 25;
/// Upper bound on a deal value in cents.
pub const MAX_DEAL_VALUE: i64 = 1_000_000_000_000_000;
pub const DEFAULT_ACTIVITY_AUTHOR: &str = "Sales Team";

/// Terminal stages close a deal and never show up as a board column.
pub fn is_terminal_stage(name: &str) -> bool {
    name == CLOSED_WON || name == CLOSED_LOST
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub id: Uuid,
    pub name: String,
    pub order: i32,
    pub color: String,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        is_terminal_stage(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    pub contact_id: Uuid,
    /// Minor currency units (cents).
    pub value: i64,
    pub stage: String,
    pub probability: u8,
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Deal {
    pub fn is_open(&self) -> bool {
        !is_terminal_stage(&self.stage)
    }

    pub fn is_won(&self) -> bool {
        self.stage == CLOSED_WON
    }

    /// Applies `patch` and stamps `updated_at`; `closed_at` is stamped the
    /// first time the deal lands in a terminal stage and is never cleared.
    pub(crate) fn apply(&mut self, patch: DealPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(contact_id) = patch.contact_id {
            self.contact_id = contact_id;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(stage) = patch.stage {
            self.stage = stage;
        }
        if let Some(probability) = patch.probability {
            self.probability = probability;
        }
        if let Some(date) = patch.expected_close_date {
            self.expected_close_date = Some(date);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        self.updated_at = now;
        self.closed_at = closed_at_after(self.closed_at, &self.stage, now);
    }
}

pub(crate) fn closed_at_after(
    previous: Option<DateTime<Utc>>,
    stage: &str,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    previous.or_else(|| is_terminal_stage(stage).then_some(now))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeal {
    pub title: String,
    pub contact_id: Uuid,
    pub value: i64,
    pub stage: Option<String>,
    pub probability: Option<u8>,
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewDeal {
    pub fn new(title: impl Into<String>, contact_id: Uuid, value: i64) -> Self {
        Self {
            title: title.into(),
            contact_id,
            value,
            stage: None,
            probability: None,
            expected_close_date: None,
            notes: None,
        }
    }

    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn stage_or_default(&self) -> &str {
        self.stage.as_deref().unwrap_or(DEFAULT_STAGE)
    }

    pub(crate) fn check(&self) -> StoreResult<()> {
        check_deal_numbers(Some(self.value), self.probability)
    }

    pub(crate) fn into_deal(self, id: Uuid, now: DateTime<Utc>) -> Deal {
        let stage = self.stage_or_default().to_string();
        let closed_at = closed_at_after(None, &stage, now);
        Deal {
            id,
            title: self.title,
            contact_id: self.contact_id,
            value: self.value,
            stage,
            probability: self.probability.unwrap_or(DEFAULT_PROBABILITY),
            expected_close_date: self.expected_close_date,
            notes: self.notes,
            created_at: now,
            updated_at: now,
            closed_at,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealPatch {
    pub title: Option<String>,
    pub contact_id: Option<Uuid>,
    pub value: Option<i64>,
    pub stage: Option<String>,
    pub probability: Option<u8>,
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl DealPatch {
    /// The request a kanban drop issues.
    pub fn stage(name: impl Into<String>) -> Self {
        Self {
            stage: Some(name.into()),
            ..Self::default()
        }
    }

    pub(crate) fn check(&self) -> StoreResult<()> {
        check_deal_numbers(self.value, self.probability)
    }
}

fn check_deal_numbers(value: Option<i64>, probability: Option<u8>) -> StoreResult<()> {
    if let Some(value) = value {
        if value < 0 {
            return Err(StoreError::invalid("value", "must not be negative"));
        }
        if value > MAX_DEAL_VALUE {
            return Err(StoreError::invalid("value", "exceeds the maximum deal value"));
        }
    }
    if let Some(probability) = probability {
        if probability > 100 {
            return Err(StoreError::invalid("probability", "must be between 0 and 100"));
        }
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Case-insensitive match on name, email or company.
    pub fn matches(&self, query: &str) -> bool {
        text_matches(
            query,
            [Some(self.name.as_str()), Some(self.email.as_str()), self.company.as_deref()],
        )
    }

    pub(crate) fn apply(&mut self, patch: ContactPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if patch.phone.is_some() {
            self.phone = patch.phone;
        }
        if patch.company.is_some() {
            self.company = patch.company;
        }
        if patch.title.is_some() {
            self.title = patch.title;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes;
        }
        if patch.gender.is_some() {
            self.gender = patch.gender;
        }
        if patch.date_of_birth.is_some() {
            self.date_of_birth = patch.date_of_birth;
        }
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl NewContact {
    pub(crate) fn into_contact(self, id: Uuid, now: DateTime<Utc>) -> Contact {
        Contact {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            title: self.title,
            notes: self.notes,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Case-insensitive match on name, email or any tag.
    pub fn matches(&self, query: &str) -> bool {
        text_matches(
            query,
            [Some(self.name.as_str()), Some(self.email.as_str())]
                .into_iter()
                .chain(self.tags.iter().map(|tag| Some(tag.as_str()))),
        )
    }

    pub(crate) fn apply(&mut self, patch: AccountPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if patch.phone.is_some() {
            self.phone = patch.phone;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub tags: Vec<String>,
}

impl NewAccount {
    pub(crate) fn into_account(self, id: Uuid, now: DateTime<Utc>) -> Account {
        Account {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            tags: normalize_tags(self.tags),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Case-insensitive substring search over the present fields. A blank query
/// matches everything.
fn text_matches<'a>(query: &str, fields: impl IntoIterator<Item = Option<&'a str>>) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty()
        || fields
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
}

/// Trims, drops blanks and strips commas so tags survive the comma-joined column.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.replace(',', " ").trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Lost => "Lost",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Case-insensitive match on name, email or company. A blank query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        text_matches(
            query,
            [Some(self.name.as_str()), Some(self.email.as_str()), self.company.as_deref()],
        )
    }

    pub(crate) fn apply(&mut self, patch: LeadPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if patch.phone.is_some() {
            self.phone = patch.phone;
        }
        if patch.company.is_some() {
            self.company = patch.company;
        }
        if patch.title.is_some() {
            self.title = patch.title;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub status: Option<LeadStatus>,
}

impl NewLead {
    pub(crate) fn into_lead(self, id: Uuid, now: DateTime<Utc>) -> Lead {
        Lead {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            title: self.title,
            notes: self.notes,
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub status: Option<LeadStatus>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    #[default]
    Call,
    Email,
    Meeting,
    Note,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Email => "email",
            Self::Meeting => "meeting",
            Self::Note => "note",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub contact_id: Uuid,
    pub deal_id: Option<Uuid>,
    pub subject: String,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub created_by: String,
}

impl Activity {
    pub(crate) fn apply(&mut self, patch: ActivityPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(contact_id) = patch.contact_id {
            self.contact_id = contact_id;
        }
        if patch.deal_id.is_some() {
            self.deal_id = patch.deal_id;
        }
        if let Some(subject) = patch.subject {
            self.subject = subject;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub kind: Option<ActivityKind>,
    pub contact_id: Uuid,
    pub deal_id: Option<Uuid>,
    pub subject: String,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

impl NewActivity {
    pub(crate) fn into_activity(self, id: Uuid, now: DateTime<Utc>) -> Activity {
        Activity {
            id,
            kind: self.kind.unwrap_or_default(),
            contact_id: self.contact_id,
            deal_id: self.deal_id,
            subject: self.subject,
            description: self.description,
            timestamp: self.timestamp.unwrap_or(now),
            created_by: self
                .created_by
                .filter(|author| !author.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ACTIVITY_AUTHOR.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPatch {
    pub kind: Option<ActivityKind>,
    pub contact_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_deal(stage: &str) -> Deal {
        NewDeal::new("Pilot", Uuid::new_v4(), 10_000)
            .in_stage(stage)
            .into_deal(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn new_deals_default_to_lead() {
        let deal = NewDeal::new("Pilot", Uuid::new_v4(), 1).into_deal(Uuid::new_v4(), Utc::now());
        assert_eq!(deal.stage, DEFAULT_STAGE);
        assert_eq!(deal.probability, DEFAULT_PROBABILITY);
        assert!(deal.closed_at.is_none());
    }

    #[test]
    fn closing_stamps_closed_at_once() {
        let mut deal = sample_deal("Negotiation");
        let first = Utc::now();
        deal.apply(DealPatch::stage(CLOSED_WON), first);
        assert_eq!(deal.closed_at, Some(first));

        let later = first + chrono::Duration::minutes(5);
        deal.apply(DealPatch::stage(CLOSED_LOST), later);
        assert_eq!(deal.closed_at, Some(first));

        deal.apply(DealPatch::stage("Proposal"), later);
        assert_eq!(deal.closed_at, Some(first), "closed_at is never cleared");
        assert_eq!(deal.updated_at, later);
    }

    #[test]
    fn creating_in_terminal_stage_is_closed() {
        let deal = sample_deal(CLOSED_LOST);
        assert_eq!(deal.closed_at, Some(deal.created_at));
        assert!(!deal.is_open());
    }

    #[test]
    fn negative_values_are_rejected() {
        let patch = DealPatch {
            value: Some(-1),
            ..DealPatch::default()
        };
        assert!(matches!(
            patch.check(),
            Err(StoreError::Invalid { field: "value", .. })
        ));
        let patch = DealPatch {
            probability: Some(101),
            ..DealPatch::default()
        };
        assert!(patch.check().is_err());
    }

    #[test]
    fn oversized_values_are_rejected() {
        let deal = NewDeal::new("Too big", Uuid::new_v4(), MAX_DEAL_VALUE + 1);
        assert!(matches!(
            deal.check(),
            Err(StoreError::Invalid { field: "value", .. })
        ));
        assert!(NewDeal::new("Ceiling", Uuid::new_v4(), MAX_DEAL_VALUE).check().is_ok());
    }

    #[test]
    fn lead_search_covers_name_email_and_company() {
        let lead = NewLead {
            name: "Ada Lovelace".into(),
            email: "ada@analytical.test".into(),
            company: Some("Analytical Engines".into()),
            ..NewLead::default()
        }
        .into_lead(Uuid::new_v4(), Utc::now());
        assert!(lead.matches("ada"));
        assert!(lead.matches("ENGINES"));
        assert!(lead.matches("  "));
        assert!(!lead.matches("babbage"));
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn contact_search_covers_name_email_and_company() {
        let contact = NewContact {
            name: "Grace Hopper".into(),
            email: "grace@navy.test".into(),
            company: Some("US Navy".into()),
            ..NewContact::default()
        }
        .into_contact(Uuid::new_v4(), Utc::now());
        assert!(contact.matches("hopper"));
        assert!(contact.matches("NAVY.TEST"));
        assert!(contact.matches("us navy"));
        assert!(!contact.matches("cobol"));
    }

    #[test]
    fn account_search_covers_tags() {
        let account = NewAccount {
            name: "Globex".into(),
            email: "hello@globex.test".into(),
            phone: None,
            tags: vec!["enterprise".into(), "EMEA".into()],
        }
        .into_account(Uuid::new_v4(), Utc::now());
        assert!(account.matches("emea"));
        assert!(account.matches("glob"));
        assert!(account.matches(""));
        assert!(!account.matches("startup"));
    }

    #[test]
    fn tags_are_trimmed_and_comma_free() {
        let tags = normalize_tags(vec![" vip ".into(), "".into(), "a,b".into()]);
        assert_eq!(tags, vec!["vip".to_string(), "a b".to_string()]);
    }

    #[test]
    fn activities_fall_back_to_team_author() {
        let activity = NewActivity {
            kind: None,
            contact_id: Uuid::new_v4(),
            deal_id: None,
            subject: "Intro call".into(),
            description: None,
            timestamp: None,
            created_by: Some("  ".into()),
        }
        .into_activity(Uuid::new_v4(), Utc::now());
        assert_eq!(activity.created_by, DEFAULT_ACTIVITY_AUTHOR);
        assert_eq!(activity.kind, ActivityKind::Call);
    }
}
