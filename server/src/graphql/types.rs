use async_graphql::{Enum, ID, InputObject, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use products_crm::dashboard::{Dashboard, DashboardMetrics, StageBreakdown};
use products_crm::{
    Account, AccountPatch, Activity, ActivityKind, ActivityPatch, BoardColumn, Contact,
    ContactPatch, Deal, DealPatch, Lead, LeadPatch, LeadStatus, NewAccount, NewActivity,
    NewContact, NewDeal, NewLead, PipelineStage, StageAggregate,
};

use super::{GqlResult, parse_uuid, probability};

fn id(value: uuid::Uuid) -> ID {
    ID::from(value.to_string())
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineStage")]
pub struct PipelineStageNode {
    pub id: ID,
    pub name: String,
    pub order: i32,
    pub color: String,
    pub terminal: bool,
}

impl From<&PipelineStage> for PipelineStageNode {
    fn from(stage: &PipelineStage) -> Self {
        Self {
            id: id(stage.id),
            name: stage.name.clone(),
            order: stage.order,
            color: stage.color.clone(),
            terminal: stage.is_terminal(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Deal")]
pub struct DealNode {
    pub id: ID,
    pub title: String,
    #[graphql(name = "contactId")]
    pub contact_id: ID,
    #[graphql(name = "valueCents")]
    pub value_cents: i64,
    pub stage: String,
    pub probability: i32,
    #[graphql(name = "expectedCloseDate")]
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[graphql(name = "closedAt")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Deal> for DealNode {
    fn from(deal: Deal) -> Self {
        Self {
            id: id(deal.id),
            title: deal.title,
            contact_id: id(deal.contact_id),
            value_cents: deal.value,
            stage: deal.stage,
            probability: i32::from(deal.probability),
            expected_close_date: deal.expected_close_date,
            notes: deal.notes,
            created_at: deal.created_at,
            updated_at: deal.updated_at,
            closed_at: deal.closed_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "StageAggregate")]
pub struct StageAggregateNode {
    pub count: i32,
    #[graphql(name = "totalValueCents")]
    pub total_value_cents: i64,
}

impl From<StageAggregate> for StageAggregateNode {
    fn from(aggregate: StageAggregate) -> Self {
        Self {
            count: aggregate.count as i32,
            total_value_cents: aggregate.total_value,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineCard")]
pub struct PipelineCardNode {
    pub deal: DealNode,
    #[graphql(name = "contactName")]
    pub contact_name: Option<String>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineColumn")]
pub struct PipelineColumnNode {
    pub stage: PipelineStageNode,
    pub aggregate: StageAggregateNode,
    pub cards: Vec<PipelineCardNode>,
}

impl PipelineColumnNode {
    pub fn from_column(
        column: BoardColumn,
        contact_name: impl Fn(uuid::Uuid) -> Option<String>,
    ) -> Self {
        Self {
            stage: PipelineStageNode::from(&column.stage),
            aggregate: column.aggregate.into(),
            cards: column
                .deals
                .into_iter()
                .map(|deal| PipelineCardNode {
                    contact_name: contact_name(deal.contact_id),
                    deal: deal.into(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineBoard")]
pub struct PipelineBoardNode {
    pub columns: Vec<PipelineColumnNode>,
    #[graphql(name = "totalCount")]
    pub total_count: i32,
    #[graphql(name = "totalValueCents")]
    pub total_value_cents: i64,
}

impl PipelineBoardNode {
    pub fn new(columns: Vec<PipelineColumnNode>) -> Self {
        let total_count = columns.iter().map(|column| column.aggregate.count).sum();
        let total_value_cents = columns
            .iter()
            .fold(0i64, |total, column| {
                total.saturating_add(column.aggregate.total_value_cents)
            });
        Self {
            columns,
            total_count,
            total_value_cents,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MoveDealStagePayload {
    pub deal: DealNode,
    /// False when the deal already sat in the requested stage.
    pub moved: bool,
    pub message: Option<String>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Contact")]
pub struct ContactNode {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub gender: Option<String>,
    #[graphql(name = "dateOfBirth")]
    pub date_of_birth: Option<NaiveDate>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Contact> for ContactNode {
    fn from(contact: Contact) -> Self {
        Self {
            id: id(contact.id),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            company: contact.company,
            title: contact.title,
            notes: contact.notes,
            gender: contact.gender,
            date_of_birth: contact.date_of_birth,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Account")]
pub struct AccountNode {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub tags: Vec<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountNode {
    fn from(account: Account) -> Self {
        Self {
            id: id(account.id),
            name: account.name,
            email: account.email,
            phone: account.phone,
            tags: account.tags,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum LeadStatusGql {
    #[graphql(name = "NEW")]
    New,
    #[graphql(name = "CONTACTED")]
    Contacted,
    #[graphql(name = "QUALIFIED")]
    Qualified,
    #[graphql(name = "LOST")]
    Lost,
}

impl From<LeadStatus> for LeadStatusGql {
    fn from(value: LeadStatus) -> Self {
        match value {
            LeadStatus::New => Self::New,
            LeadStatus::Contacted => Self::Contacted,
            LeadStatus::Qualified => Self::Qualified,
            LeadStatus::Lost => Self::Lost,
        }
    }
}

impl From<LeadStatusGql> for LeadStatus {
    fn from(value: LeadStatusGql) -> Self {
        match value {
            LeadStatusGql::New => Self::New,
            LeadStatusGql::Contacted => Self::Contacted,
            LeadStatusGql::Qualified => Self::Qualified,
            LeadStatusGql::Lost => Self::Lost,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Lead")]
pub struct LeadNode {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub status: LeadStatusGql,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Lead> for LeadNode {
    fn from(lead: Lead) -> Self {
        Self {
            id: id(lead.id),
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            company: lead.company,
            title: lead.title,
            notes: lead.notes,
            status: lead.status.into(),
            created_at: lead.created_at,
            updated_at: lead.updated_at,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActivityKindGql {
    #[graphql(name = "CALL")]
    Call,
    #[graphql(name = "EMAIL")]
    Email,
    #[graphql(name = "MEETING")]
    Meeting,
    #[graphql(name = "NOTE")]
    Note,
}

impl From<ActivityKind> for ActivityKindGql {
    fn from(value: ActivityKind) -> Self {
        match value {
            ActivityKind::Call => Self::Call,
            ActivityKind::Email => Self::Email,
            ActivityKind::Meeting => Self::Meeting,
            ActivityKind::Note => Self::Note,
        }
    }
}

impl From<ActivityKindGql> for ActivityKind {
    fn from(value: ActivityKindGql) -> Self {
        match value {
            ActivityKindGql::Call => Self::Call,
            ActivityKindGql::Email => Self::Email,
            ActivityKindGql::Meeting => Self::Meeting,
            ActivityKindGql::Note => Self::Note,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Activity")]
pub struct ActivityNode {
    pub id: ID,
    pub kind: ActivityKindGql,
    #[graphql(name = "contactId")]
    pub contact_id: ID,
    #[graphql(name = "dealId")]
    pub deal_id: Option<ID>,
    pub subject: String,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[graphql(name = "createdBy")]
    pub created_by: String,
}

impl From<Activity> for ActivityNode {
    fn from(activity: Activity) -> Self {
        Self {
            id: id(activity.id),
            kind: activity.kind.into(),
            contact_id: id(activity.contact_id),
            deal_id: activity.deal_id.map(id),
            subject: activity.subject,
            description: activity.description,
            timestamp: activity.timestamp,
            created_by: activity.created_by,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "DashboardMetrics")]
pub struct DashboardMetricsNode {
    #[graphql(name = "totalPipelineCents")]
    pub total_pipeline_cents: i64,
    #[graphql(name = "activeDeals")]
    pub active_deals: i32,
    #[graphql(name = "wonValueCents")]
    pub won_value_cents: i64,
    #[graphql(name = "conversionRate")]
    pub conversion_rate: f64,
    #[graphql(name = "totalContacts")]
    pub total_contacts: i32,
}

impl From<DashboardMetrics> for DashboardMetricsNode {
    fn from(metrics: DashboardMetrics) -> Self {
        Self {
            total_pipeline_cents: metrics.total_pipeline,
            active_deals: metrics.active_deals as i32,
            won_value_cents: metrics.won_value,
            conversion_rate: metrics.conversion_rate,
            total_contacts: metrics.total_contacts as i32,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "StageBreakdown")]
pub struct StageBreakdownNode {
    pub stage: String,
    pub aggregate: StageAggregateNode,
}

impl From<StageBreakdown> for StageBreakdownNode {
    fn from(row: StageBreakdown) -> Self {
        Self {
            stage: row.stage,
            aggregate: row.aggregate.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Dashboard")]
pub struct DashboardNode {
    pub metrics: DashboardMetricsNode,
    pub stages: Vec<StageBreakdownNode>,
    #[graphql(name = "recentActivities")]
    pub recent_activities: Vec<ActivityNode>,
}

impl From<Dashboard> for DashboardNode {
    fn from(dashboard: Dashboard) -> Self {
        Self {
            metrics: dashboard.metrics.into(),
            stages: dashboard.stages.into_iter().map(Into::into).collect(),
            recent_activities: dashboard
                .recent_activities
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewDealInput {
    pub title: String,
    #[graphql(name = "contactId")]
    pub contact_id: ID,
    #[graphql(name = "valueCents")]
    pub value_cents: i64,
    pub stage: Option<String>,
    pub probability: Option<i32>,
    #[graphql(name = "expectedCloseDate")]
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewDealInput {
    pub fn into_domain(self) -> GqlResult<NewDeal> {
        Ok(NewDeal {
            title: self.title,
            contact_id: parse_uuid(&self.contact_id)?,
            value: self.value_cents,
            stage: self.stage,
            probability: self.probability.map(probability).transpose()?,
            expected_close_date: self.expected_close_date,
            notes: self.notes,
        })
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateDealInput {
    pub id: ID,
    pub title: Option<String>,
    #[graphql(name = "contactId")]
    pub contact_id: Option<ID>,
    #[graphql(name = "valueCents")]
    pub value_cents: Option<i64>,
    pub stage: Option<String>,
    pub probability: Option<i32>,
    #[graphql(name = "expectedCloseDate")]
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl UpdateDealInput {
    pub fn into_domain(self) -> GqlResult<(uuid::Uuid, DealPatch)> {
        let patch = DealPatch {
            title: self.title,
            contact_id: self.contact_id.as_ref().map(parse_uuid).transpose()?,
            value: self.value_cents,
            stage: self.stage,
            probability: self.probability.map(probability).transpose()?,
            expected_close_date: self.expected_close_date,
            notes: self.notes,
        };
        Ok((parse_uuid(&self.id)?, patch))
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewContactInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub gender: Option<String>,
    #[graphql(name = "dateOfBirth")]
    pub date_of_birth: Option<NaiveDate>,
}

impl From<NewContactInput> for NewContact {
    fn from(input: NewContactInput) -> Self {
        Self {
            name: input.name,
            email: input.email,
            phone: input.phone,
            company: input.company,
            title: input.title,
            notes: input.notes,
            gender: input.gender,
            date_of_birth: input.date_of_birth,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateContactInput {
    pub id: ID,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub gender: Option<String>,
    #[graphql(name = "dateOfBirth")]
    pub date_of_birth: Option<NaiveDate>,
}

impl UpdateContactInput {
    pub fn into_domain(self) -> GqlResult<(uuid::Uuid, ContactPatch)> {
        Ok((
            parse_uuid(&self.id)?,
            ContactPatch {
                name: self.name,
                email: self.email,
                phone: self.phone,
                company: self.company,
                title: self.title,
                notes: self.notes,
                gender: self.gender,
                date_of_birth: self.date_of_birth,
            },
        ))
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewAccountInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[graphql(default)]
    pub tags: Vec<String>,
}

impl From<NewAccountInput> for NewAccount {
    fn from(input: NewAccountInput) -> Self {
        Self {
            name: input.name,
            email: input.email,
            phone: input.phone,
            tags: input.tags,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateAccountInput {
    pub id: ID,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdateAccountInput {
    pub fn into_domain(self) -> GqlResult<(uuid::Uuid, AccountPatch)> {
        Ok((
            parse_uuid(&self.id)?,
            AccountPatch {
                name: self.name,
                email: self.email,
                phone: self.phone,
                tags: self.tags,
            },
        ))
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewLeadInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub status: Option<LeadStatusGql>,
}

impl From<NewLeadInput> for NewLead {
    fn from(input: NewLeadInput) -> Self {
        Self {
            name: input.name,
            email: input.email,
            phone: input.phone,
            company: input.company,
            title: input.title,
            notes: input.notes,
            status: input.status.map(Into::into),
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateLeadInput {
    pub id: ID,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub status: Option<LeadStatusGql>,
}

impl UpdateLeadInput {
    pub fn into_domain(self) -> GqlResult<(uuid::Uuid, LeadPatch)> {
        Ok((
            parse_uuid(&self.id)?,
            LeadPatch {
                name: self.name,
                email: self.email,
                phone: self.phone,
                company: self.company,
                title: self.title,
                notes: self.notes,
                status: self.status.map(Into::into),
            },
        ))
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewActivityInput {
    pub kind: Option<ActivityKindGql>,
    #[graphql(name = "contactId")]
    pub contact_id: ID,
    #[graphql(name = "dealId")]
    pub deal_id: Option<ID>,
    pub subject: String,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[graphql(name = "createdBy")]
    pub created_by: Option<String>,
}

impl NewActivityInput {
    pub fn into_domain(self) -> GqlResult<NewActivity> {
        Ok(NewActivity {
            kind: self.kind.map(Into::into),
            contact_id: parse_uuid(&self.contact_id)?,
            deal_id: self.deal_id.as_ref().map(parse_uuid).transpose()?,
            subject: self.subject,
            description: self.description,
            timestamp: self.timestamp,
            created_by: self.created_by,
        })
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateActivityInput {
    pub id: ID,
    pub kind: Option<ActivityKindGql>,
    #[graphql(name = "contactId")]
    pub contact_id: Option<ID>,
    #[graphql(name = "dealId")]
    pub deal_id: Option<ID>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl UpdateActivityInput {
    pub fn into_domain(self) -> GqlResult<(uuid::Uuid, ActivityPatch)> {
        Ok((
            parse_uuid(&self.id)?,
            ActivityPatch {
                kind: self.kind.map(Into::into),
                contact_id: self.contact_id.as_ref().map(parse_uuid).transpose()?,
                deal_id: self.deal_id.as_ref().map(parse_uuid).transpose()?,
                subject: self.subject,
                description: self.description,
                timestamp: self.timestamp,
            },
        ))
    }
}
