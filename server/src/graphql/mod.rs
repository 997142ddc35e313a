//! GraphQL surface. Everything lives under a `crm` namespace on both roots.

mod types;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Error, ErrorExtensions, ID, Object, Schema};
use platform_api::{ApiError, internal_error};
use products_crm::pipeline::commit_stage_change;
use products_crm::{
    ActivityKind, CrmError, Dashboard, DropOutcome, KanbanController, RecordStore, StageRegistry,
    StoreError, Validate, ValidationErrors,
};
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub use types::*;

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;
pub(crate) type GqlResult<T> = async_graphql::Result<T>;

pub fn build_schema(store: Arc<dyn RecordStore>) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .finish()
}

pub struct QueryRoot;
pub struct MutationRoot;

#[Object]
impl QueryRoot {
    async fn crm(&self) -> CrmQuery {
        CrmQuery
    }
}

#[Object]
impl MutationRoot {
    async fn crm(&self) -> CrmMutation {
        CrmMutation
    }
}

#[derive(Default)]
pub struct CrmQuery;

#[derive(Default)]
pub struct CrmMutation;

#[Object]
impl CrmQuery {
    #[graphql(name = "pipelineStages")]
    async fn pipeline_stages(&self, ctx: &Context<'_>) -> GqlResult<Vec<PipelineStageNode>> {
        let store = record_store(ctx)?;
        let registry = StageRegistry::load(store.as_ref()).await.map_err(store_error)?;
        Ok(registry.all_stages().iter().map(PipelineStageNode::from).collect())
    }

    #[graphql(name = "visibleStages")]
    async fn visible_stages(&self, ctx: &Context<'_>) -> GqlResult<Vec<PipelineStageNode>> {
        let store = record_store(ctx)?;
        let registry = StageRegistry::load(store.as_ref()).await.map_err(store_error)?;
        Ok(registry
            .list_visible_stages()
            .into_iter()
            .map(PipelineStageNode::from)
            .collect())
    }

    #[graphql(name = "pipelineBoard")]
    async fn pipeline_board(&self, ctx: &Context<'_>) -> GqlResult<PipelineBoardNode> {
        let store = record_store(ctx)?;
        let board = KanbanController::open(store)
            .instrument(info_span!("crm.pipelineBoard"))
            .await
            .map_err(crm_error)?;
        let columns = board
            .board()
            .into_iter()
            .map(|column| {
                PipelineColumnNode::from_column(column, |contact_id| {
                    board.contact_name(contact_id).map(str::to_string)
                })
            })
            .collect();
        Ok(PipelineBoardNode::new(columns))
    }

    async fn deals(&self, ctx: &Context<'_>) -> GqlResult<Vec<DealNode>> {
        let store = record_store(ctx)?;
        let deals = store.list_deals().await.map_err(store_error)?;
        Ok(deals.into_iter().map(DealNode::from).collect())
    }

    async fn deal(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<DealNode>> {
        let store = record_store(ctx)?;
        let deal = store.get_deal(parse_uuid(&id)?).await.map_err(store_error)?;
        Ok(deal.map(DealNode::from))
    }

    #[graphql(name = "dealsByContact")]
    async fn deals_by_contact(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "contactId")] contact_id: ID,
    ) -> GqlResult<Vec<DealNode>> {
        let store = record_store(ctx)?;
        let deals = store
            .list_deals_for_contact(parse_uuid(&contact_id)?)
            .await
            .map_err(store_error)?;
        Ok(deals.into_iter().map(DealNode::from).collect())
    }

    /// Contacts whose name, email or company contains `q`.
    async fn contacts(
        &self,
        ctx: &Context<'_>,
        q: Option<String>,
    ) -> GqlResult<Vec<ContactNode>> {
        let store = record_store(ctx)?;
        let query = sanitize_optional_filter(q);
        let contacts = store.list_contacts().await.map_err(store_error)?;
        Ok(contacts
            .into_iter()
            .filter(|contact| query.as_deref().is_none_or(|q| contact.matches(q)))
            .map(ContactNode::from)
            .collect())
    }

    async fn contact(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<ContactNode>> {
        let store = record_store(ctx)?;
        let contact = store
            .get_contact(parse_uuid(&id)?)
            .await
            .map_err(store_error)?;
        Ok(contact.map(ContactNode::from))
    }

    /// Accounts whose name, email or one of the tags contains `q`.
    async fn accounts(
        &self,
        ctx: &Context<'_>,
        q: Option<String>,
    ) -> GqlResult<Vec<AccountNode>> {
        let store = record_store(ctx)?;
        let query = sanitize_optional_filter(q);
        let accounts = store.list_accounts().await.map_err(store_error)?;
        Ok(accounts
            .into_iter()
            .filter(|account| query.as_deref().is_none_or(|q| account.matches(q)))
            .map(AccountNode::from)
            .collect())
    }

    async fn account(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<AccountNode>> {
        let store = record_store(ctx)?;
        let account = store
            .get_account(parse_uuid(&id)?)
            .await
            .map_err(store_error)?;
        Ok(account.map(AccountNode::from))
    }

    /// Leads whose name, email or company contains `q`.
    async fn leads(&self, ctx: &Context<'_>, q: Option<String>) -> GqlResult<Vec<LeadNode>> {
        let store = record_store(ctx)?;
        let query = sanitize_optional_filter(q);
        let leads = store.list_leads().await.map_err(store_error)?;
        Ok(leads
            .into_iter()
            .filter(|lead| query.as_deref().is_none_or(|q| lead.matches(q)))
            .map(LeadNode::from)
            .collect())
    }

    async fn lead(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<LeadNode>> {
        let store = record_store(ctx)?;
        let lead = store.get_lead(parse_uuid(&id)?).await.map_err(store_error)?;
        Ok(lead.map(LeadNode::from))
    }

    /// All activities, newest first, optionally narrowed to one kind.
    async fn activities(
        &self,
        ctx: &Context<'_>,
        kind: Option<ActivityKindGql>,
    ) -> GqlResult<Vec<ActivityNode>> {
        let store = record_store(ctx)?;
        let kind = kind.map(ActivityKind::from);
        let activities = store.list_activities().await.map_err(store_error)?;
        Ok(activities
            .into_iter()
            .filter(|activity| kind.is_none_or(|kind| activity.kind == kind))
            .map(ActivityNode::from)
            .collect())
    }

    #[graphql(name = "activitiesByDeal")]
    async fn activities_by_deal(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "dealId")] deal_id: ID,
    ) -> GqlResult<Vec<ActivityNode>> {
        let store = record_store(ctx)?;
        let activities = store
            .list_activities_for_deal(parse_uuid(&deal_id)?)
            .await
            .map_err(store_error)?;
        Ok(activities.into_iter().map(ActivityNode::from).collect())
    }

    #[graphql(name = "activitiesByContact")]
    async fn activities_by_contact(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "contactId")] contact_id: ID,
    ) -> GqlResult<Vec<ActivityNode>> {
        let store = record_store(ctx)?;
        let activities = store
            .list_activities_for_contact(parse_uuid(&contact_id)?)
            .await
            .map_err(store_error)?;
        Ok(activities.into_iter().map(ActivityNode::from).collect())
    }

    async fn dashboard(&self, ctx: &Context<'_>) -> GqlResult<DashboardNode> {
        let store = record_store(ctx)?;
        let dashboard = Dashboard::load(store.as_ref()).await.map_err(|err| {
            ApiError::failed("Failed to load dashboard data", err.into()).extend()
        })?;
        Ok(dashboard.into())
    }
}

#[Object]
impl CrmMutation {
    #[graphql(name = "createDeal")]
    async fn create_deal(&self, ctx: &Context<'_>, input: NewDealInput) -> GqlResult<DealNode> {
        let store = record_store(ctx)?;
        let input = input.into_domain()?;
        validated(&input)?;
        let deal = store.create_deal(input).await.map_err(store_error)?;
        Ok(deal.into())
    }

    #[graphql(name = "updateDeal")]
    async fn update_deal(&self, ctx: &Context<'_>, input: UpdateDealInput) -> GqlResult<DealNode> {
        let store = record_store(ctx)?;
        let (id, patch) = input.into_domain()?;
        validated(&patch)?;
        let deal = store.update_deal(id, patch).await.map_err(store_error)?;
        Ok(deal.into())
    }

    #[graphql(name = "deleteDeal")]
    async fn delete_deal(&self, ctx: &Context<'_>, id: ID) -> GqlResult<bool> {
        let store = record_store(ctx)?;
        store.delete_deal(parse_uuid(&id)?).await.map_err(store_error)
    }

    /// Replays a drag of the deal onto the `stage` column. Terminal stages
    /// have no column, so closing a deal commits the stage change directly.
    #[graphql(name = "moveDealStage")]
    async fn move_deal_stage(
        &self,
        ctx: &Context<'_>,
        id: ID,
        stage: String,
    ) -> GqlResult<MoveDealStagePayload> {
        let store = record_store(ctx)?;
        let deal_id = parse_uuid(&id)?;
        let span = info_span!("crm.moveDealStage", %deal_id, stage = %stage);
        async move {
            let mut board = KanbanController::open(store.clone())
                .await
                .map_err(crm_error)?;
            let Some(current) = board.deal(deal_id).cloned() else {
                return Err(ApiError::not_found(format!("deal {deal_id}")).extend());
            };

            if board.registry().is_terminal(&stage) && board.registry().contains(&stage) {
                if current.stage == stage {
                    return Ok(unchanged(current));
                }
                let deal = commit_stage_change(store.as_ref(), deal_id, &stage)
                    .await
                    .map_err(crm_error)?;
                return Ok(MoveDealStagePayload {
                    message: Some(format!("Deal moved to {}", deal.stage)),
                    deal: deal.into(),
                    moved: true,
                });
            }
            if !board.registry().is_visible(&stage) {
                return Err(ApiError::invalid_fields([(
                    "stage",
                    format!("Unknown pipeline stage {stage}"),
                )])
                .extend());
            }

            board.drag_start(deal_id);
            match board.drop_on(Some(&stage)).await.map_err(crm_error)? {
                DropOutcome::Moved(deal) => Ok(MoveDealStagePayload {
                    deal: deal.into(),
                    moved: true,
                    message: board.take_notices().pop().map(|notice| notice.message),
                }),
                DropOutcome::Unchanged | DropOutcome::Ignored => Ok(unchanged(current)),
            }
        }
        .instrument(span)
        .await
    }

    #[graphql(name = "createContact")]
    async fn create_contact(
        &self,
        ctx: &Context<'_>,
        input: NewContactInput,
    ) -> GqlResult<ContactNode> {
        let store = record_store(ctx)?;
        let input = products_crm::NewContact::from(input);
        validated(&input)?;
        let contact = store.create_contact(input).await.map_err(store_error)?;
        Ok(contact.into())
    }

    #[graphql(name = "updateContact")]
    async fn update_contact(
        &self,
        ctx: &Context<'_>,
        input: UpdateContactInput,
    ) -> GqlResult<ContactNode> {
        let store = record_store(ctx)?;
        let (id, patch) = input.into_domain()?;
        validated(&patch)?;
        let contact = store.update_contact(id, patch).await.map_err(store_error)?;
        Ok(contact.into())
    }

    #[graphql(name = "deleteContact")]
    async fn delete_contact(&self, ctx: &Context<'_>, id: ID) -> GqlResult<bool> {
        let store = record_store(ctx)?;
        store
            .delete_contact(parse_uuid(&id)?)
            .await
            .map_err(store_error)
    }

    #[graphql(name = "createAccount")]
    async fn create_account(
        &self,
        ctx: &Context<'_>,
        input: NewAccountInput,
    ) -> GqlResult<AccountNode> {
        let store = record_store(ctx)?;
        let input = products_crm::NewAccount::from(input);
        validated(&input)?;
        let account = store.create_account(input).await.map_err(store_error)?;
        Ok(account.into())
    }

    #[graphql(name = "updateAccount")]
    async fn update_account(
        &self,
        ctx: &Context<'_>,
        input: UpdateAccountInput,
    ) -> GqlResult<AccountNode> {
        let store = record_store(ctx)?;
        let (id, patch) = input.into_domain()?;
        validated(&patch)?;
        let account = store.update_account(id, patch).await.map_err(store_error)?;
        Ok(account.into())
    }

    #[graphql(name = "deleteAccount")]
    async fn delete_account(&self, ctx: &Context<'_>, id: ID) -> GqlResult<bool> {
        let store = record_store(ctx)?;
        store
            .delete_account(parse_uuid(&id)?)
            .await
            .map_err(store_error)
    }

    #[graphql(name = "createLead")]
    async fn create_lead(&self, ctx: &Context<'_>, input: NewLeadInput) -> GqlResult<LeadNode> {
        let store = record_store(ctx)?;
        let input = products_crm::NewLead::from(input);
        validated(&input)?;
        let lead = store.create_lead(input).await.map_err(store_error)?;
        Ok(lead.into())
    }

    #[graphql(name = "updateLead")]
    async fn update_lead(&self, ctx: &Context<'_>, input: UpdateLeadInput) -> GqlResult<LeadNode> {
        let store = record_store(ctx)?;
        let (id, patch) = input.into_domain()?;
        validated(&patch)?;
        let lead = store.update_lead(id, patch).await.map_err(store_error)?;
        Ok(lead.into())
    }

    #[graphql(name = "deleteLead")]
    async fn delete_lead(&self, ctx: &Context<'_>, id: ID) -> GqlResult<bool> {
        let store = record_store(ctx)?;
        store.delete_lead(parse_uuid(&id)?).await.map_err(store_error)
    }

    #[graphql(name = "createActivity")]
    async fn create_activity(
        &self,
        ctx: &Context<'_>,
        input: NewActivityInput,
    ) -> GqlResult<ActivityNode> {
        let store = record_store(ctx)?;
        let input = input.into_domain()?;
        validated(&input)?;
        let activity = store.create_activity(input).await.map_err(store_error)?;
        Ok(activity.into())
    }

    #[graphql(name = "updateActivity")]
    async fn update_activity(
        &self,
        ctx: &Context<'_>,
        input: UpdateActivityInput,
    ) -> GqlResult<ActivityNode> {
        let store = record_store(ctx)?;
        let (id, patch) = input.into_domain()?;
        validated(&patch)?;
        let activity = store.update_activity(id, patch).await.map_err(store_error)?;
        Ok(activity.into())
    }

    #[graphql(name = "deleteActivity")]
    async fn delete_activity(&self, ctx: &Context<'_>, id: ID) -> GqlResult<bool> {
        let store = record_store(ctx)?;
        store
            .delete_activity(parse_uuid(&id)?)
            .await
            .map_err(store_error)
    }
}

fn unchanged(deal: products_crm::Deal) -> MoveDealStagePayload {
    MoveDealStagePayload {
        deal: deal.into(),
        moved: false,
        message: None,
    }
}

fn record_store(ctx: &Context<'_>) -> GqlResult<Arc<dyn RecordStore>> {
    ctx.data::<Arc<dyn RecordStore>>()
        .cloned()
        .map_err(|_| internal_error(anyhow::anyhow!("record store missing from schema data")))
}

pub(crate) fn parse_uuid(id: &ID) -> GqlResult<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| ApiError::invalid("Invalid ID").extend())
}

pub(crate) fn probability(value: i32) -> GqlResult<u8> {
    u8::try_from(value).map_err(|_| {
        ApiError::invalid_fields([("probability", "Probability must be between 0 and 100")])
            .extend()
    })
}

fn validated<T: Validate>(input: &T) -> GqlResult<()> {
    input.validate().map_err(validation_error)
}

fn validation_error(errors: ValidationErrors) -> Error {
    ApiError::invalid_fields(errors.iter()).extend()
}

fn store_error(err: StoreError) -> Error {
    match err {
        StoreError::NotFound { collection, id } => {
            ApiError::not_found(format!("{collection} {id}")).extend()
        }
        StoreError::UnknownStage(name) => {
            ApiError::invalid_fields([("stage", format!("Unknown pipeline stage {name}"))])
                .extend()
        }
        StoreError::Invalid { field, reason } => {
            ApiError::invalid_fields([(field, reason)]).extend()
        }
        other => internal_error(other),
    }
}

/// Client mistakes keep their field detail; store failures surface the
/// board's own message.
fn crm_error(err: CrmError) -> Error {
    let message = err.to_string();
    match err.into_store_error() {
        err @ (StoreError::NotFound { .. }
        | StoreError::UnknownStage(_)
        | StoreError::Invalid { .. }) => store_error(err),
        other => ApiError::failed(message, other.into()).extend(),
    }
}

fn sanitize_optional_filter(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::{Request, Variables};
    use products_crm::{MemoryStore, NewDeal};
    use serde_json::json;

    fn schema_with(store: Arc<MemoryStore>) -> SchemaType {
        build_schema(store)
    }

    #[tokio::test]
    async fn visible_stages_skip_terminal() {
        let schema = schema_with(Arc::new(MemoryStore::new()));
        let response = schema
            .execute(Request::new("{ crm { visibleStages { name order } } }"))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        let names: Vec<&str> = body["crm"]["visibleStages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|stage| stage["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Lead", "Qualified", "Proposal", "Negotiation"]);
    }

    #[tokio::test]
    async fn move_to_own_stage_sends_no_update() {
        let store = Arc::new(MemoryStore::new());
        let deal = store
            .create_deal(NewDeal::new("Pilot", Uuid::new_v4(), 100))
            .await
            .unwrap();
        let schema = schema_with(store.clone());
        let response = schema
            .execute(
                Request::new(
                    "mutation($id: ID!) { crm { moveDealStage(id: $id, stage: \"Lead\") { moved deal { stage } } } }",
                )
                .variables(Variables::from_json(json!({ "id": deal.id.to_string() }))),
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"crm": {"moveDealStage": {"moved": false, "deal": {"stage": "Lead"}}}})
        );
        assert_eq!(store.deal_update_calls(), 0);
    }

    #[tokio::test]
    async fn failed_move_reports_update_failure() {
        let store = Arc::new(MemoryStore::new());
        let deal = store
            .create_deal(NewDeal::new("Pilot", Uuid::new_v4(), 100))
            .await
            .unwrap();
        store.set_fail_writes(true);
        let schema = schema_with(store.clone());
        let response = schema
            .execute(
                Request::new(
                    "mutation($id: ID!) { crm { moveDealStage(id: $id, stage: \"Qualified\") { moved } } }",
                )
                .variables(Variables::from_json(json!({ "id": deal.id.to_string() }))),
            )
            .await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Failed to update deal stage");
        store.set_fail_writes(false);
        assert_eq!(store.get_deal(deal.id).await.unwrap().unwrap().stage, "Lead");
    }
}
