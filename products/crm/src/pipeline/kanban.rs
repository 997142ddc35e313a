use std::mem;
use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::{BoardColumn, StageAggregate, StageRegistry, aggregate, board};
use crate::error::{CrmError, StoreError};
use crate::model::{Contact, Deal, DealPatch, NewDeal};
use crate::store::RecordStore;

/// Drag gesture lifecycle. Only one gesture is tracked at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        deal_id: Uuid,
    },
    Committing {
        deal_id: Uuid,
        target: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BoardStatus {
    #[default]
    Loading,
    Ready,
    /// Whole-view failure; `reload` is the retry.
    Failed(String),
}

/// Cached copy of what the board renders. Replaced wholesale on every load
/// or refresh, never patched locally.
#[derive(Clone, Debug, Default)]
pub struct BoardState {
    pub registry: StageRegistry,
    pub deals: Vec<Deal>,
    pub contacts: Vec<Contact>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// No active drag, or the drop landed outside every visible column.
    Ignored,
    /// Dropped on the column the deal already occupies.
    Unchanged,
    Moved(Deal),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn error(err: &CrmError) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: err.to_string(),
        }
    }
}

/// Issues the stage-update request for one deal. Nothing is applied locally.
pub async fn commit_stage_change(
    store: &dyn RecordStore,
    deal_id: Uuid,
    target: &str,
) -> Result<Deal, CrmError> {
    let span = info_span!("crm.pipeline.commit", %deal_id, stage = target);
    async move {
        let deal = store
            .update_deal(deal_id, DealPatch::stage(target))
            .await
            .map_err(CrmError::Update)?;
        info!(stage = %deal.stage, "deal stage committed");
        Ok(deal)
    }
    .instrument(span)
    .await
}

/// Drives the pipeline board: loads stages, deals and contacts, tracks the
/// drag gesture and commits stage changes pessimistically.
pub struct KanbanController {
    store: Arc<dyn RecordStore>,
    state: BoardState,
    status: BoardStatus,
    drag: DragState,
    notices: Vec<Notice>,
}

impl KanbanController {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            state: BoardState::default(),
            status: BoardStatus::Loading,
            drag: DragState::Idle,
            notices: Vec::new(),
        }
    }

    /// Builds a controller and performs the initial load.
    pub async fn open(store: Arc<dyn RecordStore>) -> Result<Self, CrmError> {
        let mut controller = Self::new(store);
        controller.load().await?;
        Ok(controller)
    }

    pub async fn load(&mut self) -> Result<(), CrmError> {
        self.status = BoardStatus::Loading;
        let store = self.store.clone();
        let fetched = async {
            tokio::try_join!(store.list_stages(), store.list_deals(), store.list_contacts())
        }
        .instrument(info_span!("crm.pipeline.load"))
        .await;

        match fetched {
            Ok((stages, deals, contacts)) => {
                self.state = BoardState {
                    registry: StageRegistry::new(stages),
                    deals,
                    contacts,
                };
                self.status = BoardStatus::Ready;
                debug!(deals = self.state.deals.len(), "pipeline loaded");
                Ok(())
            }
            Err(err) => Err(self.fail_load(err)),
        }
    }

    pub async fn reload(&mut self) -> Result<(), CrmError> {
        self.load().await
    }

    async fn refresh_deals(&mut self) -> Result<(), CrmError> {
        match self.store.list_deals().await {
            Ok(deals) => {
                self.state.deals = deals;
                Ok(())
            }
            Err(err) => Err(self.fail_load(err)),
        }
    }

    /// The write already stands in the store, so a failed refresh only marks
    /// the board stale; `reload` brings it back.
    async fn refresh_after_write(&mut self) {
        if let Err(err) = self.refresh_deals().await {
            debug!(error = %err, "board left stale after a committed write");
        }
    }

    fn fail_load(&mut self, err: StoreError) -> CrmError {
        let err = CrmError::Load(err);
        warn!(error = %err.store_error(), "pipeline load failed");
        self.status = BoardStatus::Failed(err.to_string());
        err
    }

    /// Records the dragged deal, replacing any earlier gesture. Returns
    /// `false` for deals the board does not hold.
    pub fn drag_start(&mut self, deal_id: Uuid) -> bool {
        if self.deal(deal_id).is_none() {
            debug!(%deal_id, "drag start on unknown deal ignored");
            return false;
        }
        self.drag = DragState::Dragging { deal_id };
        true
    }

    /// Gesture ended without a drop.
    pub fn drag_end(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Drop over `column` (`None` means outside every column).
    pub async fn drop_on(&mut self, column: Option<&str>) -> Result<DropOutcome, CrmError> {
        let DragState::Dragging { deal_id } = mem::take(&mut self.drag) else {
            debug!("drop with no active drag ignored");
            return Ok(DropOutcome::Ignored);
        };
        let Some(target) = column.filter(|name| self.state.registry.is_visible(name)) else {
            debug!(%deal_id, ?column, "drop outside the board ignored");
            return Ok(DropOutcome::Ignored);
        };
        let Some(current) = self.deal(deal_id).map(|deal| deal.stage.clone()) else {
            return Ok(DropOutcome::Ignored);
        };
        if current == target {
            debug!(%deal_id, stage = target, "drop on current column");
            return Ok(DropOutcome::Unchanged);
        }

        self.drag = DragState::Committing {
            deal_id,
            target: target.to_string(),
        };
        let committed = commit_stage_change(self.store.as_ref(), deal_id, target).await;
        self.drag = DragState::Idle;

        match committed {
            Ok(deal) => {
                self.notices
                    .push(Notice::success(format!("Deal moved to {}", deal.stage)));
                self.refresh_after_write().await;
                Ok(DropOutcome::Moved(deal))
            }
            Err(err) => {
                warn!(%deal_id, stage = target, error = %err.store_error(), "stage change failed");
                self.notices.push(Notice::error(&err));
                Err(err)
            }
        }
    }

    /// Creates a deal from the form and refreshes the board.
    pub async fn create_deal(&mut self, input: NewDeal) -> Result<Deal, CrmError> {
        let result = self.store.create_deal(input).await.map_err(CrmError::Save);
        self.after_save(result, "Deal created").await
    }

    /// Saves an edit from the form and refreshes the board.
    pub async fn update_deal(&mut self, id: Uuid, patch: DealPatch) -> Result<Deal, CrmError> {
        let result = self.store.update_deal(id, patch).await.map_err(CrmError::Save);
        self.after_save(result, "Deal updated").await
    }

    async fn after_save(
        &mut self,
        result: Result<Deal, CrmError>,
        message: &str,
    ) -> Result<Deal, CrmError> {
        match result {
            Ok(deal) => {
                self.notices.push(Notice::success(message));
                self.refresh_after_write().await;
                Ok(deal)
            }
            Err(err) => {
                self.notices.push(Notice::error(&err));
                Err(err)
            }
        }
    }

    /// Deletes from the store, then drops the deal from the cached board.
    pub async fn delete_deal(&mut self, id: Uuid) -> Result<bool, CrmError> {
        match self.store.delete_deal(id).await {
            Ok(removed) => {
                self.state.deals.retain(|deal| deal.id != id);
                if matches!(self.drag, DragState::Dragging { deal_id } if deal_id == id) {
                    self.drag = DragState::Idle;
                }
                if removed {
                    self.notices.push(Notice::success("Deal deleted"));
                }
                Ok(removed)
            }
            Err(err) => {
                let err = CrmError::Delete(err);
                self.notices.push(Notice::error(&err));
                Err(err)
            }
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.state.registry
    }

    pub fn deals(&self) -> &[Deal] {
        &self.state.deals
    }

    pub fn deal(&self, id: Uuid) -> Option<&Deal> {
        self.state.deals.iter().find(|deal| deal.id == id)
    }

    pub fn contact_name(&self, contact_id: Uuid) -> Option<&str> {
        self.state
            .contacts
            .iter()
            .find(|contact| contact.id == contact_id)
            .map(|contact| contact.name.as_str())
    }

    pub fn board(&self) -> Vec<BoardColumn> {
        board(&self.state.registry, &self.state.deals)
    }

    pub fn aggregate(&self, stage: &str) -> StageAggregate {
        aggregate(&self.state.deals, stage)
    }

    pub fn status(&self) -> &BoardStatus {
        &self.status
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// Drains pending notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewContact, PipelineStage};
    use crate::store::MemoryStore;
    use chrono::Utc;

    const DEAL_1: Uuid = Uuid::from_u128(1);
    const DEAL_2: Uuid = Uuid::from_u128(2);

    fn stage(name: &str, order: i32) -> PipelineStage {
        PipelineStage {
            id: Uuid::new_v4(),
            name: name.into(),
            order,
            color: "#3B82F6".into(),
        }
    }

    fn deal(id: Uuid, stage: &str, value: i64) -> Deal {
        NewDeal::new(format!("Deal {id}"), Uuid::new_v4(), value)
            .in_stage(stage)
            .into_deal(id, Utc::now())
    }

    /// Lead(1), Qualified(2); deal 1 in Lead worth 100, deal 2 in Qualified worth 50.
    async fn scenario() -> (Arc<MemoryStore>, KanbanController) {
        let store = Arc::new(MemoryStore::with_stages(vec![
            stage("Lead", 1),
            stage("Qualified", 2),
        ]));
        store.insert_deal(deal(DEAL_1, "Lead", 100)).await;
        store.insert_deal(deal(DEAL_2, "Qualified", 50)).await;
        let controller = KanbanController::open(store.clone()).await.unwrap();
        (store, controller)
    }

    fn agg(count: usize, total_value: i64) -> StageAggregate {
        StageAggregate { count, total_value }
    }

    #[tokio::test]
    async fn successful_move_shifts_aggregates() {
        let (store, mut controller) = scenario().await;
        assert_eq!(controller.status(), &BoardStatus::Ready);
        assert_eq!(controller.aggregate("Lead"), agg(1, 100));

        assert!(controller.drag_start(DEAL_1));
        let outcome = controller.drop_on(Some("Qualified")).await.unwrap();
        assert!(matches!(outcome, DropOutcome::Moved(ref d) if d.stage == "Qualified"));

        assert_eq!(controller.aggregate("Lead"), agg(0, 0));
        assert_eq!(controller.aggregate("Qualified"), agg(2, 150));
        assert_eq!(controller.drag_state(), &DragState::Idle);
        assert_eq!(store.deal_update_calls(), 1);

        let columns = controller.board();
        let holding: Vec<&str> = columns
            .iter()
            .filter(|column| column.deals.iter().any(|d| d.id == DEAL_1))
            .map(|column| column.stage.name.as_str())
            .collect();
        assert_eq!(holding, vec!["Qualified"]);

        assert_eq!(
            controller.take_notices(),
            vec![Notice::success("Deal moved to Qualified")]
        );
        assert!(controller.take_notices().is_empty());
    }

    #[tokio::test]
    async fn failed_commit_leaves_stage_untouched() {
        let (store, mut controller) = scenario().await;
        store.set_fail_writes(true);

        controller.drag_start(DEAL_1);
        let err = controller.drop_on(Some("Qualified")).await.unwrap_err();
        assert!(matches!(err, CrmError::Update(_)));

        assert_eq!(controller.deal(DEAL_1).unwrap().stage, "Lead");
        assert_eq!(store.get_deal(DEAL_1).await.unwrap().unwrap().stage, "Lead");
        assert_eq!(controller.aggregate("Lead"), agg(1, 100));
        assert_eq!(controller.drag_state(), &DragState::Idle);
        assert_eq!(controller.status(), &BoardStatus::Ready);

        let notices = controller.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "Failed to update deal stage");
    }

    #[tokio::test]
    async fn dropping_on_own_column_sends_nothing() {
        let (store, mut controller) = scenario().await;
        controller.drag_start(DEAL_1);
        let outcome = controller.drop_on(Some("Lead")).await.unwrap();
        assert_eq!(outcome, DropOutcome::Unchanged);
        assert_eq!(store.deal_update_calls(), 0);
        assert_eq!(controller.drag_state(), &DragState::Idle);
        assert!(controller.take_notices().is_empty());
    }

    #[tokio::test]
    async fn stray_drops_are_ignored() {
        let (store, mut controller) = scenario().await;

        assert_eq!(
            controller.drop_on(Some("Qualified")).await.unwrap(),
            DropOutcome::Ignored
        );

        controller.drag_start(DEAL_1);
        assert_eq!(controller.drop_on(None).await.unwrap(), DropOutcome::Ignored);
        assert_eq!(controller.drag_state(), &DragState::Idle);

        controller.drag_start(DEAL_1);
        assert_eq!(
            controller.drop_on(Some("Closed Won")).await.unwrap(),
            DropOutcome::Ignored
        );

        assert!(!controller.drag_start(Uuid::new_v4()));
        assert_eq!(store.deal_update_calls(), 0);
    }

    #[tokio::test]
    async fn new_drag_replaces_previous_one() {
        let (_store, mut controller) = scenario().await;
        controller.drag_start(DEAL_1);
        controller.drag_start(DEAL_2);
        assert_eq!(
            controller.drag_state(),
            &DragState::Dragging { deal_id: DEAL_2 }
        );

        let outcome = controller.drop_on(Some("Lead")).await.unwrap();
        assert!(matches!(outcome, DropOutcome::Moved(ref d) if d.id == DEAL_2));
        assert_eq!(controller.aggregate("Lead"), agg(2, 150));

        controller.drag_start(DEAL_1);
        controller.drag_end();
        assert_eq!(controller.drag_state(), &DragState::Idle);
    }

    #[tokio::test]
    async fn terminal_deals_stay_off_the_board() {
        let store = Arc::new(MemoryStore::new());
        store.insert_deal(deal(DEAL_1, "Proposal", 10)).await;
        store.insert_deal(deal(DEAL_2, "Closed Won", 900)).await;
        let controller = KanbanController::open(store).await.unwrap();

        let columns = controller.board();
        assert!(columns.iter().all(|column| !column.stage.is_terminal()));
        assert!(
            columns
                .iter()
                .all(|column| column.deals.iter().all(|d| d.id != DEAL_2))
        );
        assert_eq!(controller.deals().len(), 2);
    }

    #[tokio::test]
    async fn load_failure_is_retryable() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_reads(true);
        let mut controller = KanbanController::new(store.clone());

        let err = controller.load().await.unwrap_err();
        assert!(matches!(err, CrmError::Load(_)));
        assert_eq!(
            controller.status(),
            &BoardStatus::Failed("Failed to load pipeline data".into())
        );

        store.set_fail_reads(false);
        controller.reload().await.unwrap();
        assert_eq!(controller.status(), &BoardStatus::Ready);
        assert_eq!(controller.registry().list_visible_stages().len(), 4);
    }

    #[tokio::test]
    async fn deletes_and_saves_refresh_the_cache() {
        let (store, mut controller) = scenario().await;
        let contact = store
            .create_contact(NewContact {
                name: "Grace Hopper".into(),
                email: "grace@navy.test".into(),
                ..NewContact::default()
            })
            .await
            .unwrap();

        let created = controller
            .create_deal(NewDeal::new("Compiler licence", contact.id, 75))
            .await
            .unwrap();
        assert_eq!(controller.aggregate("Lead"), agg(2, 175));

        assert!(controller.delete_deal(created.id).await.unwrap());
        assert!(controller.deal(created.id).is_none());
        assert!(!controller.delete_deal(created.id).await.unwrap());

        let err = controller
            .update_deal(DEAL_1, DealPatch::stage("Nowhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Save(_)));
        assert_eq!(controller.deal(DEAL_1).unwrap().stage, "Lead");
    }

    #[tokio::test]
    async fn committed_move_survives_a_failed_refresh() {
        let (store, mut controller) = scenario().await;
        store.set_fail_reads(true);

        controller.drag_start(DEAL_1);
        let outcome = controller.drop_on(Some("Qualified")).await.unwrap();
        assert!(matches!(outcome, DropOutcome::Moved(ref d) if d.stage == "Qualified"));
        assert_eq!(
            controller.status(),
            &BoardStatus::Failed("Failed to load pipeline data".into())
        );
        assert_eq!(
            controller.take_notices(),
            vec![Notice::success("Deal moved to Qualified")]
        );

        store.set_fail_reads(false);
        assert_eq!(store.get_deal(DEAL_1).await.unwrap().unwrap().stage, "Qualified");
        controller.reload().await.unwrap();
        assert_eq!(controller.status(), &BoardStatus::Ready);
        assert_eq!(controller.aggregate("Qualified"), agg(2, 150));
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_deal_cached() {
        let (store, mut controller) = scenario().await;
        store.set_fail_writes(true);

        let err = controller.delete_deal(DEAL_1).await.unwrap_err();
        assert!(matches!(err, CrmError::Delete(_)));
        assert!(controller.deals().iter().any(|deal| deal.id == DEAL_1));
        assert_eq!(controller.aggregate("Lead"), agg(1, 100));

        let notices = controller.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "Failed to delete deal");
    }
}
