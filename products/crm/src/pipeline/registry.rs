use tracing::instrument;

use crate::error::StoreResult;
use crate::model::{PipelineStage, is_terminal_stage};
use crate::store::RecordStore;

/// Ordered pipeline stages. Read-only once built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageRegistry {
    stages: Vec<PipelineStage>,
}

impl StageRegistry {
    pub fn new(mut stages: Vec<PipelineStage>) -> Self {
        stages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Self { stages }
    }

    #[instrument(name = "crm.stages.load", skip_all)]
    pub async fn load(store: &dyn RecordStore) -> StoreResult<Self> {
        Ok(Self::new(store.list_stages().await?))
    }

    /// Non-terminal stages, ascending by `order`. These are the board columns.
    pub fn list_visible_stages(&self) -> Vec<&PipelineStage> {
        self.stages.iter().filter(|stage| !stage.is_terminal()).collect()
    }

    pub fn all_stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn get(&self, name: &str) -> Option<&PipelineStage> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.get(name).is_some_and(|stage| !stage.is_terminal())
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        is_terminal_stage(name)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::default_stages;
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn stage(name: &str, order: i32) -> PipelineStage {
        PipelineStage {
            id: Uuid::new_v4(),
            name: name.into(),
            order,
            color: "#000000".into(),
        }
    }

    fn names(stages: &[&PipelineStage]) -> Vec<String> {
        stages.iter().map(|stage| stage.name.clone()).collect()
    }

    #[test]
    fn visible_stages_follow_order_and_skip_terminal() {
        let mut stages = default_stages();
        stages.reverse();
        let registry = StageRegistry::new(stages);
        assert_eq!(
            names(&registry.list_visible_stages()),
            vec!["Lead", "Qualified", "Proposal", "Negotiation"]
        );
        assert_eq!(registry.all_stages().len(), 6);
        assert!(registry.contains("Closed Won"));
        assert!(!registry.is_visible("Closed Won"));
        assert!(registry.is_terminal("Closed Lost"));
    }

    #[test]
    fn equal_orders_break_ties_by_name() {
        let registry =
            StageRegistry::new(vec![stage("Beta", 1), stage("Alpha", 1), stage("Zeta", 0)]);
        assert_eq!(
            names(&registry.list_visible_stages()),
            vec!["Zeta", "Alpha", "Beta"]
        );
    }

    #[tokio::test]
    async fn loads_from_a_store() {
        let store = MemoryStore::with_stages(vec![stage("Qualified", 2), stage("Lead", 1)]);
        let registry = StageRegistry::load(&store).await.unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.all_stages()[0].name, "Lead");
        assert!(registry.get("Missing").is_none());
    }
}
