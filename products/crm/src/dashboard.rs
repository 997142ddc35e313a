use serde::Serialize;
use tracing::instrument;

use crate::error::StoreResult;
use crate::model::{Activity, Deal};
use crate::pipeline::{StageAggregate, StageRegistry, aggregate};
use crate::store::RecordStore;

pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Headline numbers. Money is in cents.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_pipeline: i64,
    pub active_deals: usize,
    pub won_value: i64,
    /// Percent of all deals that were won, one decimal place.
    pub conversion_rate: f64,
    pub total_contacts: usize,
}

impl DashboardMetrics {
    pub fn compute(deals: &[Deal], total_contacts: usize) -> Self {
        let open: Vec<&Deal> = deals.iter().filter(|deal| deal.is_open()).collect();
        let won: Vec<&Deal> = deals.iter().filter(|deal| deal.is_won()).collect();
        let conversion_rate = if deals.is_empty() {
            0.0
        } else {
            (won.len() as f64 / deals.len() as f64 * 1000.0).round() / 10.0
        };
        Self {
            total_pipeline: sum_values(&open),
            active_deals: open.len(),
            won_value: sum_values(&won),
            conversion_rate,
            total_contacts,
        }
    }
}

fn sum_values(deals: &[&Deal]) -> i64 {
    deals
        .iter()
        .fold(0i64, |total, deal| total.saturating_add(deal.value))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageBreakdown {
    pub stage: String,
    pub aggregate: StageAggregate,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dashboard {
    pub metrics: DashboardMetrics,
    pub stages: Vec<StageBreakdown>,
    pub recent_activities: Vec<Activity>,
}

impl Dashboard {
    pub fn build(
        registry: &StageRegistry,
        deals: &[Deal],
        total_contacts: usize,
        mut activities: Vec<Activity>,
    ) -> Self {
        activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        activities.truncate(RECENT_ACTIVITY_LIMIT);
        Self {
            metrics: DashboardMetrics::compute(deals, total_contacts),
            stages: registry
                .list_visible_stages()
                .into_iter()
                .map(|stage| StageBreakdown {
                    stage: stage.name.clone(),
                    aggregate: aggregate(deals, &stage.name),
                })
                .collect(),
            recent_activities: activities,
        }
    }

    #[instrument(name = "crm.dashboard.load", skip_all)]
    pub async fn load(store: &dyn RecordStore) -> StoreResult<Self> {
        let (stages, deals, contacts, activities) = tokio::try_join!(
            store.list_stages(),
            store.list_deals(),
            store.list_contacts(),
            store.list_activities()
        )?;
        Ok(Self::build(
            &StageRegistry::new(stages),
            &deals,
            contacts.len(),
            activities,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewActivity, NewDeal};
    use crate::pipeline::default_stages;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn deal(stage: &str, value: i64) -> Deal {
        NewDeal::new("Deal", Uuid::new_v4(), value)
            .in_stage(stage)
            .into_deal(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn metrics_split_open_and_won() {
        let deals = vec![
            deal("Lead", 100),
            deal("Proposal", 300),
            deal("Closed Won", 1_000),
            deal("Closed Lost", 400),
            deal("Negotiation", 50),
            deal("Closed Won", 10),
        ];
        let metrics = DashboardMetrics::compute(&deals, 7);
        assert_eq!(metrics.total_pipeline, 450);
        assert_eq!(metrics.active_deals, 3);
        assert_eq!(metrics.won_value, 1_010);
        assert_eq!(metrics.conversion_rate, 33.3);
        assert_eq!(metrics.total_contacts, 7);
    }

    #[test]
    fn metric_sums_saturate() {
        let half = i64::MAX / 2 + 1;
        let deals = vec![
            deal("Lead", half),
            deal("Proposal", half),
            deal("Closed Won", half),
            deal("Closed Won", half),
        ];
        let metrics = DashboardMetrics::compute(&deals, 0);
        assert_eq!(metrics.total_pipeline, i64::MAX);
        assert_eq!(metrics.won_value, i64::MAX);
    }

    #[test]
    fn empty_pipeline_has_zero_conversion() {
        let metrics = DashboardMetrics::compute(&[], 0);
        assert_eq!(metrics, DashboardMetrics::default());
    }

    #[test]
    fn keeps_five_most_recent_activities() {
        let now = Utc::now();
        let activities: Vec<Activity> = (0..8)
            .map(|i| {
                NewActivity {
                    kind: None,
                    contact_id: Uuid::new_v4(),
                    deal_id: None,
                    subject: format!("touch {i}"),
                    description: None,
                    timestamp: Some(now - Duration::hours(i)),
                    created_by: None,
                }
                .into_activity(Uuid::new_v4(), now)
            })
            .rev()
            .collect();
        let registry = StageRegistry::new(default_stages());
        let dashboard = Dashboard::build(&registry, &[deal("Lead", 5)], 1, activities);

        let subjects: Vec<&str> = dashboard
            .recent_activities
            .iter()
            .map(|a| a.subject.as_str())
            .collect();
        assert_eq!(subjects, vec!["touch 0", "touch 1", "touch 2", "touch 3", "touch 4"]);
        assert_eq!(dashboard.stages.len(), 4);
        assert_eq!(dashboard.stages[0].aggregate.total_value, 5);
    }

    #[tokio::test]
    async fn loads_from_store() {
        let store = MemoryStore::new();
        store
            .create_deal(NewDeal::new("Won", Uuid::new_v4(), 20).in_stage("Closed Won"))
            .await
            .unwrap();
        let dashboard = Dashboard::load(&store).await.unwrap();
        assert_eq!(dashboard.metrics.won_value, 20);
        assert_eq!(dashboard.metrics.conversion_rate, 100.0);
    }
}
