use serde::Serialize;

use super::StageRegistry;
use crate::model::{Deal, PipelineStage};

/// Count and summed value (cents) of the deals sitting in one stage.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageAggregate {
    pub count: usize,
    pub total_value: i64,
}

/// Derived on every call; never cached across mutations. Totals saturate
/// instead of wrapping.
pub fn aggregate(deals: &[Deal], stage: &str) -> StageAggregate {
    deals
        .iter()
        .filter(|deal| deal.stage == stage)
        .fold(StageAggregate::default(), |acc, deal| StageAggregate {
            count: acc.count + 1,
            total_value: acc.total_value.saturating_add(deal.value),
        })
}

pub fn deals_in_stage<'a>(deals: &'a [Deal], stage: &str) -> Vec<&'a Deal> {
    deals.iter().filter(|deal| deal.stage == stage).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BoardColumn {
    pub stage: PipelineStage,
    pub deals: Vec<Deal>,
    pub aggregate: StageAggregate,
}

/// One column per visible stage. Deals keep collection order inside a column;
/// deals in terminal or unknown stages do not appear.
pub fn board(registry: &StageRegistry, deals: &[Deal]) -> Vec<BoardColumn> {
    registry
        .list_visible_stages()
        .into_iter()
        .map(|stage| BoardColumn {
            stage: stage.clone(),
            deals: deals_in_stage(deals, &stage.name).into_iter().cloned().collect(),
            aggregate: aggregate(deals, &stage.name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewDeal;
    use crate::pipeline::default_stages;
    use chrono::Utc;
    use uuid::Uuid;

    fn deal(stage: &str, value: i64) -> Deal {
        NewDeal::new("Deal", Uuid::new_v4(), value)
            .in_stage(stage)
            .into_deal(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn aggregate_counts_and_sums_one_stage() {
        let deals = vec![deal("Lead", 100), deal("Qualified", 50), deal("Lead", 25)];
        assert_eq!(
            aggregate(&deals, "Lead"),
            StageAggregate {
                count: 2,
                total_value: 125
            }
        );
        assert_eq!(aggregate(&deals, "Proposal"), StageAggregate::default());
        assert_eq!(aggregate(&[], "Lead"), StageAggregate::default());
    }

    #[test]
    fn huge_totals_saturate() {
        let half = i64::MAX / 2 + 1;
        let deals = vec![deal("Lead", half), deal("Lead", half)];
        assert_eq!(
            aggregate(&deals, "Lead"),
            StageAggregate {
                count: 2,
                total_value: i64::MAX
            }
        );
    }

    #[test]
    fn aggregate_matches_filtered_set_for_every_stage() {
        let values = [0_i64, 1, 7, 100, 2_500, 999_999];
        let stages = default_stages();
        let deals: Vec<Deal> = values
            .iter()
            .enumerate()
            .map(|(i, value)| deal(&stages[i % stages.len()].name, *value))
            .collect();

        for stage in &stages {
            let members: Vec<&Deal> = deals.iter().filter(|d| d.stage == stage.name).collect();
            let agg = aggregate(&deals, &stage.name);
            assert_eq!(agg.count, members.len());
            assert_eq!(agg.total_value, members.iter().map(|d| d.value).sum::<i64>());
        }
    }

    #[test]
    fn board_hides_terminal_deals() {
        let registry = StageRegistry::new(default_stages());
        let deals = vec![
            deal("Lead", 10),
            deal("Closed Won", 500),
            deal("Closed Lost", 70),
            deal("Negotiation", 30),
        ];
        let columns = board(&registry, &deals);
        assert_eq!(columns.len(), 4);
        let shown: usize = columns.iter().map(|column| column.deals.len()).sum();
        assert_eq!(shown, 2);
        assert!(
            columns
                .iter()
                .flat_map(|column| &column.deals)
                .all(Deal::is_open)
        );
        assert_eq!(columns[3].stage.name, "Negotiation");
        assert_eq!(columns[3].aggregate.total_value, 30);
    }
}
