//! The deal pipeline board: stage registry, per-stage aggregates and the
//! drag-and-drop controller that commits stage changes to a record store.

mod aggregate;
mod kanban;
mod registry;

use uuid::Uuid;

use crate::model::PipelineStage;

pub use aggregate::{BoardColumn, StageAggregate, aggregate, board, deals_in_stage};
pub use kanban::{
    BoardState, BoardStatus, DragState, DropOutcome, KanbanController, Notice, NoticeLevel,
    commit_stage_change,
};
pub use registry::StageRegistry;

/// `(id, name, order, color)` for the stages every fresh install starts with.
/// The migration seeds the same rows.
pub const DEFAULT_STAGES: [(u128, &str, i32, &str); 6] = [
    (0x5ea9_0001, "Lead", 1, "#3B82F6"),
    (0x5ea9_0002, "Qualified", 2, "#8B5CF6"),
    (0x5ea9_0003, "Proposal", 3, "#F59E0B"),
    (0x5ea9_0004, "Negotiation", 4, "#F97316"),
    (0x5ea9_0005, "Closed Won", 5, "#10B981"),
    (0x5ea9_0006, "Closed Lost", 6, "#EF4444"),
];

pub fn default_stages() -> Vec<PipelineStage> {
    DEFAULT_STAGES
        .iter()
        .map(|(id, name, order, color)| PipelineStage {
            id: Uuid::from_u128(*id),
            name: (*name).to_string(),
            order: *order,
            color: (*color).to_string(),
        })
        .collect()
}
