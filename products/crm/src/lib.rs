//! CRM domain: contacts, leads, accounts, deals and activities, the record
//! stores that hold them, and the deal pipeline board.

pub mod dashboard;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod validate;

pub use dashboard::{Dashboard, DashboardMetrics, StageBreakdown};
pub use error::{CrmError, StoreError, StoreResult};
pub use model::*;
pub use pipeline::{
    BoardColumn, BoardStatus, DragState, DropOutcome, KanbanController, Notice, NoticeLevel,
    StageAggregate, StageRegistry,
};
pub use store::{MemoryStore, RecordStore, SeaOrmStore};
pub use validate::{Validate, ValidationErrors};
