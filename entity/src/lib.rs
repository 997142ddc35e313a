pub mod account;
pub mod activity;
pub mod contact;
pub mod deal;
pub mod lead;
pub mod pipeline_stage;
