pub mod dashboard;
pub mod download;
pub mod ingest;
pub mod inventory;
pub mod pipeline;
pub mod status;
pub mod update;
