pub mod agents;
pub mod config;
pub mod error;
pub mod images;
pub mod report;
pub mod routes;
pub mod state;
pub mod storage;
