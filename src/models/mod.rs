pub mod app_state;
pub mod error;
pub mod migration;
pub mod policy;
