pub mod health;
pub mod migration;
pub mod policy;
