pub mod migration_chain;
pub mod migrator;
pub mod session;
