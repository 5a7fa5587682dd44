mod common;
mod config;
mod migration_chain;
