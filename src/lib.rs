pub mod app;
pub mod binder;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod output;
pub mod participants;
pub mod partition;
pub mod records;
pub mod sheet;
pub mod store;
pub mod template;
pub mod vocabulary;
