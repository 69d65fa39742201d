pub mod app;
pub mod chat;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod metrics;
pub mod output;
pub mod parse;
pub mod search;
pub mod tools;
