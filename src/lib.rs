pub mod app;
pub mod chat;
pub mod config;
pub mod control;
pub mod graph;
pub mod runtime;
pub mod shared;
pub mod translator;
pub mod workspace;
