//! Menu Admin - administrative client for the menu ordering backend.
//!
//! Section controllers live in [`commands`]. Each takes an [`AdminContext`],
//! performs one user action and returns an [`Outcome`]. Catalog mutations go
//! through a per-resource [`MutationOrchestrator`], which probes the backend
//! for the write method it supports and falls back to the local mirror when
//! the backend cannot take the write.

pub mod api;
pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod mirror;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod outcome;
pub mod probe;
pub mod render;
pub mod resource;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use api::{ApiRequest, HttpTransport, Transport};
pub use commands::{Section, SectionView};
pub use config::{AppConfig, ConfigError};
pub use context::AdminContext;
pub use error::{ApiError, ValidationError};
pub use orchestrator::MutationOrchestrator;
pub use outcome::{Navigation, Notice, NoticeLevel, Outcome};
