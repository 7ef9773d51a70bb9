pub mod bot;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod prompts;
pub mod revalidator;
pub mod sql;
pub mod strategy;

pub use config::{AppConfig, PipelineConfig};
pub use context::AppContext;
pub use error::{InsightsError, Result};
pub use pipeline::{GeneratedQuery, Pipeline};
