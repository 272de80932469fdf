pub mod analysis;
pub mod config;
pub mod models;
pub mod quiz;
pub mod report;
pub mod service;
pub mod tasks;
pub mod workflow;

pub use analysis::{GeminiAnalyzer, HealthAnalyzer};
pub use config::ServiceConfig;
pub use models::*;
pub use service::{AppState, create_app};
pub use workflow::{build_assessment_workflow, create_assessment_session, create_flow_runner};
