//! DataPulse: workspace onboarding for marketplace analytics.

pub mod api;
pub mod config;
pub mod connections;
pub mod error;
pub mod etl;
pub mod members;
pub mod onboarding;
pub mod preferences;
pub mod session;
pub mod sync_watch;
