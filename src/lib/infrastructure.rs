//! Infrastructure layer: adapters for the domain's collaborators and the HTTP API

pub mod database;
pub mod email;
pub mod health;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod processing;
pub mod queue;
pub mod shutdown;
pub mod templates;
pub mod time;
