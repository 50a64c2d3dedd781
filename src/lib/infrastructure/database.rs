//! Database connections

pub mod postgres;
