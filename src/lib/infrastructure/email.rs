//! Outbound mail transports

pub mod smtp;
