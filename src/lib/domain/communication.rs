//! Outbound communication: addresses, mail transport and templates

pub mod email_addresses;
pub mod mailer;
pub mod templates;
