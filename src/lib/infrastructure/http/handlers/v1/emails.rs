//! Email submission and status endpoints

pub mod get_email;
pub mod send_email;
