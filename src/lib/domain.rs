//! Domain layer: the email aggregate, its collaborators and the services driving it

pub mod communication;
pub mod emails;
pub mod processing;
pub mod time;
