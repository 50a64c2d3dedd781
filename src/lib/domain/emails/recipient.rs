//! Email recipient

use crate::domain::communication::email_addresses::EmailAddress;

use super::errors::RecipientError;

/// A named recipient
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    name: String,
    address: EmailAddress,
}

impl Recipient {
    /// Create a new recipient from a display name and a raw address
    pub fn new(name: &str, address: &str) -> Result<Self, RecipientError> {
        let name = name.trim();

        if name.is_empty() {
            return Err(RecipientError::EmptyName);
        }

        Ok(Self {
            name: name.to_string(),
            address: EmailAddress::new(address)?,
        })
    }

    /// The display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address
    pub fn address(&self) -> &EmailAddress {
        &self.address
    }
}
