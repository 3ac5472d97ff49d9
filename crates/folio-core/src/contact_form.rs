use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContactFormError {
    #[error("name is required")]
    MissingName,
    #[error("email is required")]
    MissingEmail,
    #[error("message is required")]
    MissingMessage,
}

/// Visitor message from the contact page. Subject is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    /// Checks required fields in display order and reports the first gap.
    pub fn validate(&self) -> Result<(), ContactFormError> {
        if self.name.trim().is_empty() {
            return Err(ContactFormError::MissingName);
        }
        if self.email.trim().is_empty() {
            return Err(ContactFormError::MissingEmail);
        }
        if self.message.trim().is_empty() {
            return Err(ContactFormError::MissingMessage);
        }
        Ok(())
    }
}
