use thiserror::Error;

use crate::models::NameRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl NameRecord {
    /// Check required fields in order: name, then surname. Patronymic is optional.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.surname.is_empty() {
            return Err(ValidationError::MissingField("surname"));
        }

        Ok(())
    }
}
