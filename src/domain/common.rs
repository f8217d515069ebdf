use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{FinanceError, Result};

/// Identifies entities that expose a stable unique identifier.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides access to a human-friendly entity name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Namespace for every stored document, supplied by the identity provider.
///
/// No core operation is valid without one; constructing an `OwnerId` from an
/// empty or blank id fails up front instead of scattering checks through the
/// services.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FinanceError::validation(
                "owner_id",
                "authenticated user id must not be empty",
            ));
        }
        Ok(OwnerId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_owner_id_is_rejected() {
        assert!(OwnerId::new("  ").is_err());
        assert!(OwnerId::new("user-1").is_ok());
    }
}
