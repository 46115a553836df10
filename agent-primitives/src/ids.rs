//! Contract and trace identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

const MAX_ID_LEN: usize = 128;

/// Opaque identifier of an agent contract, unique within one registry snapshot.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractId(String);

impl ContractId {
    /// Creates a contract identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContractId`] if the identifier is empty or longer
    /// than the supported maximum.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidContractId {
                id,
                reason: "identifier cannot be empty".into(),
            });
        }
        if trimmed.len() > MAX_ID_LEN {
            return Err(Error::InvalidContractId {
                id,
                reason: format!("identifier length must be <= {MAX_ID_LEN}"),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContractId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContractId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ContractId> for String {
    fn from(value: ContractId) -> Self {
        value.0
    }
}

impl FromStr for ContractId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Correlation identifier attached to a single invocation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generates a random trace identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::random()
    }
}

impl Display for TraceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for TraceId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for TraceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s).map_err(Error::from)?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_id_trims_and_rejects_empty() {
        let id = ContractId::new("  agent-007 ").expect("id");
        assert_eq!(id.as_str(), "agent-007");

        let err = ContractId::new("   ").expect_err("empty id");
        assert!(matches!(err, Error::InvalidContractId { .. }));
    }

    #[test]
    fn round_trip_trace_id() {
        let id = TraceId::random();
        let parsed = id.to_string().parse::<TraceId>().expect("parse");
        assert_eq!(id, parsed);
    }
}
