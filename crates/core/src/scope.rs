use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppResult, NonEmptyString};

/// The `(client, system)` pair every draft and simulation run is partitioned by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionScope {
    client: NonEmptyString,
    system: NonEmptyString,
}

impl SessionScope {
    /// Creates a scope from client and system names, trimming surrounding whitespace.
    pub fn new(client: impl Into<String>, system: impl Into<String>) -> AppResult<Self> {
        let client = client.into();
        let system = system.into();

        Ok(Self {
            client: NonEmptyString::new(client.trim())?,
            system: NonEmptyString::new(system.trim())?,
        })
    }

    /// Returns the SAP client name.
    #[must_use]
    pub fn client(&self) -> &str {
        self.client.as_str()
    }

    /// Returns the SAP system name.
    #[must_use]
    pub fn system(&self) -> &str {
        self.system.as_str()
    }

    /// Returns the stable key under which the scope's draft is persisted.
    ///
    /// Names are percent-encoded, `_` included, so distinct scopes never share a key.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!(
            "all_edited_roles_{}_{}",
            key_part(self.client()),
            key_part(self.system())
        )
    }
}

fn key_part(name: &str) -> String {
    urlencoding::encode(name).replace('_', "%5F")
}

impl Display for SessionScope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}/{}", self.client(), self.system())
    }
}
