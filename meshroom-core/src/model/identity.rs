use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const IDENTITY_PREFIX: &str = "user_";
const IDENTITY_SUFFIX_LEN: usize = 9;

/// Opaque per-session participant identity.
///
/// Generated locally when a client joins and never persisted; uniqueness is
/// probabilistic only.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{IDENTITY_PREFIX}{}", &suffix[..IDENTITY_SUFFIX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
