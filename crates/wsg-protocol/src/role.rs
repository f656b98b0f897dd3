//! Endpoint role

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mask::random_mask_key;

/// Which side of the connection this endpoint is.
///
/// The role decides the masking rule: clients mask every outbound frame,
/// servers never do, and each side rejects input that breaks the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Server,
    Client,
}

impl Role {
    /// Masking key for a frame this endpoint is about to send
    pub fn outbound_mask(&self) -> Option<[u8; 4]> {
        match self {
            Role::Server => None,
            Role::Client => Some(random_mask_key()),
        }
    }

    /// Whether frames received by this endpoint must carry a masking key
    pub fn expects_masked_input(&self) -> bool {
        matches!(self, Role::Server)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => write!(f, "server"),
            Role::Client => write!(f, "client"),
        }
    }
}
