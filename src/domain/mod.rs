//! Domain types shared by the service and API layers.
//!
//! Record types here never carry password or passcode hashes; those stay
//! inside the repositories.

pub mod events;
pub mod validation;

use serde::Serialize;
use std::fmt;

/// Identifier of a member record.
///
/// Members are addressed by UUID strings. Parsing normalises the textual form
/// so lookups do not depend on how a client spelled the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberId(uuid::Uuid);

impl MemberId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parses a client supplied id. Returns `None` for anything that is not a UUID.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        uuid::Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public view of an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub two_factor_enabled: bool,
    pub created_at: String,
}

/// Public view of a member. The password hash is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: String,
    pub username: String,
    pub email: String,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_parse() {
        let id = MemberId::generate();
        let parsed = MemberId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);

        let upper = id.to_string().to_uppercase();
        assert_eq!(MemberId::parse(&upper).unwrap(), id);

        assert!(MemberId::parse("42").is_none());
        assert!(MemberId::parse("").is_none());
    }
}
