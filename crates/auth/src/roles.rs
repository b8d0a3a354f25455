use core::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

use adminhub_core::DomainError;

/// Level assigned to any role name outside the known set.
///
/// Numerically above every defined role, so an unknown role never satisfies a
/// requirement expressed as a defined [`Role`].
pub const UNKNOWN_ROLE_LEVEL: u8 = 99;

/// Closed set of dashboard roles, most privileged first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Moderator,
    User,
}

impl Role {
    /// All roles in privilege order (owner first).
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admin, Role::Moderator, Role::User];

    /// Hierarchy level: lower is more privileged.
    pub const fn level(self) -> u8 {
        match self {
            Role::Owner => 1,
            Role::Admin => 2,
            Role::Moderator => 3,
            Role::User => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }

    /// True if this role is at least as privileged as `required`.
    pub const fn satisfies(self, required: Role) -> bool {
        self.level() <= required.level()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    /// Exact, case-sensitive match on the lowercase wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}

/// Hierarchy level of an arbitrary role name (unknown names map to 99).
pub fn hierarchy_level(name: &str) -> u8 {
    name.parse::<Role>()
        .map(Role::level)
        .unwrap_or(UNKNOWN_ROLE_LEVEL)
}

/// A role as reported by the remote procedure, coerced at the boundary.
///
/// A missing or empty value is not "unknown": it resolves to [`Role::User`].
/// Only a present, unrecognized value is kept as `Unrecognized` (level 99).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReportedRole {
    Known(Role),
    Unrecognized(String),
}

impl ReportedRole {
    pub fn from_wire(value: Option<&JsonValue>) -> Self {
        match value {
            None | Some(JsonValue::Null) => ReportedRole::Known(Role::User),
            Some(JsonValue::String(s)) if s.trim().is_empty() => ReportedRole::Known(Role::User),
            Some(JsonValue::String(s)) => s
                .parse::<Role>()
                .map(ReportedRole::Known)
                .unwrap_or_else(|_| ReportedRole::Unrecognized(s.clone())),
            Some(other) => ReportedRole::Unrecognized(other.to_string()),
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            ReportedRole::Known(role) => role.level(),
            ReportedRole::Unrecognized(_) => UNKNOWN_ROLE_LEVEL,
        }
    }

    pub fn known(&self) -> Option<Role> {
        match self {
            ReportedRole::Known(role) => Some(*role),
            ReportedRole::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReportedRole::Known(role) => role.as_str(),
            ReportedRole::Unrecognized(name) => name,
        }
    }
}

impl From<Role> for ReportedRole {
    fn from(role: Role) -> Self {
        ReportedRole::Known(role)
    }
}

impl Serialize for ReportedRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn levels_follow_fixed_order() {
        let levels: Vec<u8> = Role::ALL.iter().map(|r| r.level()).collect();
        assert_eq!(levels, vec![1, 2, 3, 4]);
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn role_names_parse_exactly() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("Admin".parse::<Role>().is_err());
        assert!(" moderator ".parse::<Role>().is_err());
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn case_or_whitespace_variants_are_unknown() {
        assert_eq!(hierarchy_level("OWNER"), UNKNOWN_ROLE_LEVEL);
        assert_eq!(hierarchy_level(" Admin "), UNKNOWN_ROLE_LEVEL);
        assert_eq!(hierarchy_level("admin "), UNKNOWN_ROLE_LEVEL);

        let role = ReportedRole::from_wire(Some(&json!("OWNER")));
        assert_eq!(role, ReportedRole::Unrecognized("OWNER".into()));
        assert_eq!(role.level(), UNKNOWN_ROLE_LEVEL);
        assert!(!Role::ALL.iter().any(|r| role.level() <= r.level()));
    }

    #[test]
    fn unknown_names_map_to_least_privileged_level() {
        assert_eq!(hierarchy_level("superuser"), UNKNOWN_ROLE_LEVEL);
        assert_eq!(hierarchy_level(""), UNKNOWN_ROLE_LEVEL);
        assert_eq!(hierarchy_level("owner"), 1);
    }

    #[test]
    fn missing_wire_role_defaults_to_user() {
        assert_eq!(ReportedRole::from_wire(None), ReportedRole::Known(Role::User));
        assert_eq!(
            ReportedRole::from_wire(Some(&json!(null))),
            ReportedRole::Known(Role::User)
        );
        assert_eq!(
            ReportedRole::from_wire(Some(&json!(""))),
            ReportedRole::Known(Role::User)
        );
    }

    #[test]
    fn unrecognized_wire_role_keeps_level_99() {
        let role = ReportedRole::from_wire(Some(&json!("root")));
        assert_eq!(role, ReportedRole::Unrecognized("root".into()));
        assert_eq!(role.level(), UNKNOWN_ROLE_LEVEL);
        assert_eq!(role.known(), None);

        let numeric = ReportedRole::from_wire(Some(&json!(1)));
        assert_eq!(numeric.level(), UNKNOWN_ROLE_LEVEL);
    }

    #[test]
    fn reported_role_serializes_as_plain_string() {
        let value = serde_json::to_value(ReportedRole::Known(Role::Moderator)).unwrap();
        assert_eq!(value, json!("moderator"));
        let value = serde_json::to_value(ReportedRole::Unrecognized("root".into())).unwrap();
        assert_eq!(value, json!("root"));
    }

    proptest! {
        /// No string outside the four role names can reach a defined level.
        #[test]
        fn arbitrary_names_never_gain_privilege(name in "[a-zA-Z_]{0,12}") {
            let level = hierarchy_level(&name);
            let is_known = Role::ALL.iter().any(|r| r.as_str() == name);
            if is_known {
                prop_assert!(level <= Role::User.level());
            } else {
                prop_assert_eq!(level, UNKNOWN_ROLE_LEVEL);
                for required in Role::ALL {
                    prop_assert!(level > required.level());
                }
            }
        }

        #[test]
        fn satisfies_matches_level_comparison(a in 0usize..4, b in 0usize..4) {
            let (have, need) = (Role::ALL[a], Role::ALL[b]);
            prop_assert_eq!(have.satisfies(need), have.level() <= need.level());
            prop_assert_eq!(have.satisfies(need), a <= b);
        }
    }
}
