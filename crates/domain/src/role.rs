use authsim_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::wildcard::WildcardMatcher;

/// Role available for simulation inside one `(client, system)` scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: NonEmptyString,
    description: String,
    classification: String,
    profile: Option<String>,
    gb: u32,
    gc: u32,
    gd: u32,
    not_classified: u32,
    assigned_users: u32,
}

/// Input payload used to construct a validated role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleInput {
    /// Role identifier.
    pub id: String,
    /// Free-text role description.
    pub description: String,
    /// License classification reported for the role.
    pub classification: String,
    /// Generated profile name, when the backend reports one.
    pub profile: Option<String>,
    /// Count of GB (advanced use) authorizations.
    pub gb: u32,
    /// Count of GC (core use) authorizations.
    pub gc: u32,
    /// Count of GD (self-service use) authorizations.
    pub gd: u32,
    /// Count of unclassified authorizations.
    pub not_classified: u32,
    /// Number of users assigned to the role.
    pub assigned_users: u32,
}

impl Role {
    /// Creates a validated role.
    pub fn new(input: RoleInput) -> AppResult<Self> {
        Ok(Self {
            id: NonEmptyString::new(input.id.trim())?,
            description: input.description,
            classification: input.classification,
            profile: input.profile,
            gb: input.gb,
            gc: input.gc,
            gd: input.gd,
            not_classified: input.not_classified,
            assigned_users: input.assigned_users,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the role description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the license classification.
    #[must_use]
    pub fn classification(&self) -> &str {
        self.classification.as_str()
    }

    /// Returns the generated profile name.
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Returns the GB authorization count.
    #[must_use]
    pub fn gb(&self) -> u32 {
        self.gb
    }

    /// Returns the GC authorization count.
    #[must_use]
    pub fn gc(&self) -> u32 {
        self.gc
    }

    /// Returns the GD authorization count.
    #[must_use]
    pub fn gd(&self) -> u32 {
        self.gd
    }

    /// Returns the unclassified authorization count.
    #[must_use]
    pub fn not_classified(&self) -> u32 {
        self.not_classified
    }

    /// Returns the number of assigned users.
    #[must_use]
    pub fn assigned_users(&self) -> u32 {
        self.assigned_users
    }
}

/// Combined role-ID search and classification filter.
#[derive(Debug, Clone, Default)]
pub struct RoleFilter {
    role_id: WildcardMatcher,
    classification: WildcardMatcher,
}

impl RoleFilter {
    /// Builds a filter from the raw search token and classification search token.
    ///
    /// A classification token of `all` accepts every classification.
    pub fn new(role_search: &str, classification: &str) -> AppResult<Self> {
        let classification = if classification.trim().eq_ignore_ascii_case("all") {
            WildcardMatcher::match_all()
        } else {
            WildcardMatcher::compile(classification)?
        };

        Ok(Self {
            role_id: WildcardMatcher::compile(role_search)?,
            classification,
        })
    }

    /// Returns true when the role passes both criteria.
    #[must_use]
    pub fn matches(&self, role: &Role) -> bool {
        self.role_id.is_match(role.id()) && self.classification.is_match(role.classification())
    }

    /// Returns the roles passing the filter, preserving input order.
    #[must_use]
    pub fn apply<'a>(&self, roles: &'a [Role]) -> Vec<&'a Role> {
        roles.iter().filter(|role| self.matches(role)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, RoleFilter, RoleInput};

    fn role(id: &str, classification: &str) -> Role {
        Role::new(RoleInput {
            id: id.to_owned(),
            classification: classification.to_owned(),
            ..RoleInput::default()
        })
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn role_requires_identifier() {
        assert!(Role::new(RoleInput::default()).is_err());
    }

    #[test]
    fn classification_search_uses_wildcard_rules() {
        let roles = vec![
            role("Z_ROLE_A", "GB Advanced Use"),
            role("Z_ROLE_B", "GC Core Use"),
        ];
        let ids = |classification: &str| -> Vec<String> {
            RoleFilter::new("", classification)
                .unwrap_or_else(|_| unreachable!())
                .apply(&roles)
                .iter()
                .map(|role| role.id().to_owned())
                .collect()
        };

        assert_eq!(ids("GB*Use"), vec!["Z_ROLE_A"]);
        assert_eq!(ids("%core%"), vec!["Z_ROLE_B"]);
        assert_eq!(ids("gc"), vec!["Z_ROLE_B"]);
        assert!(ids("Advanced").is_empty());
        assert_eq!(ids("ALL").len(), 2);
        assert_eq!(ids("  ").len(), 2);
    }

    #[test]
    fn role_filter_combines_search_and_classification() {
        let roles = vec![
            role("Z_ROLE_A", "GB Advanced Use"),
            role("Z_ROLE_B", "GC Core Use"),
            role("SAP_ALL", "GB Advanced Use"),
        ];

        let filter = RoleFilter::new("z_", "gb advanced").unwrap_or_else(|_| unreachable!());
        let ids: Vec<&str> = filter.apply(&roles).iter().map(|role| role.id()).collect();
        assert_eq!(ids, vec!["Z_ROLE_A"]);

        let filter = RoleFilter::new("*_B", "all").unwrap_or_else(|_| unreachable!());
        let ids: Vec<&str> = filter.apply(&roles).iter().map(|role| role.id()).collect();
        assert_eq!(ids, vec!["Z_ROLE_B"]);
    }
}
