use serde::{Deserialize, Serialize};

use crate::auth_object::AuthObjectChange;

/// Drafted rows for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDraftEntry {
    /// Role the rows belong to.
    pub role_id: String,
    /// Full row list for the role, including unmodified rows.
    pub rows: Vec<AuthObjectChange>,
}

/// Unsaved edits for every role of one `(client, system)` scope.
///
/// Roles keep the order in which they were first drafted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDraft {
    roles: Vec<RoleDraftEntry>,
}

impl RoleDraft {
    /// Creates an empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when no role has drafted rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns the drafted rows for one role.
    #[must_use]
    pub fn rows(&self, role_id: &str) -> Option<&[AuthObjectChange]> {
        self.roles
            .iter()
            .find(|entry| entry.role_id == role_id)
            .map(|entry| entry.rows.as_slice())
    }

    /// Returns mutable drafted rows for one role.
    pub fn rows_mut(&mut self, role_id: &str) -> Option<&mut Vec<AuthObjectChange>> {
        self.roles
            .iter_mut()
            .find(|entry| entry.role_id == role_id)
            .map(|entry| &mut entry.rows)
    }

    /// Replaces the rows of one role, keeping its original position.
    pub fn set_rows(&mut self, role_id: &str, rows: Vec<AuthObjectChange>) {
        match self.rows_mut(role_id) {
            Some(existing) => *existing = rows,
            None => self.roles.push(RoleDraftEntry {
                role_id: role_id.to_owned(),
                rows,
            }),
        }
    }

    /// Removes one role from the draft and reports whether it was present.
    pub fn remove(&mut self, role_id: &str) -> bool {
        let before = self.roles.len();
        self.roles.retain(|entry| entry.role_id != role_id);
        self.roles.len() != before
    }

    /// Iterates drafted roles in draft order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleDraftEntry> {
        self.roles.iter()
    }

    /// Returns the ids of roles holding at least one modified row.
    #[must_use]
    pub fn pending_role_ids(&self) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|entry| entry.rows.iter().any(AuthObjectChange::is_modified))
            .map(|entry| entry.role_id.as_str())
            .collect()
    }

    /// Returns the highest row id across every drafted role.
    #[must_use]
    pub fn max_row_id(&self) -> Option<u64> {
        self.roles
            .iter()
            .flat_map(|entry| entry.rows.iter())
            .map(|row| row.id)
            .max()
    }
}

/// Overlays drafted rows onto the server rows of one role.
///
/// Server rows without a drafted counterpart are kept as-is and drafted rows
/// added in this session are appended after them.
#[must_use]
pub fn merge_rows(
    server_rows: &[AuthObjectChange],
    drafted_rows: Option<&[AuthObjectChange]>,
) -> Vec<AuthObjectChange> {
    let Some(drafted_rows) = drafted_rows else {
        return server_rows.to_vec();
    };

    let mut merged: Vec<AuthObjectChange> = server_rows
        .iter()
        .map(|server_row| {
            drafted_rows
                .iter()
                .find(|drafted| !drafted.is_new && drafted.id == server_row.id)
                .cloned()
                .unwrap_or_else(|| server_row.clone())
        })
        .collect();

    merged.extend(
        drafted_rows
            .iter()
            .filter(|drafted| {
                drafted.is_new && !server_rows.iter().any(|server| server.id == drafted.id)
            })
            .cloned(),
    );

    merged
}

#[cfg(test)]
mod tests {
    use super::{RoleDraft, merge_rows};
    use crate::auth_object::{AuthObjectChange, ObjectAction, ServerAuthObject};

    fn server_row(id: u64, object: &str) -> AuthObjectChange {
        AuthObjectChange::from_server(
            id,
            ServerAuthObject {
                object: object.to_owned(),
                classification: "GC Core Use".to_owned(),
                field_name: "ACTVT".to_owned(),
                value_low: "03".to_owned(),
                value_high: String::new(),
                ttext: None,
            },
        )
    }

    #[test]
    fn merge_without_draft_returns_server_rows() {
        let server = vec![server_row(1, "S_TCODE"), server_row(2, "M_EINF_EKO")];
        assert_eq!(merge_rows(&server, None), server);
    }

    #[test]
    fn merge_overlays_drafted_rows_and_appends_new_ones() {
        let server = vec![
            server_row(1, "S_TCODE"),
            server_row(2, "M_EINF_EKO"),
            server_row(3, "F_BKPF_BUK"),
        ];

        let mut changed = server[1].clone();
        assert!(changed.set_action(Some(ObjectAction::Remove)).is_ok());
        let added = AuthObjectChange::new_row(1_700_000_000_000);
        let drafted = vec![server[0].clone(), changed.clone(), added.clone()];

        let merged = merge_rows(&server, Some(&drafted));
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0], server[0]);
        assert_eq!(merged[1], changed);
        assert_eq!(merged[2], server[2]);
        assert_eq!(merged[3], added);
    }

    #[test]
    fn draft_keeps_first_insertion_order() {
        let mut draft = RoleDraft::new();
        draft.set_rows("B", vec![server_row(1, "S_TCODE")]);
        draft.set_rows("A", vec![server_row(1, "S_TCODE")]);
        draft.set_rows("B", vec![server_row(2, "M_EINF_EKO")]);

        let order: Vec<&str> = draft.iter().map(|entry| entry.role_id.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
        assert_eq!(draft.max_row_id(), Some(2));
        assert!(draft.pending_role_ids().is_empty());

        assert!(draft.remove("B"));
        assert!(!draft.remove("B"));
    }
}
