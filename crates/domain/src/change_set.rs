use std::fmt::{Display, Formatter};

use authsim_core::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth_object::{AuthObjectChange, ObjectAction};
use crate::draft::RoleDraft;

/// One submitted edit, in the backend's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetEntry {
    /// Role the edit applies to.
    pub role_id: String,
    /// Authorization object name.
    pub object: String,
    /// Authorization field name.
    pub field_name: String,
    /// Lower bound value.
    pub value_low: String,
    /// Upper bound value.
    pub value_high: String,
    /// Object description text.
    pub ttext: String,
    /// Original license classification.
    pub classification: String,
    /// Requested edit.
    pub action: ObjectAction,
    /// Replacement text chosen by the user.
    pub new_value_ui_text: String,
    /// True for rows added in this session.
    pub is_new_object: bool,
    /// Session-local row identifier, echoed back for tracking.
    pub frontend_id: u64,
    /// License of the chosen add suggestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_license: Option<String>,
}

impl ChangeSetEntry {
    fn from_row(role_id: &str, action: ObjectAction, row: &AuthObjectChange) -> Self {
        Self {
            role_id: role_id.to_owned(),
            object: row.object.clone(),
            field_name: row.field_name.clone(),
            value_low: row.value_low.clone(),
            value_high: row.value_high.clone(),
            ttext: row.ttext.clone().unwrap_or_default(),
            classification: row.classification.clone(),
            action,
            new_value_ui_text: row.new_value.clone(),
            is_new_object: row.is_new,
            frontend_id: row.id,
            selected_license: if action == ObjectAction::Add {
                row.selected_license.clone()
            } else {
                None
            },
        }
    }

    fn violations(&self) -> Vec<ChangeSetViolation> {
        let mut kinds = Vec::new();

        let missing: Vec<&'static str> = [
            ("role_id", self.role_id.as_str()),
            ("object", self.object.as_str()),
            ("field_name", self.field_name.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            kinds.push(ViolationKind::MissingRequiredFields(missing));
        }

        match self.action {
            ObjectAction::Add if self.value_low.trim().is_empty() => {
                kinds.push(ViolationKind::AddWithoutValueLow);
            }
            ObjectAction::Change if self.new_value_ui_text.trim().is_empty() => {
                kinds.push(ViolationKind::ChangeWithoutReplacement);
            }
            _ => {}
        }

        kinds
            .into_iter()
            .map(|kind| ChangeSetViolation {
                role_id: self.role_id.clone(),
                object: self.object.clone(),
                frontend_id: self.frontend_id,
                kind,
            })
            .collect()
    }
}

/// Reason one change-set entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// Identifying columns are blank.
    MissingRequiredFields(Vec<&'static str>),
    /// `Add` without a lower bound value.
    AddWithoutValueLow,
    /// `Change` without a chosen replacement text.
    ChangeWithoutReplacement,
}

/// One validation failure, naming the role and object it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetViolation {
    /// Role of the rejected entry.
    pub role_id: String,
    /// Object of the rejected entry.
    pub object: String,
    /// Row identifier of the rejected entry.
    pub frontend_id: u64,
    /// What is wrong.
    pub kind: ViolationKind,
}

impl Display for ChangeSetViolation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "role '{}' object '{}' (row {}): ",
            self.role_id, self.object, self.frontend_id
        )?;
        match &self.kind {
            ViolationKind::MissingRequiredFields(fields) => {
                write!(formatter, "missing required fields {}", fields.join(", "))
            }
            ViolationKind::AddWithoutValueLow => {
                formatter.write_str("Add operation requires value_low")
            }
            ViolationKind::ChangeWithoutReplacement => {
                formatter.write_str("Change operation requires new_value_ui_text")
            }
        }
    }
}

/// Aggregate rejection listing every violation in the change-set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("change-set rejected with {} violation(s): {}", .violations.len(), join_violations(.violations))]
pub struct ChangeSetRejected {
    /// Every violation found, in change-set order.
    pub violations: Vec<ChangeSetViolation>,
}

fn join_violations(violations: &[ChangeSetViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ChangeSetRejected> for AppError {
    fn from(value: ChangeSetRejected) -> Self {
        Self::Validation(value.to_string())
    }
}

/// Flattened, validated batch of pending edits across roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    entries: Vec<ChangeSetEntry>,
}

impl ChangeSet {
    /// Flattens every drafted role into one ordered, validated change-set.
    pub fn from_draft(draft: &RoleDraft) -> Result<Self, ChangeSetRejected> {
        let entries: Vec<ChangeSetEntry> = draft
            .iter()
            .flat_map(|entry| {
                entry.rows.iter().filter_map(|row| {
                    row.action
                        .map(|action| ChangeSetEntry::from_row(entry.role_id.as_str(), action, row))
                })
            })
            .collect();

        let violations: Vec<ChangeSetViolation> =
            entries.iter().flat_map(ChangeSetEntry::violations).collect();
        if !violations.is_empty() {
            return Err(ChangeSetRejected { violations });
        }

        Ok(Self { entries })
    }

    /// Returns the entries in submission order.
    #[must_use]
    pub fn entries(&self) -> &[ChangeSetEntry] {
        self.entries.as_slice()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts entries per action.
    #[must_use]
    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for entry in &self.entries {
            match entry.action {
                ObjectAction::Add => summary.adds += 1,
                ObjectAction::Change => summary.changes += 1,
                ObjectAction::Remove => summary.removes += 1,
            }
        }
        summary
    }
}

/// Per-action entry counts of one change-set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Number of `Add` entries.
    pub adds: usize,
    /// Number of `Change` entries.
    pub changes: usize,
    /// Number of `Remove` entries.
    pub removes: usize,
}

impl Display for ChangeSummary {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = [
            (self.adds, ObjectAction::Add),
            (self.changes, ObjectAction::Change),
            (self.removes, ObjectAction::Remove),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, action)| {
            let plural = if count > 1 { "s" } else { "" };
            format!("{count} {}{plural}", action.as_str())
        })
        .collect();

        if parts.is_empty() {
            formatter.write_str("no changes")
        } else {
            formatter.write_str(parts.join(", ").as_str())
        }
    }
}
