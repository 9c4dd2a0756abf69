use authsim_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::wildcard::WildcardMatcher;

/// Proposed edit applied to one authorization-object row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectAction {
    /// Grant an additional value.
    Add,
    /// Replace the current value.
    Change,
    /// Drop the row from the role.
    Remove,
}

impl ObjectAction {
    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Change => "Change",
            Self::Remove => "Remove",
        }
    }

    /// Parses a wire value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "Add" => Ok(Self::Add),
            "Change" => Ok(Self::Change),
            "Remove" => Ok(Self::Remove),
            _ => Err(AppError::Validation(format!(
                "invalid action '{value}', expected one of Add, Change, Remove"
            ))),
        }
    }
}

/// Candidate replacement value offered for a `Change` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicOption {
    /// Value stored as the replacement text.
    pub value: String,
    /// Label shown to the user.
    pub label: String,
}

impl DynamicOption {
    /// Creates an option whose label is its value.
    #[must_use]
    pub fn from_ui_text(ui_text: impl Into<String>) -> Self {
        let value = ui_text.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Candidate value offered for an `Add` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSuggestion {
    /// Authorization value to grant.
    pub value: String,
    /// License the value would require.
    pub license: String,
    /// Display text used as the replacement text.
    pub ui_text: String,
    /// Optional long description.
    #[serde(default)]
    pub text: Option<String>,
}

/// Authorization-object row as reported by the backend for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAuthObject {
    /// Authorization object name.
    pub object: String,
    /// License classification of the row.
    pub classification: String,
    /// Authorization field name.
    pub field_name: String,
    /// Lower bound value.
    pub value_low: String,
    /// Upper bound value.
    pub value_high: String,
    /// Object description text.
    pub ttext: Option<String>,
}

/// Editable column of an authorization-object row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectField {
    /// Authorization object name.
    Object,
    /// Authorization field name.
    FieldName,
    /// Lower bound value.
    ValueLow,
    /// Upper bound value.
    ValueHigh,
    /// License classification.
    Classification,
    /// Object description text.
    Ttext,
}

impl ObjectField {
    /// Parses a column name in either camelCase or snake_case.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "object" => Ok(Self::Object),
            "fieldName" | "field_name" => Ok(Self::FieldName),
            "valueLow" | "value_low" => Ok(Self::ValueLow),
            "valueHigh" | "value_high" => Ok(Self::ValueHigh),
            "classification" => Ok(Self::Classification),
            "ttext" => Ok(Self::Ttext),
            _ => Err(AppError::Validation(format!(
                "unknown authorization object field '{value}'"
            ))),
        }
    }
}

/// One displayed authorization-object row, possibly carrying a drafted edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthObjectChange {
    /// Session-local row identifier.
    pub id: u64,
    /// Authorization object name.
    pub object: String,
    /// Authorization field name.
    pub field_name: String,
    /// Lower bound value.
    pub value_low: String,
    /// Upper bound value.
    pub value_high: String,
    /// License classification.
    pub classification: String,
    /// Object description text.
    pub ttext: Option<String>,
    /// Drafted edit, `None` when the row is unmodified.
    pub action: Option<ObjectAction>,
    /// Replacement text chosen for the edit.
    pub new_value: String,
    /// True for rows added in this session.
    pub is_new: bool,
    /// Lazily fetched replacement candidates for `Change`.
    #[serde(default)]
    pub dynamic_options: Option<Vec<DynamicOption>>,
    /// Lazily fetched candidates for `Add`.
    #[serde(default)]
    pub add_suggestions: Option<Vec<AddSuggestion>>,
    /// License of the chosen add suggestion.
    #[serde(default)]
    pub selected_license: Option<String>,
}

impl AuthObjectChange {
    /// Creates an unmodified row from backend data.
    #[must_use]
    pub fn from_server(id: u64, source: ServerAuthObject) -> Self {
        Self {
            id,
            object: source.object,
            field_name: source.field_name,
            value_low: source.value_low,
            value_high: source.value_high,
            classification: source.classification,
            ttext: source.ttext,
            action: None,
            new_value: String::new(),
            is_new: false,
            dynamic_options: None,
            add_suggestions: None,
            selected_license: None,
        }
    }

    /// Creates an empty row added in this session.
    #[must_use]
    pub fn new_row(id: u64) -> Self {
        Self {
            id,
            object: String::new(),
            field_name: String::new(),
            value_low: String::new(),
            value_high: String::new(),
            classification: String::new(),
            ttext: None,
            action: Some(ObjectAction::Add),
            new_value: String::new(),
            is_new: true,
            dynamic_options: None,
            add_suggestions: None,
            selected_license: None,
        }
    }

    /// Returns true when the row carries a drafted edit.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.action.is_some()
    }

    /// Sets the drafted action and discards state belonging to other actions.
    pub fn set_action(&mut self, action: Option<ObjectAction>) -> AppResult<()> {
        if self.is_new && action != Some(ObjectAction::Add) {
            return Err(AppError::Validation(format!(
                "row {} was added in this session and only supports the Add action",
                self.id
            )));
        }

        self.action = action;
        if action == Some(ObjectAction::Remove) {
            self.new_value.clear();
        }
        if action != Some(ObjectAction::Add) {
            self.add_suggestions = None;
            self.selected_license = None;
        }
        if action != Some(ObjectAction::Change) {
            self.dynamic_options = None;
        }

        Ok(())
    }

    /// Sets one editable column.
    pub fn set_field(&mut self, field: ObjectField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ObjectField::Object => self.object = value,
            ObjectField::FieldName => self.field_name = value,
            ObjectField::ValueLow => self.value_low = value,
            ObjectField::ValueHigh => self.value_high = value,
            ObjectField::Classification => self.classification = value,
            ObjectField::Ttext => self.ttext = Some(value),
        }
    }

    /// Sets the replacement text, ignored while the row is marked for removal.
    pub fn set_new_value(&mut self, value: impl Into<String>) {
        if self.action == Some(ObjectAction::Remove) {
            return;
        }
        self.new_value = value.into();
    }

    /// Applies a chosen add suggestion.
    pub fn apply_add_suggestion(&mut self, suggestion: &AddSuggestion) {
        self.value_low = suggestion.value.clone();
        self.selected_license = Some(suggestion.license.clone());
        self.new_value = suggestion.ui_text.clone();
    }

    /// Returns true when object and field name are both present.
    #[must_use]
    pub fn has_object_and_field(&self) -> bool {
        !self.object.trim().is_empty() && !self.field_name.trim().is_empty()
    }
}

/// Returns the rows whose object name matches the search token.
pub fn filter_objects<'a>(
    rows: &'a [AuthObjectChange],
    object_search: &str,
) -> AppResult<Vec<&'a AuthObjectChange>> {
    let matcher = WildcardMatcher::compile(object_search)?;
    Ok(rows
        .iter()
        .filter(|row| matcher.is_match(row.object.as_str()))
        .collect())
}
