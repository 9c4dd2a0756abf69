//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod auth_object;
mod change_set;
mod draft;
mod role;
mod simulation;
mod wildcard;

pub use auth_object::{
    AddSuggestion, AuthObjectChange, DynamicOption, ObjectAction, ObjectField, ServerAuthObject,
    filter_objects,
};
pub use change_set::{
    ChangeSet, ChangeSetEntry, ChangeSetRejected, ChangeSetViolation, ChangeSummary,
    ViolationKind,
};
pub use draft::{RoleDraft, RoleDraftEntry, merge_rows};
pub use role::{Role, RoleFilter, RoleInput};
pub use simulation::{
    RunOverview, SimulationChange, SimulationRun, SimulationRunStatus, has_active_run,
    sort_runs_newest_first,
};
pub use wildcard::WildcardMatcher;
