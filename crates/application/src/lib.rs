//! Application services and ports.

#![forbid(unsafe_code)]

mod change_set_manager;
mod run_status_poller;
mod simulation_ports;
mod simulation_session;

pub use change_set_manager::{
    ActionRecorded, ChangeSetManager, OptionsApplied, OptionsFetch, OptionsKind, OptionsOutcome,
    OptionsRequest,
};
pub use run_status_poller::{PollerConfig, PollerEvent, PollerState, RunStatusPoller};
pub use simulation_ports::{AuthObjectCatalog, DraftStore, SimulationGateway, SubmittedRun};
pub use simulation_session::{SimulationSession, SubmissionReceipt};
