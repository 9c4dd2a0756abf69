use std::sync::Arc;

use authsim_application::{AuthObjectCatalog, OptionsApplied, OptionsFetch, SimulationSession};
use authsim_core::{AppError, AppResult};
use authsim_domain::{
    AuthObjectChange, ObjectAction, ObjectField, Role, RoleFilter, RunOverview, filter_objects,
};
use tracing::warn;

/// CLI front of one simulation session.
pub struct Runner {
    catalog: Arc<dyn AuthObjectCatalog>,
    session: SimulationSession,
}

impl Runner {
    pub fn new(catalog: Arc<dyn AuthObjectCatalog>, session: SimulationSession) -> Self {
        Self { catalog, session }
    }

    pub async fn roles(&self, search: &str, classification: &str) -> AppResult<()> {
        let filter = RoleFilter::new(search, classification)?;
        let roles = self
            .catalog
            .list_roles(self.session.manager().scope())
            .await?;
        let pending = self.session.manager().pending_role_ids();

        for role in filter.apply(&roles) {
            let marker = if pending.contains(&role.id()) { "*" } else { " " };
            println!(
                "{marker} {:<30} {:<20} users={:<5} gb={} gc={} gd={} unclassified={}  {}",
                role.id(),
                role.classification(),
                role.assigned_users(),
                role.gb(),
                role.gc(),
                role.gd(),
                role.not_classified(),
                role.description()
            );
        }
        Ok(())
    }

    pub async fn objects(&mut self, role_id: &str, search: &str) -> AppResult<()> {
        let rows = self.load_role(role_id).await?;
        for row in filter_objects(&rows, search)? {
            print_row(row);
        }
        Ok(())
    }

    pub async fn stage(
        &mut self,
        role_id: &str,
        row_id: u64,
        action: &str,
        value: Option<String>,
    ) -> AppResult<()> {
        let action = match action {
            "none" | "None" | "" => None,
            action => Some(ObjectAction::parse(action)?),
        };
        self.load_role(role_id).await?;

        let manager = self.session.manager_mut();
        let recorded = manager.record_action(row_id, action).await?;
        self.report_options(recorded.options_fetch).await?;

        if let Some(value) = value {
            self.session
                .manager_mut()
                .update_new_value(row_id, value)
                .await?;
        }

        self.print_selected_row(row_id)
    }

    pub async fn add(
        &mut self,
        role_id: &str,
        object: String,
        field: String,
        value_low: Option<String>,
    ) -> AppResult<()> {
        self.load_role(role_id).await?;

        let manager = self.session.manager_mut();
        let row_id = manager.add_row().await?;
        manager
            .update_value(row_id, ObjectField::Object, object)
            .await?;
        manager
            .update_value(row_id, ObjectField::FieldName, field)
            .await?;
        let fetch = manager.retry_options(row_id)?;
        self.report_options(fetch).await?;

        if let Some(value_low) = value_low {
            self.session
                .manager_mut()
                .update_value(row_id, ObjectField::ValueLow, value_low)
                .await?;
        }

        self.print_selected_row(row_id)
    }

    pub async fn reset(&mut self, role_id: &str) -> AppResult<()> {
        let rows = self.session.manager_mut().reset(role_id).await?;
        println!("reset {role_id}, {} server row(s) remain", rows.len());
        Ok(())
    }

    pub fn pending(&self) -> AppResult<()> {
        let manager = self.session.manager();
        let role_ids = manager.pending_role_ids();
        if role_ids.is_empty() {
            println!("no pending changes");
            return Ok(());
        }

        println!("roles with pending changes: {}", role_ids.join(", "));
        match manager.build_change_set() {
            Ok(change_set) => println!("change-set: {}", change_set.summary()),
            Err(rejected) => {
                for violation in &rejected.violations {
                    println!("  invalid: {violation}");
                }
            }
        }
        Ok(())
    }

    pub async fn submit(&mut self, follow: bool) -> AppResult<()> {
        let receipt = self.session.run_simulation().await?;
        println!(
            "request {} submitted as run {} ({})",
            receipt.request_number, receipt.run.simulation_run_id, receipt.summary
        );
        if !follow {
            return Ok(());
        }

        let run = self.session.await_outcome().await?;
        println!(
            "run {} finished: {}",
            run.simulation_run_id,
            run.status.as_str()
        );
        Ok(())
    }

    pub async fn runs(&self) -> AppResult<()> {
        for overview in self.session.run_overviews().await? {
            print_overview(&overview);
        }
        Ok(())
    }

    pub async fn clear(&mut self) -> AppResult<()> {
        self.session.manager_mut().clear_all().await?;
        println!("session draft cleared");
        Ok(())
    }

    pub async fn close(&self) {
        self.session.close().await;
    }

    async fn load_role(&mut self, role_id: &str) -> AppResult<Vec<AuthObjectChange>> {
        let role = self.find_role(role_id).await?;
        self.session.manager_mut().fetch_role(&role).await
    }

    async fn find_role(&self, role_id: &str) -> AppResult<Role> {
        self.catalog
            .list_roles(self.session.manager().scope())
            .await?
            .into_iter()
            .find(|role| role.id() == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    async fn report_options(&mut self, fetch: OptionsFetch) -> AppResult<()> {
        match fetch {
            OptionsFetch::Issued(_) => {
                match self.session.manager_mut().next_options_outcome().await? {
                    OptionsApplied::Applied(_) | OptionsApplied::Stale(_) => {}
                    OptionsApplied::Failed { request, error } => {
                        warn!(
                            object = %request.object,
                            field_name = %request.field_name,
                            error = %error,
                            "candidate values unavailable"
                        );
                        println!(
                            "candidate values for {}/{} unavailable: {error}",
                            request.object, request.field_name
                        );
                    }
                }
            }
            OptionsFetch::MissingObjectOrField => {
                println!("object and field are required to look up candidate values");
            }
            OptionsFetch::NotRequired => {}
        }
        Ok(())
    }

    fn print_selected_row(&self, row_id: u64) -> AppResult<()> {
        let rows = self.session.manager().rows()?;
        let row = rows
            .iter()
            .find(|row| row.id == row_id)
            .ok_or_else(|| AppError::NotFound(format!("row {row_id} does not exist")))?;

        print_row(row);
        for option in row.dynamic_options.iter().flatten() {
            println!("    option: {}", option.label);
        }
        for suggestion in row.add_suggestions.iter().flatten() {
            println!(
                "    suggestion: {} [{}] {}",
                suggestion.value, suggestion.license, suggestion.ui_text
            );
        }
        Ok(())
    }
}

fn print_row(row: &AuthObjectChange) {
    let action = row.action.map_or("-", |action| action.as_str());
    println!(
        "{:>14} {:<7} {:<12} {:<10} {:<12} {:<12} {}",
        row.id, action, row.object, row.field_name, row.value_low, row.value_high, row.new_value
    );
}

fn print_overview(overview: &RunOverview) {
    let figure = |value: Option<f64>| {
        value.map_or_else(|| "-".to_owned(), |value| format!("{value:.2}"))
    };
    println!(
        "{:<8} {:<20} {} simulated={} actual={} savings={}",
        overview.simulation_run_id,
        overview.status.as_str(),
        overview.timestamp.format("%Y-%m-%d %H:%M:%S"),
        figure(overview.simulation_fue),
        figure(overview.actual_fue),
        figure(overview.savings)
    );
}
