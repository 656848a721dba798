//! Command implementations for the FOC CLI.
//!
//! Provides subcommands for inspecting and editing operation cost
//! templates, with the session state persisted in a SQLite key-value
//! store.

use clap::Subcommand;
use foc_store::session::OperationsSession;
use foc_store::sqlite::SqliteStore;

pub mod sheet;
pub mod templates;

#[derive(Subcommand)]
pub enum Command {
    /// Print the cost sheet for the current view
    Show,

    /// Export the current view as CSV
    Export {
        /// Output path for the cost sheet CSV
        #[arg(short = 'o', long)]
        out: String,
    },

    /// List stored templates
    Templates,

    /// Print the unsaved cost edits of the working copy
    Changes,

    /// Set a category or sub-operation cost for the displayed crop
    SetCost {
        /// Category: cultivation, drilling, application, harvesting or other
        #[arg(long)]
        category: String,

        /// Row number of a sub-operation within the category (as printed
        /// by `show`); omit to set the category cost itself
        #[arg(long)]
        sub: Option<usize>,

        /// New cost per hectare
        #[arg(long)]
        value: f64,
    },

    /// Switch the displayed crop
    Crop {
        /// Crop name, e.g. "Wheat (Winter)" or "All crops"
        #[arg(long)]
        name: String,
    },

    /// Switch the segmentation filter for the displayed crop
    Filter {
        /// Filter kind: none, end-use-market or variety
        #[arg(long)]
        kind: String,
    },

    /// Tick or untick one segment of the active filter
    Toggle {
        /// Segment name, e.g. "Milling"
        #[arg(long)]
        segment: String,
    },

    /// List the saved filter views of the current template
    Views,

    /// Display a saved filter view
    SelectView {
        /// Filter view id (as printed by `views`)
        #[arg(long)]
        view: String,
    },

    /// Delete a saved filter view
    DeleteView {
        /// Filter view id (as printed by `views`)
        #[arg(long)]
        view: String,
    },

    /// Make a template current
    Select {
        /// Template id (as printed by `templates`)
        #[arg(long)]
        template: String,
    },

    /// Save the working copy, optionally renaming it
    Save {
        /// New template name
        #[arg(long)]
        name: Option<String>,

        /// Save as a brand-new template instead of overwriting (requires --name)
        #[arg(long)]
        as_new: bool,
    },

    /// Rename a template
    Rename {
        /// Template id
        #[arg(long)]
        template: String,

        /// New template name
        #[arg(long)]
        name: String,
    },

    /// Delete a template (shipped defaults are kept)
    Delete {
        /// Template id
        #[arg(long)]
        template: String,
    },

    /// Restore baseline costs for the displayed crop, or the whole sheet
    Reset {
        /// Reset every crop instead of just the displayed one
        #[arg(long)]
        all: bool,
    },

    /// Roll back the unsaved edits of the displayed crop
    ResetView,

    /// Tag the current template with a crop, variety or field
    Assign {
        /// Entity kind: crop, variety or field
        #[arg(long)]
        entity_type: String,

        /// Entity id
        #[arg(long)]
        id: String,

        /// Display name for the entity
        #[arg(long)]
        name: String,
    },

    /// Remove an assignment from the current template
    Unassign {
        /// Assignment id (as printed by `templates`)
        #[arg(long)]
        id: String,
    },
}

pub fn run(store_path: &str, command: Command) -> anyhow::Result<()> {
    let storage = SqliteStore::open(store_path)?;
    let mut session = OperationsSession::open(Box::new(storage))?;

    match command {
        Command::Show => sheet::run_show(&session),
        Command::Export { out } => sheet::run_export(&session, &out),
        Command::Templates => templates::run_templates(&session),
        Command::Changes => sheet::run_changes(&session),
        Command::SetCost {
            category,
            sub,
            value,
        } => sheet::run_set_cost(&mut session, &category, sub, value),
        Command::Crop { name } => sheet::run_crop(&mut session, &name),
        Command::Filter { kind } => sheet::run_filter(&mut session, &kind),
        Command::Toggle { segment } => sheet::run_toggle(&mut session, &segment),
        Command::Views => templates::run_views(&session),
        Command::SelectView { view } => templates::run_select_view(&mut session, &view),
        Command::DeleteView { view } => templates::run_delete_view(&mut session, &view),
        Command::Select { template } => templates::run_select(&mut session, &template),
        Command::Save { name, as_new } => {
            templates::run_save(&mut session, name.as_deref(), as_new)
        }
        Command::Rename { template, name } => {
            templates::run_rename(&mut session, &template, &name)
        }
        Command::Delete { template } => templates::run_delete(&mut session, &template),
        Command::Reset { all } => sheet::run_reset(&mut session, all),
        Command::ResetView => sheet::run_reset_view(&mut session),
        Command::Assign {
            entity_type,
            id,
            name,
        } => templates::run_assign(&mut session, &entity_type, &id, &name),
        Command::Unassign { id } => templates::run_unassign(&mut session, &id),
    }
}
