//! Template-facing commands: listing, selecting, saving, renaming and
//! deleting templates, plus their saved filter views and assignments.

use anyhow::bail;
use foc_model::template::EntityKind;
use foc_store::session::OperationsSession;
use log::info;

/// List stored templates, with the selected template's assignments below.
pub fn run_templates(session: &OperationsSession) -> anyhow::Result<()> {
    for summary in session.template_summaries() {
        let marker = if summary.is_selected { "*" } else { " " };
        let mut flags = Vec::new();
        if summary.is_default {
            flags.push("default");
        }
        if !summary.is_editable {
            flags.push("read-only");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "{marker} {:<24} {:<22}{flags:<22} views:{} assignments:{} updated {}",
            summary.id,
            summary.name,
            summary.combination_count,
            summary.assignment_count,
            summary.updated_at.format("%Y-%m-%d %H:%M")
        );
    }

    let template = session.working_template();
    if !template.assignments.is_empty() {
        println!();
        println!("Assignments of {}:", template.name);
        for assignment in &template.assignments {
            let marker = if template.active_assignment_id.as_deref() == Some(assignment.id.as_str())
            {
                "*"
            } else {
                " "
            };
            println!(
                "{marker} {:<24} {:<8} {}",
                assignment.id, assignment.entity_type, assignment.entity_name
            );
        }
    }
    Ok(())
}

/// Make a template current.
pub fn run_select(session: &mut OperationsSession, id: &str) -> anyhow::Result<()> {
    if !session.select_template(id)? {
        bail!("no template with id {id}");
    }
    println!(
        "Selected '{}'; crop {}, {:.2} ha",
        session.working_template().name,
        session.selected_crop(),
        session.effective_hectares()
    );
    Ok(())
}

/// Save the working copy, or fork it into a new template.
pub fn run_save(
    session: &mut OperationsSession,
    name: Option<&str>,
    as_new: bool,
) -> anyhow::Result<()> {
    if as_new {
        let Some(name) = name else {
            bail!("--as-new requires --name");
        };
        let id = session.save_template_as_new(name)?;
        info!("saved new template {id}");
        println!("Saved '{name}' as {id} and selected it.");
        return Ok(());
    }

    if !session.save_template(name)? {
        println!(
            "'{}' is read-only; save it as a new template with --as-new --name.",
            session.working_template().name
        );
        return Ok(());
    }
    println!("Saved '{}'.", session.working_template().name);
    Ok(())
}

/// Rename a template.
pub fn run_rename(session: &mut OperationsSession, id: &str, name: &str) -> anyhow::Result<()> {
    if !session.rename_template(id, name)? {
        bail!("no template with id {id}");
    }
    println!("Renamed {id} to '{name}'.");
    Ok(())
}

/// Delete a template.
pub fn run_delete(session: &mut OperationsSession, id: &str) -> anyhow::Result<()> {
    if !session.delete_template(id)? {
        let shipped = session
            .template_summaries()
            .iter()
            .any(|summary| summary.id == id && summary.is_default);
        if shipped {
            println!("Shipped default templates cannot be deleted.");
            return Ok(());
        }
        bail!("no template with id {id}");
    }
    println!(
        "Deleted {id}; current template is '{}'.",
        session.working_template().name
    );
    Ok(())
}

/// List the saved filter views of the current template.
pub fn run_views(session: &OperationsSession) -> anyhow::Result<()> {
    let template = session.working_template();
    for combination in &template.filter_combinations {
        let marker = if template.active_filter_combination_id.as_deref()
            == Some(combination.id.as_str())
        {
            "*"
        } else {
            " "
        };
        println!("{marker} {:<24} {}", combination.id, combination.name);
    }
    Ok(())
}

/// Display a saved filter view.
pub fn run_select_view(session: &mut OperationsSession, id: &str) -> anyhow::Result<()> {
    if !session.select_filter_combination(id)? {
        bail!("no filter view with id {id}");
    }
    println!(
        "Viewing {}, {:.2} ha",
        session.selected_crop(),
        session.effective_hectares()
    );
    Ok(())
}

/// Delete a saved filter view.
pub fn run_delete_view(session: &mut OperationsSession, id: &str) -> anyhow::Result<()> {
    if !session.delete_filter_combination(id)? {
        if !session.is_editable() {
            println!(
                "'{}' is read-only; save it as a new template first.",
                session.working_template().name
            );
            return Ok(());
        }
        if session.working_template().filter_combinations.len() <= 1 {
            println!("A template keeps at least one saved view.");
            return Ok(());
        }
        bail!("no filter view with id {id}");
    }
    println!("Deleted filter view {id}.");
    Ok(())
}

/// Tag the current template with a crop, variety or field.
pub fn run_assign(
    session: &mut OperationsSession,
    entity_type: &str,
    entity_id: &str,
    entity_name: &str,
) -> anyhow::Result<()> {
    let kind: EntityKind = entity_type.parse().map_err(anyhow::Error::msg)?;
    if !session.add_assignment(kind, entity_id, entity_name)? {
        println!(
            "'{}' is read-only; save it as a new template first.",
            session.working_template().name
        );
        return Ok(());
    }
    println!(
        "Tagged '{}' with {kind} '{entity_name}'.",
        session.working_template().name
    );
    Ok(())
}

/// Remove an assignment from the current template.
pub fn run_unassign(session: &mut OperationsSession, id: &str) -> anyhow::Result<()> {
    if !session.delete_assignment(id)? {
        if !session.is_editable() {
            println!(
                "'{}' is read-only; save it as a new template first.",
                session.working_template().name
            );
            return Ok(());
        }
        bail!("no assignment with id {id}");
    }
    println!("Removed assignment {id}.");
    Ok(())
}
