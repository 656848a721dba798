//! Sheet-facing commands: printing, exporting and editing the cost table
//! of the current view.

use anyhow::bail;
use csv::Writer;
use foc_model::crop::FilterKind;
use foc_model::operation::CategoryId;
use foc_store::models::SheetView;
use foc_store::session::OperationsSession;
use foc_utils::money::format_gbp;
use log::info;

fn print_row(name: &str, cost_per_ha: f64, total_cost: f64) {
    let rate = format!("{}/ha", format_gbp(cost_per_ha));
    println!("{name:<42}{rate:>14}{:>16}", format_gbp(total_cost));
}

/// Print the cost sheet for the current view.
pub fn run_show(session: &OperationsSession) -> anyhow::Result<()> {
    let view = session.sheet_view();

    let marker = if view.is_editable { "" } else { " [read-only]" };
    println!("{}{marker}  ({})", view.template_name, view.template_id);
    println!("Crop: {}, {:.2} ha", view.crop, view.effective_hectares);
    if view.filter != FilterKind::None {
        println!(
            "Filter: {} [{}]",
            view.filter.display_name(),
            view.sub_filters.join(", ")
        );
    } else {
        let offered: Vec<&str> = session
            .available_filters()
            .into_iter()
            .filter(|kind| *kind != FilterKind::None)
            .map(|kind| kind.as_str())
            .collect();
        if !offered.is_empty() {
            println!("Filters available: {}", offered.join(", "));
        }
    }
    println!();

    for category in &view.categories {
        print_row(&category.name, category.cost_per_ha, category.total_cost);
        for (i, sub) in category.sub_operations.iter().enumerate() {
            let label = format!("  {:>2}. {}", i + 1, sub.name);
            print_row(&label, sub.cost_per_ha, sub.total_cost);
        }
    }
    println!();
    print_row("Total", view.total_average_cost, view.total_cost);
    Ok(())
}

/// The current view rendered as a CSV table, one row per category and
/// sub-operation plus a trailing total row.
pub fn sheet_csv(view: &SheetView) -> anyhow::Result<String> {
    let mut writer = Writer::from_writer(vec![]);
    writer.write_record(["CATEGORY", "OPERATION", "COST_PER_HA", "TOTAL_COST"])?;
    for category in &view.categories {
        writer.write_record([
            category.name.as_str(),
            "",
            &format!("{:.2}", category.cost_per_ha),
            &format!("{:.2}", category.total_cost),
        ])?;
        for sub in &category.sub_operations {
            writer.write_record([
                category.name.as_str(),
                sub.name.as_str(),
                &format!("{:.2}", sub.cost_per_ha),
                &format!("{:.2}", sub.total_cost),
            ])?;
        }
    }
    writer.write_record([
        "Total",
        "",
        &format!("{:.2}", view.total_average_cost),
        &format!("{:.2}", view.total_cost),
    ])?;
    Ok(String::from_utf8(writer.into_inner()?)?)
}

/// Export the current view as CSV.
pub fn run_export(session: &OperationsSession, out: &str) -> anyhow::Result<()> {
    let view = session.sheet_view();
    let csv = sheet_csv(&view)?;
    std::fs::write(out, csv)?;
    info!("Exported {} view of {} to {out}", view.crop, view.template_name);
    println!("Exported {} view to {out}", view.crop);
    Ok(())
}

/// Print the unsaved cost edits of the working copy.
pub fn run_changes(session: &OperationsSession) -> anyhow::Result<()> {
    let log = session.change_log();
    if log.is_empty() {
        println!("No unsaved edits.");
        return Ok(());
    }
    for row in log {
        println!(
            "{}  {:<16} {:<28} was {}/ha",
            row.recorded_at.format("%Y-%m-%d %H:%M"),
            row.crop,
            row.operation,
            format_gbp(row.previous_cost_per_ha)
        );
    }
    Ok(())
}

/// Set a category or sub-operation cost for the displayed crop.
pub fn run_set_cost(
    session: &mut OperationsSession,
    category: &str,
    sub: Option<usize>,
    value: f64,
) -> anyhow::Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("cost must be a non-negative number, got {value}");
    }
    let category: CategoryId = category.parse().map_err(anyhow::Error::msg)?;
    if sub == Some(0) {
        bail!("sub-operation row numbers start at 1");
    }

    let applied = match sub {
        Some(row) => session.edit_sub_operation_cost(category, row - 1, value),
        None => session.edit_category_cost(category, value),
    };
    if !applied {
        if !session.is_editable() {
            println!(
                "'{}' is read-only; save it as a new template first.",
                session.working_template().name
            );
            return Ok(());
        }
        bail!("no sub-operation row {} in {category}", sub.unwrap_or(0));
    }

    let view = session.sheet_view();
    println!(
        "{category} updated for {}; sheet total {} ({}/ha)",
        view.crop,
        format_gbp(view.total_cost),
        format_gbp(view.total_average_cost)
    );
    Ok(())
}

/// Switch the displayed crop.
pub fn run_crop(session: &mut OperationsSession, name: &str) -> anyhow::Result<()> {
    if !session.select_crop(name) {
        let data = &session.working_template().data;
        let known: Vec<&str> = std::iter::once(foc_model::crop::ALL_CROPS)
            .chain(data.real_crop_names())
            .collect();
        bail!("unknown crop: {name} (known: {})", known.join(", "));
    }
    println!("Crop: {name}, {:.2} ha", session.effective_hectares());
    Ok(())
}

/// Switch the segmentation filter for the displayed crop.
pub fn run_filter(session: &mut OperationsSession, kind: &str) -> anyhow::Result<()> {
    let kind: FilterKind = kind.parse().map_err(anyhow::Error::msg)?;
    session.select_filter(kind);
    if kind == FilterKind::None {
        println!(
            "Filter cleared; {} covers {:.2} ha",
            session.selected_crop(),
            session.effective_hectares()
        );
    } else {
        println!(
            "Filter: {kind} [{}], {:.2} ha",
            session.selected_sub_filters().join(", "),
            session.effective_hectares()
        );
    }
    Ok(())
}

/// Tick or untick one segment of the active filter.
pub fn run_toggle(session: &mut OperationsSession, segment: &str) -> anyhow::Result<()> {
    if !session.toggle_sub_filter(segment) {
        if session.selected_filter() == FilterKind::None {
            bail!("no filter active; pick one with `filter --kind` first");
        }
        bail!(
            "unknown segment '{segment}' for {} on {}",
            session.selected_filter(),
            session.selected_crop()
        );
    }
    println!(
        "Filter: {} [{}], {:.2} ha",
        session.selected_filter(),
        session.selected_sub_filters().join(", "),
        session.effective_hectares()
    );
    Ok(())
}

/// Restore baseline costs for the displayed crop, or the whole sheet.
pub fn run_reset(session: &mut OperationsSession, all: bool) -> anyhow::Result<()> {
    if !session.reset_template(all) {
        println!(
            "'{}' is read-only; save it as a new template first.",
            session.working_template().name
        );
        return Ok(());
    }
    if all {
        println!("Restored baseline costs for every crop (unsaved).");
    } else {
        println!(
            "Restored baseline costs for {} (unsaved).",
            session.selected_crop()
        );
    }
    Ok(())
}

/// Roll back the unsaved edits of the displayed crop.
pub fn run_reset_view(session: &mut OperationsSession) -> anyhow::Result<()> {
    let crop = session.selected_crop().to_string();
    let cells = session
        .change_log()
        .iter()
        .filter(|row| row.crop == crop)
        .count();
    if session.reset_current_view() {
        println!("Rolled back {cells} cost cells for {crop}.");
    } else {
        println!("No unsaved edits for {crop}.");
    }
    Ok(())
}
