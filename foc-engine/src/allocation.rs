//! Cost edits and the recompute pass that keeps the sheet's denormalised
//! figures consistent after them.
//!
//! Crop columns are independent: an edit under one crop never moves another
//! crop's figures, and the "All crops" column is itself just a column. The
//! sheet-level totals in the "All crops" view are derived from the real
//! crops' entries, not from that column.

use foc_model::crop::ALL_CROPS;
use foc_model::operation::{CategoryId, Operation};
use foc_model::sheet::OperationsData;

/// Sets a category's per-hectare cost for one crop, splits the value evenly
/// across its sub-operations and recomputes the sheet totals. A category
/// without sub-operations takes the value on its own row alone.
pub fn set_category_cost(sheet: &mut OperationsData, id: CategoryId, crop: &str, value: f64) {
    let hectares = fallback_hectares(sheet, crop);
    let category = sheet.category_mut(id);

    let count = category.sub_operations.len();
    if count > 0 {
        let share = value / count as f64;
        for sub in &mut category.sub_operations {
            let alloc = sub.ensure_allocation(crop, hectares);
            alloc.cost_per_ha = share;
            alloc.total_cost = share * alloc.hectares;
        }
    }

    let alloc = category.ensure_allocation(crop, hectares);
    alloc.cost_per_ha = value;
    alloc.total_cost = value * alloc.hectares;
    log::debug!("[FOC Debug] allocation: {id} for {crop} set to {value:.2}/ha across {count} subs");

    recompute_sheet_totals(sheet, crop);
}

/// Sets one sub-operation's per-hectare cost for a crop, re-derives the
/// category row as the sum of its sub-operations and recomputes the sheet
/// totals. Returns false when the sub-operation index is out of range.
pub fn set_sub_operation_cost(
    sheet: &mut OperationsData,
    id: CategoryId,
    sub_index: usize,
    crop: &str,
    value: f64,
) -> bool {
    let hectares = fallback_hectares(sheet, crop);
    let category = sheet.category_mut(id);
    let Some(sub) = category.sub_operations.get_mut(sub_index) else {
        return false;
    };

    let alloc = sub.ensure_allocation(crop, hectares);
    alloc.cost_per_ha = value;
    alloc.total_cost = value * alloc.hectares;

    let rolled: f64 = category
        .sub_operations
        .iter()
        .map(|sub| sub.cost_per_ha_for(crop))
        .sum();
    let alloc = category.ensure_allocation(crop, hectares);
    alloc.cost_per_ha = rolled;
    alloc.total_cost = rolled * alloc.hectares;

    recompute_sheet_totals(sheet, crop);
    true
}

/// Writes one crop's effective area into every row of the sheet, scaling the
/// stored totals to the new area, then recomputes the sheet totals. Rates
/// are left untouched and other crops' entries are not visited.
pub fn apply_effective_hectares(sheet: &mut OperationsData, crop: &str, hectares: f64) {
    for (_, category) in sheet.categories_mut() {
        for sub in &mut category.sub_operations {
            let alloc = sub.ensure_allocation(crop, hectares);
            alloc.hectares = hectares;
            alloc.total_cost = alloc.cost_per_ha * hectares;
        }
        let alloc = category.ensure_allocation(crop, hectares);
        alloc.hectares = hectares;
        alloc.total_cost = alloc.cost_per_ha * hectares;
    }
    recompute_sheet_totals(sheet, crop);
}

/// Syncs every row's displayed figures to `active_crop` and re-derives the
/// sheet totals.
///
/// For a single crop the totals row sums that crop's category rates and
/// entry totals. The "All crops" view instead prices each real crop over
/// its own entries: total cost is the farm-wide spend and the average is
/// that spend over the farm's real area, so the figures reflect what the
/// farm pays rather than the aggregate column.
pub fn recompute_sheet_totals(sheet: &mut OperationsData, active_crop: &str) {
    for (_, category) in sheet.categories_mut() {
        for sub in &mut category.sub_operations {
            sync_display(sub, active_crop);
        }
        sync_display(category, active_crop);
    }

    if active_crop == ALL_CROPS {
        let mut farm_spend = 0.0;
        let mut farm_area = 0.0;
        for (crop_name, crop) in &sheet.crops {
            if crop_name == ALL_CROPS {
                continue;
            }
            farm_spend += sheet
                .categories()
                .iter()
                .map(|(_, op)| op.allocation(crop_name).map(|a| a.total_cost).unwrap_or(0.0))
                .sum::<f64>();
            farm_area += crop.hectares;
        }
        sheet.total_cost = farm_spend;
        sheet.total_average_cost = if farm_area > 0.0 {
            farm_spend / farm_area
        } else {
            0.0
        };
    } else {
        sheet.total_average_cost = sheet
            .categories()
            .iter()
            .map(|(_, op)| op.cost_per_ha_for(active_crop))
            .sum();
        sheet.total_cost = sheet
            .categories()
            .iter()
            .map(|(_, op)| op.allocation(active_crop).map(|a| a.total_cost).unwrap_or(0.0))
            .sum();
    }
}

/// Overwrites one crop's entries in `dst` with the entries `src` holds for
/// it, matching sub-operations by name. Rows `src` does not cost for the
/// crop lose their entry. Used to reset a single crop back to a source
/// sheet; the caller re-applies the view's hectare basis afterwards.
pub fn copy_crop_entries(dst: &mut OperationsData, src: &OperationsData, crop: &str) {
    for id in CategoryId::ALL {
        let source = src.category(id);
        let target = dst.category_mut(id);

        for sub in &mut target.sub_operations {
            let from = source
                .sub_operations
                .iter()
                .find(|candidate| candidate.name == sub.name)
                .and_then(|candidate| candidate.allocation(crop).copied());
            match from {
                Some(alloc) => {
                    sub.crop_data.insert(crop.to_string(), alloc);
                }
                None => {
                    sub.crop_data.remove(crop);
                }
            }
        }
        match source.allocation(crop).copied() {
            Some(alloc) => {
                target.crop_data.insert(crop.to_string(), alloc);
            }
            None => {
                target.crop_data.remove(crop);
            }
        }
    }
}

/// Restores a previously recorded per-hectare rate, used when a crop's
/// edits are rolled back. The entry addresses either a category row or one
/// of its sub-operations; the caller recomputes totals after the batch.
pub fn restore_rate(
    sheet: &mut OperationsData,
    id: CategoryId,
    sub_index: Option<usize>,
    crop: &str,
    rate: f64,
) {
    let hectares = fallback_hectares(sheet, crop);
    let category = sheet.category_mut(id);
    let op = match sub_index {
        Some(index) => match category.sub_operations.get_mut(index) {
            Some(sub) => sub,
            None => return,
        },
        None => category,
    };
    let alloc = op.ensure_allocation(crop, hectares);
    alloc.cost_per_ha = rate;
    alloc.total_cost = rate * alloc.hectares;
}

fn sync_display(op: &mut Operation, crop: &str) {
    match op.allocation(crop).copied() {
        Some(alloc) => {
            op.cost_per_ha = alloc.cost_per_ha;
            op.total_cost = alloc.total_cost;
        }
        None => {
            op.cost_per_ha = 0.0;
            op.total_cost = 0.0;
        }
    }
}

/// Area already stored against `crop` in the sheet, checking category rows
/// first and falling back to the farm's crop table. Used to size entries
/// that have never been costed.
fn fallback_hectares(sheet: &OperationsData, crop: &str) -> f64 {
    for (_, category) in sheet.categories() {
        if let Some(alloc) = category.allocation(crop) {
            return alloc.hectares;
        }
    }
    sheet.crop_hectares(crop).unwrap_or(0.0)
}
