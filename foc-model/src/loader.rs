//! Builds the shipped default cost sheet from the embedded fixture CSVs and
//! wraps it in the two default templates every fresh install starts with.

use crate::crop::{Crop, FilterKind, Segment, ALL_CROPS};
use crate::operation::{CategoryId, CropAllocation, Operation};
use crate::sheet::OperationsData;
use crate::template::{FilterCombination, Template};
use anyhow::{anyhow, Result};
use chrono::Utc;
use csv::ReaderBuilder;
use std::collections::BTreeMap;

/// Embedded CSV of crops and their drilled areas.
pub static CROPS_CSV: &str = include_str!("../fixtures/crops.csv");

/// Embedded CSV of end-use market segments per crop.
pub static SEGMENTS_CSV: &str = include_str!("../fixtures/end_use_segments.csv");

/// Embedded CSV of per-hectare costs for every sub-operation and crop.
pub static COSTS_CSV: &str = include_str!("../fixtures/operation_costs.csv");

/// Id of the read-only baseline template.
pub const STANDARD_TEMPLATE_ID: &str = "tpl-standard";

/// Id of the editable working-copy template.
pub const WORKING_TEMPLATE_ID: &str = "tpl-working";

/// Parses the fixture CSVs into a fully consistent default sheet: leaf costs
/// from the cost CSV, category rows as the sum of their leaves, display
/// fields and totals synced to the "All crops" view.
pub fn default_operations_data() -> Result<OperationsData> {
    let mut crops = parse_crops(CROPS_CSV)?;
    attach_segments(SEGMENTS_CSV, &mut crops)?;
    let mut leaves = parse_costs(COSTS_CSV, &crops)?;

    let cultivation = roll_up(CategoryId::Cultivation, &mut leaves, &crops)?;
    let drilling = roll_up(CategoryId::Drilling, &mut leaves, &crops)?;
    let application = roll_up(CategoryId::Application, &mut leaves, &crops)?;
    let harvesting = roll_up(CategoryId::Harvesting, &mut leaves, &crops)?;
    let other = roll_up(CategoryId::Other, &mut leaves, &crops)?;

    let mut sheet = OperationsData {
        cultivation,
        drilling,
        application,
        harvesting,
        other,
        crops,
        total_average_cost: 0.0,
        total_cost: 0.0,
    };
    sync_totals_to_all_crops(&mut sheet);

    log::info!(
        "[FOC Debug] loader: default sheet with {} crops, total cost {:.2}",
        sheet.crops.len(),
        sheet.total_cost
    );
    Ok(sheet)
}

/// The two templates a fresh install ships with: a read-only baseline and an
/// editable working copy of the same sheet. Both are flagged default and so
/// can never be deleted.
pub fn default_templates() -> Result<Vec<Template>> {
    let data = default_operations_data()?;
    let now = Utc::now();

    let standard_view =
        FilterCombination::new("fc-standard-all", ALL_CROPS, FilterKind::None, Vec::new());
    let working_view =
        FilterCombination::new("fc-working-all", ALL_CROPS, FilterKind::None, Vec::new());

    let standard = Template {
        id: STANDARD_TEMPLATE_ID.to_string(),
        name: "Standard costs".to_string(),
        is_default: true,
        is_editable: false,
        data: data.clone(),
        filter_combinations: vec![standard_view],
        active_filter_combination_id: Some("fc-standard-all".to_string()),
        assignments: Vec::new(),
        active_assignment_id: None,
        created_at: now,
        updated_at: now,
    };
    let working = Template {
        id: WORKING_TEMPLATE_ID.to_string(),
        name: "Working copy".to_string(),
        is_default: true,
        is_editable: true,
        data,
        filter_combinations: vec![working_view],
        active_filter_combination_id: Some("fc-working-all".to_string()),
        assignments: Vec::new(),
        active_assignment_id: None,
        created_at: now,
        updated_at: now,
    };
    Ok(vec![standard, working])
}

fn parse_crops(csv_object: &str) -> Result<BTreeMap<String, Crop>> {
    let mut crops = BTreeMap::new();
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_reader(csv_object.as_bytes());
    for row in rdr.records() {
        let rho = row?;
        let name = rho
            .get(0)
            .ok_or_else(|| anyhow!("crop row missing name column"))?
            .to_string();
        let hectares: f64 = rho
            .get(1)
            .ok_or_else(|| anyhow!("crop row missing hectares column"))?
            .parse()?;
        crops.insert(name, Crop::new(hectares));
    }
    if !crops.contains_key(ALL_CROPS) {
        return Err(anyhow!("crop fixture is missing the \"{ALL_CROPS}\" row"));
    }
    Ok(crops)
}

fn attach_segments(csv_object: &str, crops: &mut BTreeMap<String, Crop>) -> Result<()> {
    let mut skipped = 0usize;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_reader(csv_object.as_bytes());
    for row in rdr.records() {
        let rho = row?;
        let crop_name = rho.get(0).unwrap_or_default();
        let segment = rho.get(1).unwrap_or_default();
        let hectares: f64 = rho.get(2).unwrap_or("0").parse()?;
        match crops.get_mut(crop_name) {
            Some(crop) => {
                crop.end_use_market
                    .insert(segment.to_string(), Segment { hectares });
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("[FOC Debug] loader: Skipped {skipped} segment rows for unknown crops");
    }
    Ok(())
}

/// Reads the leaf cost rows, keeping sub-operations in first-appearance
/// order within each category.
fn parse_costs(
    csv_object: &str,
    crops: &BTreeMap<String, Crop>,
) -> Result<BTreeMap<CategoryId, Vec<Operation>>> {
    let mut leaves: BTreeMap<CategoryId, Vec<Operation>> = BTreeMap::new();
    let mut skipped = 0usize;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_reader(csv_object.as_bytes());
    for row in rdr.records() {
        let rho = row?;
        let category: CategoryId = match rho.get(0).unwrap_or_default().parse() {
            Ok(id) => id,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let sub_name = rho.get(1).unwrap_or_default().to_string();
        let crop_name = rho.get(2).unwrap_or_default();
        let cost_per_ha: f64 = rho.get(3).unwrap_or("0").parse()?;

        let Some(hectares) = crops.get(crop_name).map(|c| c.hectares) else {
            skipped += 1;
            continue;
        };

        let subs = leaves.entry(category).or_default();
        if !subs.iter().any(|op| op.name == sub_name) {
            subs.push(Operation::new(&sub_name));
        }
        if let Some(sub) = subs.iter_mut().find(|op| op.name == sub_name) {
            sub.crop_data
                .insert(crop_name.to_string(), CropAllocation::new(hectares, cost_per_ha));
        }
    }
    if skipped > 0 {
        log::warn!("[FOC Debug] loader: Skipped {skipped} cost rows with unknown category or crop");
    }
    Ok(leaves)
}

/// Builds the category row for `id` over its parsed leaves: for every crop
/// the category's per-hectare cost is the sum of its sub-operation costs,
/// and display fields start on the "All crops" entry.
fn roll_up(
    id: CategoryId,
    leaves: &mut BTreeMap<CategoryId, Vec<Operation>>,
    crops: &BTreeMap<String, Crop>,
) -> Result<Operation> {
    let mut subs = leaves
        .remove(&id)
        .ok_or_else(|| anyhow!("cost fixture has no rows for category {id}"))?;

    let mut category = Operation::new(id.display_name());
    for (crop_name, crop) in crops {
        let cost: f64 = subs.iter().map(|sub| sub.cost_per_ha_for(crop_name)).sum();
        category
            .crop_data
            .insert(crop_name.clone(), CropAllocation::new(crop.hectares, cost));
    }
    for sub in &mut subs {
        if let Some(alloc) = sub.allocation(ALL_CROPS).copied() {
            sub.cost_per_ha = alloc.cost_per_ha;
            sub.total_cost = alloc.total_cost;
        }
    }
    if let Some(alloc) = category.allocation(ALL_CROPS).copied() {
        category.cost_per_ha = alloc.cost_per_ha;
        category.total_cost = alloc.total_cost;
    }
    category.sub_operations = subs;
    Ok(category)
}

/// Sheet totals for the default "All crops" view: total cost is priced crop
/// by crop so it reflects actual farm spend, and the average is that spend
/// over the farm's real area.
fn sync_totals_to_all_crops(sheet: &mut OperationsData) {
    let mut farm_spend = 0.0;
    let mut farm_area = 0.0;
    for (crop_name, crop) in &sheet.crops {
        if crop_name == ALL_CROPS {
            continue;
        }
        let rate: f64 = sheet
            .categories()
            .iter()
            .map(|(_, op)| op.cost_per_ha_for(crop_name))
            .sum();
        farm_spend += rate * crop.hectares;
        farm_area += crop.hectares;
    }
    sheet.total_cost = farm_spend;
    sheet.total_average_cost = if farm_area > 0.0 {
        farm_spend / farm_area
    } else {
        0.0
    };
}
