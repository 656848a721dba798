//! In-memory log of which cost cells have moved since the sheet was last
//! saved, selected or reset. Only the first edit of a cell is kept so a
//! reset can restore the pre-session value in one step.

use crate::allocation;
use chrono::{DateTime, Utc};
use foc_model::operation::CategoryId;
use foc_model::sheet::OperationsData;

/// One edited cost cell: a category row or one of its sub-operations,
/// under one crop, with the rate it held before the first edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEntry {
    pub crop: String,
    pub category: CategoryId,
    pub sub_index: Option<usize>,
    pub previous_cost_per_ha: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    entries: Vec<ChangeEntry>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        ChangeTracker::default()
    }

    /// Records the pre-edit rate of a cell unless that cell already has an
    /// entry. Later edits of the same cell keep the original rate.
    pub fn record_if_first(
        &mut self,
        crop: &str,
        category: CategoryId,
        sub_index: Option<usize>,
        previous_cost_per_ha: f64,
    ) {
        if self.is_recorded(crop, category, sub_index) {
            return;
        }
        self.entries.push(ChangeEntry {
            crop: crop.to_string(),
            category,
            sub_index,
            previous_cost_per_ha,
            recorded_at: Utc::now(),
        });
    }

    pub fn is_recorded(&self, crop: &str, category: CategoryId, sub_index: Option<usize>) -> bool {
        self.entries
            .iter()
            .any(|e| e.crop == crop && e.category == category && e.sub_index == sub_index)
    }

    pub fn has_changes_for(&self, crop: &str) -> bool {
        self.entries.iter().any(|e| e.crop == crop)
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    /// Removes and returns every entry recorded under `crop`, leaving other
    /// crops' entries in place.
    pub fn take_for_crop(&mut self, crop: &str) -> Vec<ChangeEntry> {
        let (taken, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.crop == crop);
        self.entries = kept;
        taken
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rolls one crop's tracked edits back to their pre-edit rates and drops
/// exactly those log entries. Entries recorded under other crops are left
/// for their own reset. Returns false, without touching the sheet, when the
/// crop has no tracked edits, so calling it twice in a row is a no-op.
pub fn reset_crop(sheet: &mut OperationsData, tracker: &mut ChangeTracker, crop: &str) -> bool {
    let entries = tracker.take_for_crop(crop);
    if entries.is_empty() {
        return false;
    }
    let count = entries.len();
    for entry in &entries {
        allocation::restore_rate(sheet, entry.category, entry.sub_index, crop, entry.previous_cost_per_ha);
    }
    allocation::recompute_sheet_totals(sheet, crop);
    log::info!("[FOC Debug] tracker: reset {count} cells for {crop}");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_edit_of_a_cell_is_kept() {
        let mut tracker = ChangeTracker::new();
        tracker.record_if_first("Barley", CategoryId::Drilling, Some(1), 36.0);
        tracker.record_if_first("Barley", CategoryId::Drilling, Some(1), 99.0);

        assert_eq!(tracker.len(), 1);
        assert!((tracker.entries()[0].previous_cost_per_ha - 36.0).abs() < f64::EPSILON);
    }

    #[test]
    fn the_same_cell_under_another_crop_is_a_separate_entry() {
        let mut tracker = ChangeTracker::new();
        tracker.record_if_first("Barley", CategoryId::Drilling, Some(1), 36.0);
        tracker.record_if_first("Wheat (Winter)", CategoryId::Drilling, Some(1), 40.0);
        tracker.record_if_first("Barley", CategoryId::Drilling, None, 105.5);

        assert_eq!(tracker.len(), 3);
        assert!(tracker.is_recorded("Barley", CategoryId::Drilling, None));
        assert!(!tracker.is_recorded("Barley", CategoryId::Harvesting, None));
    }

    #[test]
    fn taking_a_crop_leaves_other_crops_entries() {
        let mut tracker = ChangeTracker::new();
        tracker.record_if_first("Barley", CategoryId::Drilling, Some(1), 36.0);
        tracker.record_if_first("Barley", CategoryId::Drilling, None, 105.5);
        tracker.record_if_first("Wheat (Winter)", CategoryId::Other, None, 48.0);

        let taken = tracker.take_for_crop("Barley");
        assert_eq!(taken.len(), 2);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.has_changes_for("Wheat (Winter)"));
        assert!(!tracker.has_changes_for("Barley"));
    }

    #[test]
    fn resetting_a_crop_restores_rates_and_is_then_a_no_op() {
        let mut sheet = foc_model::loader::default_operations_data().unwrap();
        let mut tracker = ChangeTracker::new();

        tracker.record_if_first("Barley", CategoryId::Drilling, Some(1), 36.0);
        tracker.record_if_first("Barley", CategoryId::Drilling, None, 105.5);
        allocation::set_sub_operation_cost(&mut sheet, CategoryId::Drilling, 1, "Barley", 99.0);

        assert!(reset_crop(&mut sheet, &mut tracker, "Barley"));
        assert!((sheet.drilling.cost_per_ha_for("Barley") - 105.5).abs() < 0.01);
        assert!((sheet.drilling.sub_operations[1].cost_per_ha_for("Barley") - 36.0).abs() < 0.01);
        assert!(tracker.is_empty());

        // Nothing left to roll back.
        assert!(!reset_crop(&mut sheet, &mut tracker, "Barley"));
    }
}
