//! The session a frontend drives: one selected template, a live working
//! copy of its sheet, the current view selection and the change log.
//!
//! Mutations follow the dashboard's permission rules: cost edits, resets
//! and assignment changes are no-ops on read-only templates, missing ids
//! are no-ops everywhere, and only storage failures surface as errors.
//! Committing mutations write the whole template list back to the
//! key-value store after the in-memory change succeeds.

use crate::models::{CategoryView, ChangeLogRow, SheetRow, SheetView, TemplateSummary};
use crate::persist::{self, KeyValueStore};
use crate::store::TemplateStore;
use anyhow::{anyhow, Result};
use chrono::Utc;
use foc_engine::allocation;
use foc_engine::filters;
use foc_engine::tracker::{self, ChangeTracker};
use foc_model::crop::{FilterKind, ALL_CROPS};
use foc_model::loader;
use foc_model::operation::CategoryId;
use foc_model::template::{EntityAssignment, EntityKind, FilterCombination, Template};
use foc_utils::ids;

pub struct OperationsSession {
    storage: Box<dyn KeyValueStore>,
    templates: TemplateStore,
    selected_id: String,
    working: Template,
    selected_crop: String,
    selected_filter: FilterKind,
    selected_sub_filters: Vec<String>,
    tracker: ChangeTracker,
}

impl OperationsSession {
    /// Loads the template list from the store, seeding and persisting the
    /// two shipped defaults on first run (or when the stored list is
    /// unreadable), then restores the last-used template, falling back to
    /// the default one.
    pub fn open(mut storage: Box<dyn KeyValueStore>) -> Result<Self> {
        let templates = match persist::read_templates(storage.as_ref())? {
            Some(list) => list,
            None => {
                let defaults = loader::default_templates()?;
                persist::write_templates(storage.as_mut(), &defaults)?;
                log::info!("[FOC Debug] session: seeded {} default templates", defaults.len());
                defaults
            }
        };
        let templates = TemplateStore::new(templates);

        let selected_id = match persist::read_last_used(storage.as_ref())? {
            Some(id) if templates.contains(&id) => id,
            _ => templates
                .default_template()
                .map(|t| t.id.clone())
                .ok_or_else(|| anyhow!("no templates available"))?,
        };
        let working = templates
            .get(&selected_id)
            .cloned()
            .ok_or_else(|| anyhow!("selected template {selected_id} not found"))?;

        let mut session = OperationsSession {
            storage,
            templates,
            selected_id,
            working,
            selected_crop: ALL_CROPS.to_string(),
            selected_filter: FilterKind::None,
            selected_sub_filters: Vec::new(),
            tracker: ChangeTracker::new(),
        };
        session.adopt_working_view();
        log::info!(
            "[FOC Debug] session: opened with template {} over {} templates",
            session.selected_id,
            session.templates.len()
        );
        Ok(session)
    }

    // ───────────────────── Accessors ─────────────────────

    pub fn selected_template_id(&self) -> &str {
        &self.selected_id
    }

    pub fn selected_crop(&self) -> &str {
        &self.selected_crop
    }

    pub fn selected_filter(&self) -> FilterKind {
        self.selected_filter
    }

    pub fn selected_sub_filters(&self) -> &[String] {
        &self.selected_sub_filters
    }

    pub fn working_template(&self) -> &Template {
        &self.working
    }

    pub fn is_editable(&self) -> bool {
        self.working.is_editable
    }

    pub fn effective_hectares(&self) -> f64 {
        filters::effective_hectares(
            &self.working.data,
            &self.selected_crop,
            self.selected_filter,
            &self.selected_sub_filters,
        )
    }

    /// Filter kinds the displayed crop can actually be sliced by.
    pub fn available_filters(&self) -> Vec<FilterKind> {
        filters::available_filters(&self.working.data, &self.selected_crop)
    }

    // ───────────────────── Cost Edits ─────────────────────

    /// Sets a category's cost for the active crop, recording the pre-edit
    /// rate of the category cell and of every sub-operation cell it
    /// redistributes over. No-op on read-only templates.
    pub fn edit_category_cost(&mut self, category: CategoryId, value: f64) -> bool {
        if !self.working.is_editable {
            log::debug!("[FOC Debug] session: ignoring edit on read-only template");
            return false;
        }
        let crop = self.selected_crop.clone();

        let previous = self.working.data.category(category).cost_per_ha_for(&crop);
        self.tracker.record_if_first(&crop, category, None, previous);
        let sub_count = self.working.data.category(category).sub_operations.len();
        for index in 0..sub_count {
            let previous =
                self.working.data.category(category).sub_operations[index].cost_per_ha_for(&crop);
            self.tracker.record_if_first(&crop, category, Some(index), previous);
        }

        allocation::set_category_cost(&mut self.working.data, category, &crop, value);
        true
    }

    /// Sets one sub-operation's cost for the active crop, recording the
    /// pre-edit rates of that cell and of the parent it rolls up into.
    /// No-op on read-only templates or an out-of-range index.
    pub fn edit_sub_operation_cost(
        &mut self,
        category: CategoryId,
        sub_index: usize,
        value: f64,
    ) -> bool {
        if !self.working.is_editable {
            log::debug!("[FOC Debug] session: ignoring edit on read-only template");
            return false;
        }
        let crop = self.selected_crop.clone();

        let parent = self.working.data.category(category);
        let Some(sub) = parent.sub_operations.get(sub_index) else {
            return false;
        };
        let sub_previous = sub.cost_per_ha_for(&crop);
        let parent_previous = parent.cost_per_ha_for(&crop);
        self.tracker.record_if_first(&crop, category, Some(sub_index), sub_previous);
        self.tracker.record_if_first(&crop, category, None, parent_previous);

        allocation::set_sub_operation_cost(&mut self.working.data, category, sub_index, &crop, value)
    }

    // ───────────────────── View Selection ─────────────────────

    /// Switches the displayed crop. Filters never carry across crops; the
    /// new crop starts unfiltered over its full area.
    pub fn select_crop(&mut self, crop: &str) -> bool {
        if self.working.data.crop(crop).is_none() {
            return false;
        }
        self.selected_crop = crop.to_string();
        self.selected_filter = FilterKind::None;
        self.selected_sub_filters.clear();
        self.refresh_view_basis();
        self.sync_active_combination();
        true
    }

    /// Switches the segmentation filter. The end-use market filter starts
    /// with every segment selected so totals stay non-zero by default.
    pub fn select_filter(&mut self, kind: FilterKind) {
        self.selected_filter = kind;
        self.selected_sub_filters =
            filters::default_sub_filters(&self.working.data, &self.selected_crop, kind);
        self.refresh_view_basis();
        self.sync_active_combination();
    }

    /// Ticks or unticks one segment of the active filter. Unknown segments
    /// (or toggling with no filter selected) are no-ops.
    pub fn toggle_sub_filter(&mut self, segment: &str) -> bool {
        if self.selected_filter == FilterKind::None {
            return false;
        }
        let known = self
            .working
            .data
            .crop(&self.selected_crop)
            .and_then(|c| c.segments(self.selected_filter))
            .map(|segments| segments.contains_key(segment))
            .unwrap_or(false);
        if !known {
            return false;
        }

        match self.selected_sub_filters.iter().position(|s| s == segment) {
            Some(index) => {
                self.selected_sub_filters.remove(index);
            }
            None => {
                self.selected_sub_filters.push(segment.to_string());
                self.selected_sub_filters.sort();
            }
        }
        self.refresh_view_basis();
        self.sync_active_combination();
        true
    }

    // ───────────────────── Filter Combinations ─────────────────────

    /// Displays a saved filter combination and records it as the template's
    /// active one.
    pub fn select_filter_combination(&mut self, id: &str) -> Result<bool> {
        let Some(combination) = self
            .working
            .filter_combinations
            .iter()
            .find(|fc| fc.id == id)
            .cloned()
        else {
            return Ok(false);
        };
        self.working.active_filter_combination_id = Some(combination.id.clone());
        self.selected_crop = combination.selected_crop;
        self.selected_filter = combination.selected_filter;
        self.selected_sub_filters = combination.selected_sub_filters;
        self.refresh_view_basis();
        self.mirror_view_to_store()?;
        Ok(true)
    }

    /// Removes a saved combination. A template keeps at least one; deleting
    /// the active one displays the first remaining combination.
    pub fn delete_filter_combination(&mut self, id: &str) -> Result<bool> {
        if !self.working.is_editable {
            return Ok(false);
        }
        if self.working.filter_combinations.len() <= 1 {
            log::debug!("[FOC Debug] session: refusing to delete the last filter combination");
            return Ok(false);
        }
        let Some(position) = self
            .working
            .filter_combinations
            .iter()
            .position(|fc| fc.id == id)
        else {
            return Ok(false);
        };

        let was_active = self.working.active_filter_combination_id.as_deref() == Some(id);
        self.working.filter_combinations.remove(position);
        if was_active {
            let promoted = self.working.filter_combinations[0].clone();
            self.working.active_filter_combination_id = Some(promoted.id);
            self.selected_crop = promoted.selected_crop;
            self.selected_filter = promoted.selected_filter;
            self.selected_sub_filters = promoted.selected_sub_filters;
            self.refresh_view_basis();
        }
        self.mirror_view_to_store()?;
        Ok(true)
    }

    // ───────────────────── Template Lifecycle ─────────────────────

    /// Makes a template current, restoring the view from its active filter
    /// combination (falling back to the first on a stale id) and dropping
    /// the change log of the abandoned working copy.
    pub fn select_template(&mut self, id: &str) -> Result<bool> {
        let Some(template) = self.templates.get(id) else {
            return Ok(false);
        };
        self.working = template.clone();
        self.selected_id = id.to_string();
        self.tracker.clear();
        self.adopt_working_view();
        persist::write_last_used(self.storage.as_mut(), id)?;
        log::info!("[FOC Debug] session: selected template {id}");
        Ok(true)
    }

    /// Commits the working copy: snapshots the sheet into the template
    /// list, captures the live view as a filter combination (reusing an
    /// exact match), optionally renames, persists, and starts a fresh
    /// change log. No-op on read-only templates.
    pub fn save_template(&mut self, name: Option<&str>) -> Result<bool> {
        if !self.working.is_editable {
            log::debug!("[FOC Debug] session: ignoring save on read-only template");
            return Ok(false);
        }
        if let Some(name) = name {
            self.working.name = name.to_string();
        }
        let combination_id = self.capture_view_combination();
        self.working.active_filter_combination_id = Some(combination_id);
        self.working.touch();

        if !self.templates.replace(self.working.clone()) {
            return Ok(false);
        }
        persist::write_templates(self.storage.as_mut(), self.templates.templates())?;
        persist::write_last_used(self.storage.as_mut(), &self.selected_id)?;
        self.tracker.clear();
        log::info!("[FOC Debug] session: saved template {}", self.selected_id);
        Ok(true)
    }

    /// Clones the working sheet into a brand-new editable template with one
    /// filter combination capturing the live view and one assignment for
    /// the current crop, selects it, and persists.
    pub fn save_template_as_new(&mut self, name: &str) -> Result<String> {
        let now = Utc::now();
        let combination = FilterCombination::new(
            &ids::next_id("fc"),
            &self.selected_crop,
            self.selected_filter,
            self.selected_sub_filters.clone(),
        );
        let assignment = EntityAssignment {
            id: ids::next_id("as"),
            entity_type: EntityKind::Crop,
            entity_id: self.selected_crop.clone(),
            entity_name: self.selected_crop.clone(),
        };
        let template = Template {
            id: ids::next_id("tpl"),
            name: name.to_string(),
            is_default: false,
            is_editable: true,
            data: self.working.data.clone(),
            filter_combinations: vec![combination.clone()],
            active_filter_combination_id: Some(combination.id),
            assignments: vec![assignment.clone()],
            active_assignment_id: Some(assignment.id),
            created_at: now,
            updated_at: now,
        };
        let id = template.id.clone();

        self.templates.insert(template.clone());
        self.selected_id = id.clone();
        self.working = template;
        self.tracker.clear();
        persist::write_templates(self.storage.as_mut(), self.templates.templates())?;
        persist::write_last_used(self.storage.as_mut(), &id)?;
        log::info!("[FOC Debug] session: saved new template {id}");
        Ok(id)
    }

    /// Renames any template, defaults included.
    pub fn rename_template(&mut self, id: &str, name: &str) -> Result<bool> {
        if !self.templates.rename(id, name) {
            return Ok(false);
        }
        if id == self.selected_id {
            self.working.name = name.to_string();
        }
        persist::write_templates(self.storage.as_mut(), self.templates.templates())?;
        Ok(true)
    }

    /// Deletes a template. Defaults are kept; deleting the current template
    /// falls back to the default one.
    pub fn delete_template(&mut self, id: &str) -> Result<bool> {
        let Some(removed) = self.templates.remove(id) else {
            return Ok(false);
        };
        if removed.id == self.selected_id {
            let fallback = self
                .templates
                .default_template()
                .map(|t| t.id.clone())
                .ok_or_else(|| anyhow!("template list exhausted"))?;
            self.working = self
                .templates
                .get(&fallback)
                .cloned()
                .ok_or_else(|| anyhow!("fallback template {fallback} not found"))?;
            self.selected_id = fallback.clone();
            self.tracker.clear();
            self.adopt_working_view();
            persist::write_last_used(self.storage.as_mut(), &fallback)?;
        }
        persist::write_templates(self.storage.as_mut(), self.templates.templates())?;
        log::info!("[FOC Debug] session: deleted template {id}");
        Ok(true)
    }

    // ───────────────────── Resets ─────────────────────

    /// Restores the working copy from the shipped baseline: the whole sheet,
    /// or only the active crop's column. In-memory until saved; no-op on
    /// read-only templates.
    pub fn reset_template(&mut self, reset_all: bool) -> bool {
        if !self.working.is_editable {
            return false;
        }
        let source = match self.templates.default_template() {
            Some(template) => template.data.clone(),
            None => return false,
        };
        if reset_all {
            self.working.data = source;
            self.tracker.clear();
        } else {
            let crop = self.selected_crop.clone();
            allocation::copy_crop_entries(&mut self.working.data, &source, &crop);
            let _ = self.tracker.take_for_crop(&crop);
        }
        self.refresh_view_basis();
        true
    }

    /// Rolls the active crop's tracked edits back to their pre-edit values.
    /// A second call with no edits in between is a no-op.
    pub fn reset_current_view(&mut self) -> bool {
        let crop = self.selected_crop.clone();
        tracker::reset_crop(&mut self.working.data, &mut self.tracker, &crop)
    }

    // ───────────────────── Assignments ─────────────────────

    /// Tags the current template with a crop, variety or field. Display
    /// metadata only; it never gates editing.
    pub fn add_assignment(
        &mut self,
        kind: EntityKind,
        entity_id: &str,
        entity_name: &str,
    ) -> Result<bool> {
        if !self.working.is_editable {
            return Ok(false);
        }
        self.working.assignments.push(EntityAssignment {
            id: ids::next_id("as"),
            entity_type: kind,
            entity_id: entity_id.to_string(),
            entity_name: entity_name.to_string(),
        });
        self.mirror_assignments_to_store()?;
        Ok(true)
    }

    /// Removes an assignment; removing the active one promotes the first
    /// remaining (or clears the active id).
    pub fn delete_assignment(&mut self, id: &str) -> Result<bool> {
        if !self.working.is_editable {
            return Ok(false);
        }
        let Some(position) = self.working.assignments.iter().position(|a| a.id == id) else {
            return Ok(false);
        };
        let was_active = self.working.active_assignment_id.as_deref() == Some(id);
        self.working.assignments.remove(position);
        if was_active {
            self.working.active_assignment_id =
                self.working.assignments.first().map(|a| a.id.clone());
        }
        self.mirror_assignments_to_store()?;
        Ok(true)
    }

    // ───────────────────── Display Views ─────────────────────

    pub fn sheet_view(&self) -> SheetView {
        let data = &self.working.data;
        let categories = data
            .categories()
            .iter()
            .map(|(id, op)| CategoryView {
                id: *id,
                name: op.name.clone(),
                cost_per_ha: op.cost_per_ha,
                total_cost: op.total_cost,
                sub_operations: op
                    .sub_operations
                    .iter()
                    .map(|sub| SheetRow {
                        name: sub.name.clone(),
                        cost_per_ha: sub.cost_per_ha,
                        total_cost: sub.total_cost,
                    })
                    .collect(),
            })
            .collect();

        SheetView {
            template_id: self.working.id.clone(),
            template_name: self.working.name.clone(),
            is_editable: self.working.is_editable,
            crop: self.selected_crop.clone(),
            filter: self.selected_filter,
            sub_filters: self.selected_sub_filters.clone(),
            effective_hectares: self.effective_hectares(),
            categories,
            total_average_cost: data.total_average_cost,
            total_cost: data.total_cost,
        }
    }

    pub fn template_summaries(&self) -> Vec<TemplateSummary> {
        self.templates
            .templates()
            .iter()
            .map(|template| TemplateSummary {
                id: template.id.clone(),
                name: template.name.clone(),
                is_default: template.is_default,
                is_editable: template.is_editable,
                is_selected: template.id == self.selected_id,
                combination_count: template.filter_combinations.len(),
                assignment_count: template.assignments.len(),
                updated_at: template.updated_at,
            })
            .collect()
    }

    pub fn change_log(&self) -> Vec<ChangeLogRow> {
        self.tracker
            .entries()
            .iter()
            .map(|entry| {
                let category = self.working.data.category(entry.category);
                let operation = match entry.sub_index {
                    Some(index) => category
                        .sub_operations
                        .get(index)
                        .map(|sub| sub.name.clone())
                        .unwrap_or_else(|| format!("sub-operation {index}")),
                    None => category.name.clone(),
                };
                ChangeLogRow {
                    crop: entry.crop.clone(),
                    category: entry.category,
                    operation,
                    previous_cost_per_ha: entry.previous_cost_per_ha,
                    recorded_at: entry.recorded_at,
                }
            })
            .collect()
    }

    // ───────────────────── Internals ─────────────────────

    /// Pulls the view selection out of the working template's active filter
    /// combination and normalises the sheet to it.
    fn adopt_working_view(&mut self) {
        let (crop, filter, sub_filters) = match self.working.active_filter_combination() {
            Some(fc) => (
                fc.selected_crop.clone(),
                fc.selected_filter,
                fc.selected_sub_filters.clone(),
            ),
            None => (ALL_CROPS.to_string(), FilterKind::None, Vec::new()),
        };
        self.selected_crop = if self.working.data.crop(&crop).is_some() {
            crop
        } else {
            ALL_CROPS.to_string()
        };
        self.selected_filter = filter;
        self.selected_sub_filters = sub_filters;
        self.refresh_view_basis();
    }

    /// Resolves the live selection to its hectare basis and rewrites the
    /// active crop's entries to it.
    fn refresh_view_basis(&mut self) {
        let hectares = self.effective_hectares();
        let crop = self.selected_crop.clone();
        allocation::apply_effective_hectares(&mut self.working.data, &crop, hectares);
    }

    /// Points the active id at the saved combination matching the live
    /// view, or clears it while the view is unsaved.
    fn sync_active_combination(&mut self) {
        self.working.active_filter_combination_id = self
            .working
            .find_filter_combination(
                &self.selected_crop,
                self.selected_filter,
                &self.selected_sub_filters,
            )
            .map(|fc| fc.id.clone());
    }

    /// The combination capturing the live view: an existing exact match, or
    /// a fresh one appended to the working template.
    fn capture_view_combination(&mut self) -> String {
        if let Some(existing) = self.working.find_filter_combination(
            &self.selected_crop,
            self.selected_filter,
            &self.selected_sub_filters,
        ) {
            return existing.id.clone();
        }
        let combination = FilterCombination::new(
            &ids::next_id("fc"),
            &self.selected_crop,
            self.selected_filter,
            self.selected_sub_filters.clone(),
        );
        let id = combination.id.clone();
        self.working.filter_combinations.push(combination);
        id
    }

    /// Writes the working copy's combinations and active id through to the
    /// stored template, then persists. Sheet data is deliberately left
    /// alone: cost edits commit only via save.
    fn mirror_view_to_store(&mut self) -> Result<()> {
        if let Some(stored) = self.templates.get_mut(&self.selected_id) {
            stored.filter_combinations = self.working.filter_combinations.clone();
            stored.active_filter_combination_id = self.working.active_filter_combination_id.clone();
            stored.touch();
            self.working.updated_at = stored.updated_at;
        }
        persist::write_templates(self.storage.as_mut(), self.templates.templates())
    }

    /// Same write-through for assignments.
    fn mirror_assignments_to_store(&mut self) -> Result<()> {
        if let Some(stored) = self.templates.get_mut(&self.selected_id) {
            stored.assignments = self.working.assignments.clone();
            stored.active_assignment_id = self.working.active_assignment_id.clone();
            stored.touch();
            self.working.updated_at = stored.updated_at;
        }
        persist::write_templates(self.storage.as_mut(), self.templates.templates())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{MemoryStore, LAST_USED_KEY, TEMPLATES_KEY};
    use std::cell::Cell;
    use std::rc::Rc;

    fn open_session() -> (OperationsSession, MemoryStore) {
        let store = MemoryStore::new();
        let session = OperationsSession::open(Box::new(store.clone())).unwrap();
        (session, store)
    }

    /// Backend whose writes can be made to fail mid-session.
    #[derive(Clone)]
    struct FailingStore {
        inner: MemoryStore,
        fail_writes: Rc<Cell<bool>>,
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.get() {
                anyhow::bail!("storage quota exceeded");
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn first_open_seeds_and_persists_the_defaults() {
        let (session, raw) = open_session();
        assert_eq!(session.selected_template_id(), loader::STANDARD_TEMPLATE_ID);
        assert_eq!(session.selected_crop(), ALL_CROPS);
        assert!(raw.get(TEMPLATES_KEY).unwrap().is_some());

        // A second session over the same backend sees the same list.
        let again = OperationsSession::open(Box::new(raw.clone())).unwrap();
        assert_eq!(again.template_summaries().len(), 2);
    }

    #[test]
    fn unreadable_persisted_state_falls_back_to_defaults() {
        let mut raw = MemoryStore::new();
        raw.set(TEMPLATES_KEY, "{broken").unwrap();
        raw.set(LAST_USED_KEY, "\"tpl-ghost\"").unwrap();

        let session = OperationsSession::open(Box::new(raw)).unwrap();
        assert_eq!(session.template_summaries().len(), 2);
        assert_eq!(session.selected_template_id(), loader::STANDARD_TEMPLATE_ID);
    }

    #[test]
    fn last_used_template_is_restored_across_opens() {
        let (mut session, raw) = open_session();
        assert!(session.select_template(loader::WORKING_TEMPLATE_ID).unwrap());
        drop(session);

        let session = OperationsSession::open(Box::new(raw)).unwrap();
        assert_eq!(session.selected_template_id(), loader::WORKING_TEMPLATE_ID);
    }

    #[test]
    fn read_only_templates_ignore_edits_and_resets() {
        let (mut session, _) = open_session();
        assert!(!session.is_editable());
        assert!(!session.edit_category_cost(CategoryId::Cultivation, 400.0));
        assert!(!session.edit_sub_operation_cost(CategoryId::Cultivation, 0, 99.0));
        assert!(!session.reset_template(true));
        assert!(!session.save_template(None).unwrap());
        assert!(session.change_log().is_empty());
    }

    #[test]
    fn category_edit_scenario_matches_the_sample_sheet() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        assert!(session.edit_category_cost(CategoryId::Cultivation, 400.0));

        let view = session.sheet_view();
        let cultivation = &view.categories[0];
        assert!((cultivation.cost_per_ha - 400.0).abs() < 0.01);
        assert!((cultivation.total_cost - 120_000.0).abs() < 0.01);
        for sub in &cultivation.sub_operations {
            assert!((sub.cost_per_ha - 50.0).abs() < 0.01);
        }
        // Category cell plus its eight sub-operations in the log.
        assert_eq!(session.change_log().len(), 9);
    }

    #[test]
    fn crop_switch_displays_the_other_column_untouched() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        session.select_crop("Wheat (Winter)");

        assert!(session.select_crop("Barley"));
        let view = session.sheet_view();
        assert_eq!(view.crop, "Barley");
        assert_eq!(view.filter, FilterKind::None);
        assert!(view.sub_filters.is_empty());
        assert!((view.effective_hectares - 80.0).abs() < 0.01);
        assert!((view.categories[0].cost_per_ha - 356.0).abs() < 0.01);
        assert!((view.total_average_cost - 759.0).abs() < 0.01);
        assert!((view.total_cost - 60_720.0).abs() < 0.01);

        assert!(!session.select_crop("Maize"));
    }

    #[test]
    fn end_use_filter_starts_full_and_narrows_by_toggle() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        session.select_crop("Wheat (Winter)");
        session.select_filter(FilterKind::EndUseMarket);

        assert_eq!(session.selected_sub_filters(), ["Feed", "Milling"]);
        assert!((session.effective_hectares() - 150.0).abs() < 0.01);

        assert!(session.toggle_sub_filter("Feed"));
        assert_eq!(session.selected_sub_filters(), ["Milling"]);
        assert!((session.effective_hectares() - 90.0).abs() < 0.01);
        let view = session.sheet_view();
        assert!((view.total_cost - 77_985.0).abs() < 0.01);

        assert!(!session.toggle_sub_filter("Biscuit"));
        session.select_filter(FilterKind::None);
        assert!(!session.toggle_sub_filter("Milling"));
    }

    #[test]
    fn save_then_reselect_restores_data_and_view() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        session.select_crop("Wheat (Winter)");
        session.select_filter(FilterKind::EndUseMarket);
        session.toggle_sub_filter("Feed");
        session.edit_sub_operation_cost(CategoryId::Cultivation, 0, 150.0);

        assert!(session.save_template(None).unwrap());
        let saved_data = session.working_template().data.clone();
        assert!(session.change_log().is_empty());

        session.select_template(loader::STANDARD_TEMPLATE_ID).unwrap();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();

        assert_eq!(session.selected_crop(), "Wheat (Winter)");
        assert_eq!(session.selected_filter(), FilterKind::EndUseMarket);
        assert_eq!(session.selected_sub_filters(), ["Milling"]);
        assert_eq!(session.working_template().data, saved_data);
        assert!(
            (session.working_template().data.cultivation.cost_per_ha_for("Wheat (Winter)")
                - 437.50)
                .abs()
                < 0.01
        );
    }

    #[test]
    fn saving_the_same_view_twice_reuses_the_combination() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();

        // The live view is the seeded all-crops combination.
        assert!(session.save_template(None).unwrap());
        assert_eq!(session.working_template().filter_combinations.len(), 1);

        session.select_crop("Barley");
        assert!(session.save_template(None).unwrap());
        assert_eq!(session.working_template().filter_combinations.len(), 2);

        assert!(session.save_template(Some("Working copy")).unwrap());
        assert_eq!(session.working_template().filter_combinations.len(), 2);
    }

    #[test]
    fn save_as_new_captures_view_and_tags_the_crop() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        session.select_crop("Barley");
        session.select_filter(FilterKind::EndUseMarket);
        session.toggle_sub_filter("Feed");

        let id = session.save_template_as_new("Malting plan").unwrap();
        assert_eq!(session.selected_template_id(), id);

        let template = session.working_template();
        assert!(!template.is_default);
        assert!(template.is_editable);
        assert_eq!(template.name, "Malting plan");
        assert_eq!(template.filter_combinations.len(), 1);
        let combination = &template.filter_combinations[0];
        assert_eq!(combination.selected_crop, "Barley");
        assert_eq!(combination.selected_sub_filters, ["Malting"]);
        assert_eq!(template.assignments.len(), 1);
        assert_eq!(template.assignments[0].entity_type, EntityKind::Crop);
        assert_eq!(template.assignments[0].entity_name, "Barley");
        assert_eq!(
            template.active_assignment_id.as_deref(),
            Some(template.assignments[0].id.as_str())
        );
    }

    #[test]
    fn deleting_default_templates_is_refused() {
        let (mut session, _) = open_session();
        assert!(!session.delete_template(loader::STANDARD_TEMPLATE_ID).unwrap());
        assert!(!session.delete_template(loader::WORKING_TEMPLATE_ID).unwrap());
        assert_eq!(session.template_summaries().len(), 2);
    }

    #[test]
    fn deleting_the_current_template_falls_back_to_the_default() {
        let (mut session, raw) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        let id = session.save_template_as_new("Disposable").unwrap();

        assert!(session.delete_template(&id).unwrap());
        assert_eq!(session.selected_template_id(), loader::STANDARD_TEMPLATE_ID);
        assert_eq!(session.template_summaries().len(), 2);
        assert_eq!(
            raw.get(LAST_USED_KEY).unwrap().as_deref(),
            Some(format!("\"{}\"", loader::STANDARD_TEMPLATE_ID).as_str())
        );
        assert!(!session.delete_template(&id).unwrap());
    }

    #[test]
    fn renaming_defaults_is_allowed_and_persists() {
        let (mut session, raw) = open_session();
        assert!(session.rename_template(loader::STANDARD_TEMPLATE_ID, "Baseline").unwrap());
        assert_eq!(session.working_template().name, "Baseline");

        let reopened = OperationsSession::open(Box::new(raw)).unwrap();
        let summaries = reopened.template_summaries();
        assert!(summaries.iter().any(|s| s.name == "Baseline"));
        assert!(!session.rename_template("tpl-ghost", "Nothing").unwrap());
    }

    #[test]
    fn deleting_the_last_filter_combination_is_refused() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        let only = session.working_template().filter_combinations[0].id.clone();

        assert!(!session.delete_filter_combination(&only).unwrap());
        assert_eq!(session.working_template().filter_combinations.len(), 1);
    }

    #[test]
    fn deleting_the_active_combination_promotes_the_first_remaining() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        session.select_crop("Barley");
        session.save_template(None).unwrap();
        let barley_fc = session.working_template().active_filter_combination_id.clone().unwrap();
        assert_eq!(session.working_template().filter_combinations.len(), 2);

        assert!(session.delete_filter_combination(&barley_fc).unwrap());
        assert_eq!(session.working_template().filter_combinations.len(), 1);
        // The surviving seeded combination takes over the view.
        assert_eq!(session.selected_crop(), ALL_CROPS);
        assert_eq!(session.selected_filter(), FilterKind::None);
    }

    #[test]
    fn reset_current_view_is_scoped_and_idempotent() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();

        session.select_crop("Wheat (Winter)");
        session.edit_sub_operation_cost(CategoryId::Cultivation, 0, 200.0);
        session.select_crop("Barley");
        session.edit_category_cost(CategoryId::Other, 60.0);

        assert!(session.reset_current_view());
        let data = &session.working_template().data;
        assert!((data.other.cost_per_ha_for("Barley") - 40.0).abs() < 0.01);
        // The wheat edit survives a barley reset.
        assert!((data.cultivation.sub_operations[0].cost_per_ha_for("Wheat (Winter)") - 200.0).abs() < 0.01);

        assert!(!session.reset_current_view());
        session.select_crop("Wheat (Winter)");
        assert!(session.reset_current_view());
        let data = &session.working_template().data;
        assert!((data.cultivation.sub_operations[0].cost_per_ha_for("Wheat (Winter)") - 115.0).abs() < 0.01);
    }

    #[test]
    fn reset_template_restores_the_baseline_sheet() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        session.select_crop("Barley");
        session.edit_category_cost(CategoryId::Drilling, 500.0);
        session.select_crop("Wheat (Winter)");
        session.edit_category_cost(CategoryId::Drilling, 600.0);

        // Crop-scoped reset touches only the active column.
        assert!(session.reset_template(false));
        let data = &session.working_template().data;
        assert!((data.drilling.cost_per_ha_for("Wheat (Winter)") - 118.0).abs() < 0.01);
        assert!((data.drilling.cost_per_ha_for("Barley") - 500.0).abs() < 0.01);

        // Full reset restores everything.
        assert!(session.reset_template(true));
        let data = &session.working_template().data;
        assert!((data.drilling.cost_per_ha_for("Barley") - 105.50).abs() < 0.01);
        assert!(session.change_log().is_empty());
    }

    #[test]
    fn assignments_append_and_promote_on_active_delete() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        let id = session.save_template_as_new("Tagged").unwrap();
        assert_eq!(session.selected_template_id(), id);

        session
            .add_assignment(EntityKind::Field, "field-7", "Long Meadow")
            .unwrap();
        let template = session.working_template();
        assert_eq!(template.assignments.len(), 2);
        let seeded = template.assignments[0].id.clone();
        let added = template.assignments[1].id.clone();
        assert_eq!(template.active_assignment_id.as_deref(), Some(seeded.as_str()));

        assert!(session.delete_assignment(&seeded).unwrap());
        let template = session.working_template();
        assert_eq!(template.active_assignment_id.as_deref(), Some(added.as_str()));

        assert!(session.delete_assignment(&added).unwrap());
        assert!(session.working_template().active_assignment_id.is_none());
        assert!(!session.delete_assignment("as-ghost").unwrap());
    }

    #[test]
    fn storage_write_failures_surface_from_committing_calls() {
        let fail_writes = Rc::new(Cell::new(false));
        let backend = FailingStore {
            inner: MemoryStore::new(),
            fail_writes: fail_writes.clone(),
        };
        let mut session = OperationsSession::open(Box::new(backend)).unwrap();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        session.edit_category_cost(CategoryId::Other, 50.0);

        fail_writes.set(true);
        assert!(session.save_template(None).is_err());
        assert!(session.select_template(loader::STANDARD_TEMPLATE_ID).is_err());

        // The failed selection still moved the session; recover and commit.
        fail_writes.set(false);
        assert!(session.select_template(loader::WORKING_TEMPLATE_ID).unwrap());
        assert!(session.edit_category_cost(CategoryId::Other, 55.0));
        assert!(session.save_template(None).unwrap());
    }

    #[test]
    fn change_log_resolves_display_names() {
        let (mut session, _) = open_session();
        session.select_template(loader::WORKING_TEMPLATE_ID).unwrap();
        session.select_crop("Barley");
        session.edit_sub_operation_cost(CategoryId::Drilling, 1, 99.0);

        let log = session.change_log();
        assert_eq!(log.len(), 2);
        assert!(log.iter().any(|row| row.operation == "Direct drilling"
            && (row.previous_cost_per_ha - 36.0).abs() < 0.01));
        assert!(log.iter().any(|row| row.operation == "Drilling"
            && (row.previous_cost_per_ha - 105.50).abs() < 0.01));
        assert!(log.iter().all(|row| row.crop == "Barley"));
    }
}
