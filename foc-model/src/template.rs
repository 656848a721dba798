use crate::crop::FilterKind;
use crate::sheet::OperationsData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A saved filter view: a crop plus an optional segmentation slice of it.
///
/// `selected_sub_filters` is kept sorted so two combinations over the same
/// segments compare equal regardless of the order they were ticked in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCombination {
    pub id: String,
    pub name: String,
    pub selected_crop: String,
    pub selected_filter: FilterKind,
    pub selected_sub_filters: Vec<String>,
}

impl FilterCombination {
    pub fn new(id: &str, crop: &str, filter: FilterKind, mut sub_filters: Vec<String>) -> Self {
        if filter == FilterKind::None {
            sub_filters.clear();
        }
        sub_filters.sort();
        let name = FilterCombination::auto_name(crop, &sub_filters);
        FilterCombination {
            id: id.to_string(),
            name,
            selected_crop: crop.to_string(),
            selected_filter: filter,
            selected_sub_filters: sub_filters,
        }
    }

    /// Display name derived from the selection, e.g. `Wheat (Winter) - Milling`.
    pub fn auto_name(crop: &str, sub_filters: &[String]) -> String {
        if sub_filters.is_empty() {
            crop.to_string()
        } else {
            format!("{} - {}", crop, sub_filters.join(", "))
        }
    }

    /// True when this combination captures exactly the given selection.
    /// `sub_filters` must already be sorted.
    pub fn matches(&self, crop: &str, filter: FilterKind, sub_filters: &[String]) -> bool {
        self.selected_crop == crop
            && self.selected_filter == filter
            && self.selected_sub_filters == sub_filters
    }
}

/// What kind of farm entity a template can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Crop,
    Variety,
    Field,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Crop => "crop",
            EntityKind::Variety => "variety",
            EntityKind::Field => "field",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crop" => Ok(EntityKind::Crop),
            "variety" => Ok(EntityKind::Variety),
            "field" => Ok(EntityKind::Field),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Links a template to a crop, variety or field it should price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAssignment {
    pub id: String,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub entity_name: String,
}

/// A named cost sheet together with its saved filter views and entity
/// assignments. Templates flagged `is_default` ship with the app and cannot
/// be deleted; only `is_editable` templates accept cost edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub is_editable: bool,
    pub data: OperationsData,
    pub filter_combinations: Vec<FilterCombination>,
    pub active_filter_combination_id: Option<String>,
    #[serde(default)]
    pub assignments: Vec<EntityAssignment>,
    #[serde(default)]
    pub active_assignment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// The combination the sheet is currently displaying. Falls back to the
    /// first saved combination when the active id is stale.
    pub fn active_filter_combination(&self) -> Option<&FilterCombination> {
        self.active_filter_combination_id
            .as_deref()
            .and_then(|id| self.filter_combinations.iter().find(|fc| fc.id == id))
            .or_else(|| self.filter_combinations.first())
    }

    pub fn find_filter_combination(
        &self,
        crop: &str,
        filter: FilterKind,
        sub_filters: &[String],
    ) -> Option<&FilterCombination> {
        self.filter_combinations
            .iter()
            .find(|fc| fc.matches(crop, filter, sub_filters))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;

    #[test]
    fn sub_filters_are_stored_sorted() {
        let fc = FilterCombination::new(
            "fc-1",
            "Wheat (Winter)",
            FilterKind::EndUseMarket,
            vec!["Milling".to_string(), "Feed".to_string()],
        );
        assert_eq!(fc.selected_sub_filters, vec!["Feed", "Milling"]);
        assert_eq!(fc.name, "Wheat (Winter) - Feed, Milling");
    }

    #[test]
    fn unfiltered_combinations_drop_stray_sub_filters() {
        let fc = FilterCombination::new(
            "fc-2",
            "Barley",
            FilterKind::None,
            vec!["Malting".to_string()],
        );
        assert!(fc.selected_sub_filters.is_empty());
        assert_eq!(fc.name, "Barley");
    }

    #[test]
    fn matching_requires_the_same_slice() {
        let fc = FilterCombination::new(
            "fc-3",
            "Barley",
            FilterKind::EndUseMarket,
            vec!["Malting".to_string()],
        );
        assert!(fc.matches("Barley", FilterKind::EndUseMarket, &["Malting".to_string()]));
        assert!(!fc.matches("Barley", FilterKind::None, &[]));
        assert!(!fc.matches(
            "Barley",
            FilterKind::EndUseMarket,
            &["Feed".to_string(), "Malting".to_string()]
        ));
    }

    #[test]
    fn active_combination_falls_back_to_the_first_saved_one() {
        let mut template = loader::default_templates().unwrap().remove(0);
        template.active_filter_combination_id = Some("fc-gone".to_string());
        let active = template.active_filter_combination().unwrap();
        assert_eq!(active.id, template.filter_combinations[0].id);
    }

    #[test]
    fn templates_serialise_with_camel_case_keys() {
        let template = loader::default_templates().unwrap().remove(0);
        let json = serde_json::to_string(&template).unwrap();
        for key in [
            "\"isDefault\"",
            "\"isEditable\"",
            "\"filterCombinations\"",
            "\"activeFilterCombinationId\"",
            "\"selectedSubFilters\"",
            "\"createdAt\"",
            "\"totalAverageCost\"",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }
}
