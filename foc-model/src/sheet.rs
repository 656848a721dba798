use crate::crop::{Crop, ALL_CROPS};
use crate::operation::{CategoryId, Operation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The full cost sheet a template stores: one `Operation` tree per category
/// plus the farm's crop table and the sheet-level totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsData {
    pub cultivation: Operation,
    pub drilling: Operation,
    pub application: Operation,
    pub harvesting: Operation,
    pub other: Operation,
    pub crops: BTreeMap<String, Crop>,
    /// Sum of the category per-hectare costs for the displayed crop. The
    /// field name is inherited from the sheet layout; it is not a mean.
    pub total_average_cost: f64,
    pub total_cost: f64,
}

impl OperationsData {
    pub fn category(&self, id: CategoryId) -> &Operation {
        match id {
            CategoryId::Cultivation => &self.cultivation,
            CategoryId::Drilling => &self.drilling,
            CategoryId::Application => &self.application,
            CategoryId::Harvesting => &self.harvesting,
            CategoryId::Other => &self.other,
        }
    }

    pub fn category_mut(&mut self, id: CategoryId) -> &mut Operation {
        match id {
            CategoryId::Cultivation => &mut self.cultivation,
            CategoryId::Drilling => &mut self.drilling,
            CategoryId::Application => &mut self.application,
            CategoryId::Harvesting => &mut self.harvesting,
            CategoryId::Other => &mut self.other,
        }
    }

    pub fn categories(&self) -> [(CategoryId, &Operation); 5] {
        [
            (CategoryId::Cultivation, &self.cultivation),
            (CategoryId::Drilling, &self.drilling),
            (CategoryId::Application, &self.application),
            (CategoryId::Harvesting, &self.harvesting),
            (CategoryId::Other, &self.other),
        ]
    }

    pub fn categories_mut(&mut self) -> [(CategoryId, &mut Operation); 5] {
        let OperationsData {
            cultivation,
            drilling,
            application,
            harvesting,
            other,
            ..
        } = self;
        [
            (CategoryId::Cultivation, cultivation),
            (CategoryId::Drilling, drilling),
            (CategoryId::Application, application),
            (CategoryId::Harvesting, harvesting),
            (CategoryId::Other, other),
        ]
    }

    pub fn crop(&self, name: &str) -> Option<&Crop> {
        self.crops.get(name)
    }

    pub fn crop_hectares(&self, name: &str) -> Option<f64> {
        self.crops.get(name).map(|c| c.hectares)
    }

    /// Crop names excluding the synthetic "All crops" aggregate.
    pub fn real_crop_names(&self) -> Vec<&str> {
        self.crops
            .keys()
            .map(String::as_str)
            .filter(|name| *name != ALL_CROPS)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_sheet() -> OperationsData {
        OperationsData {
            cultivation: Operation::new("Cultivation"),
            drilling: Operation::new("Drilling"),
            application: Operation::new("Application"),
            harvesting: Operation::new("Harvesting"),
            other: Operation::new("Other"),
            crops: BTreeMap::new(),
            total_average_cost: 0.0,
            total_cost: 0.0,
        }
    }

    #[test]
    fn category_lookup_covers_all_five_ids() {
        let sheet = empty_sheet();
        for id in CategoryId::ALL {
            assert_eq!(sheet.category(id).name, id.display_name());
        }
    }

    #[test]
    fn real_crop_names_exclude_the_aggregate() {
        let mut sheet = empty_sheet();
        sheet.crops.insert(ALL_CROPS.to_string(), Crop::new(300.0));
        sheet.crops.insert("Barley".to_string(), Crop::new(80.0));
        sheet
            .crops
            .insert("Wheat (Winter)".to_string(), Crop::new(150.0));

        assert_eq!(sheet.real_crop_names(), vec!["Barley", "Wheat (Winter)"]);
        assert_eq!(sheet.crop_hectares(ALL_CROPS), Some(300.0));
    }

    #[test]
    fn categories_mut_exposes_each_tree_once() {
        let mut sheet = empty_sheet();
        for (id, op) in sheet.categories_mut() {
            op.cost_per_ha = match id {
                CategoryId::Cultivation => 1.0,
                CategoryId::Drilling => 2.0,
                CategoryId::Application => 3.0,
                CategoryId::Harvesting => 4.0,
                CategoryId::Other => 5.0,
            };
        }
        assert!((sheet.cultivation.cost_per_ha - 1.0).abs() < f64::EPSILON);
        assert!((sheet.other.cost_per_ha - 5.0).abs() < f64::EPSILON);
    }
}
