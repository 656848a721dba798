use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The five fixed cost categories of an operations sheet, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    Cultivation,
    Drilling,
    Application,
    Harvesting,
    Other,
}

impl CategoryId {
    pub const ALL: [CategoryId; 5] = [
        CategoryId::Cultivation,
        CategoryId::Drilling,
        CategoryId::Application,
        CategoryId::Harvesting,
        CategoryId::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryId::Cultivation => "cultivation",
            CategoryId::Drilling => "drilling",
            CategoryId::Application => "application",
            CategoryId::Harvesting => "harvesting",
            CategoryId::Other => "other",
        }
    }

    /// Heading shown on the sheet for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            CategoryId::Cultivation => "Cultivation",
            CategoryId::Drilling => "Drilling",
            CategoryId::Application => "Application",
            CategoryId::Harvesting => "Harvesting",
            CategoryId::Other => "Other",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CategoryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cultivation" => Ok(CategoryId::Cultivation),
            "drilling" => Ok(CategoryId::Drilling),
            "application" => Ok(CategoryId::Application),
            "harvesting" => Ok(CategoryId::Harvesting),
            "other" => Ok(CategoryId::Other),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Per-crop cost figures for one operation row.
///
/// `total_cost` is denormalised and always equals `cost_per_ha * hectares`
/// after a recompute pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropAllocation {
    pub hectares: f64,
    pub cost_per_ha: f64,
    pub total_cost: f64,
}

impl CropAllocation {
    pub fn new(hectares: f64, cost_per_ha: f64) -> Self {
        CropAllocation {
            hectares,
            cost_per_ha,
            total_cost: cost_per_ha * hectares,
        }
    }
}

/// One row of the sheet: a category when `sub_operations` is non-empty,
/// otherwise a leaf sub-operation.
///
/// `cost_per_ha` and `total_cost` mirror the `crop_data` entry for whichever
/// crop the sheet is currently displaying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub cost_per_ha: f64,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_operations: Vec<Operation>,
    #[serde(default)]
    pub crop_data: BTreeMap<String, CropAllocation>,
}

impl Operation {
    pub fn new(name: &str) -> Self {
        Operation {
            name: name.to_string(),
            cost_per_ha: 0.0,
            total_cost: 0.0,
            sub_operations: Vec::new(),
            crop_data: BTreeMap::new(),
        }
    }

    pub fn allocation(&self, crop: &str) -> Option<&CropAllocation> {
        self.crop_data.get(crop)
    }

    /// Fetches the allocation for `crop`, inserting a zero-cost entry over
    /// `hectares` when the crop has never been costed on this row.
    pub fn ensure_allocation(&mut self, crop: &str, hectares: f64) -> &mut CropAllocation {
        self.crop_data
            .entry(crop.to_string())
            .or_insert_with(|| CropAllocation::new(hectares, 0.0))
    }

    /// Per-hectare cost of this row for `crop`, treating a missing entry as 0.
    pub fn cost_per_ha_for(&self, crop: &str) -> f64 {
        self.crop_data.get(crop).map(|a| a.cost_per_ha).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_ids_parse_from_their_string_form() {
        for id in CategoryId::ALL {
            assert_eq!(id.as_str().parse::<CategoryId>(), Ok(id));
        }
        assert_eq!("Harvesting".parse::<CategoryId>(), Ok(CategoryId::Harvesting));
        assert!("ploughing".parse::<CategoryId>().is_err());
    }

    #[test]
    fn allocation_totals_follow_from_rate_and_area() {
        let alloc = CropAllocation::new(150.0, 110.0);
        assert!((alloc.total_cost - 16_500.0).abs() < 0.01);
    }

    #[test]
    fn missing_crop_entries_read_as_zero() {
        let mut op = Operation::new("Ploughing");
        op.crop_data
            .insert("Barley".to_string(), CropAllocation::new(80.0, 105.0));

        assert!((op.cost_per_ha_for("Barley") - 105.0).abs() < 0.01);
        assert!(op.cost_per_ha_for("Wheat (Winter)").abs() < f64::EPSILON);
    }

    #[test]
    fn operations_serialise_with_camel_case_keys() {
        let mut op = Operation::new("Combining");
        op.crop_data
            .insert("All crops".to_string(), CropAllocation::new(300.0, 95.0));
        op.cost_per_ha = 95.0;
        op.total_cost = 28_500.0;

        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"costPerHa\":95.0"));
        assert!(json.contains("\"cropData\""));
        // Leaf rows serialise without an empty subOperations array.
        assert!(!json.contains("subOperations"));

        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
