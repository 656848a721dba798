use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the synthetic crop that aggregates the whole farm.
pub const ALL_CROPS: &str = "All crops";

/// Which segmentation dimension a filter combination slices a crop by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    None,
    EndUseMarket,
    Variety,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::EndUseMarket => "end_use_market",
            FilterKind::Variety => "variety",
        }
    }

    /// Label shown in the filter drop-down.
    pub fn display_name(&self) -> &'static str {
        match self {
            FilterKind::None => "No filter",
            FilterKind::EndUseMarket => "End-use market",
            FilterKind::Variety => "Variety",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(FilterKind::None),
            "end_use_market" | "end-use-market" => Ok(FilterKind::EndUseMarket),
            "variety" => Ok(FilterKind::Variety),
            other => Err(format!("unknown filter kind: {other}")),
        }
    }
}

/// One slice of a crop under some segmentation, e.g. the Milling share of
/// winter wheat. Segment areas are not required to sum to the crop area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub hectares: f64,
}

/// A crop grown on the farm, with its drilled area and any segmentations
/// the farm tracks for it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub hectares: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub end_use_market: BTreeMap<String, Segment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variety: BTreeMap<String, Segment>,
}

impl Crop {
    pub fn new(hectares: f64) -> Self {
        Crop {
            hectares,
            ..Crop::default()
        }
    }

    /// Segment table for a filter kind, or None when the kind is
    /// `FilterKind::None` or the crop carries no such segmentation.
    pub fn segments(&self, kind: FilterKind) -> Option<&BTreeMap<String, Segment>> {
        let table = match kind {
            FilterKind::None => return None,
            FilterKind::EndUseMarket => &self.end_use_market,
            FilterKind::Variety => &self.variety,
        };
        if table.is_empty() {
            None
        } else {
            Some(table)
        }
    }

    pub fn segment_hectares(&self, kind: FilterKind, name: &str) -> Option<f64> {
        self.segments(kind)
            .and_then(|table| table.get(name))
            .map(|s| s.hectares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheat() -> Crop {
        let mut crop = Crop::new(150.0);
        crop.end_use_market
            .insert("Milling".to_string(), Segment { hectares: 90.0 });
        crop.end_use_market
            .insert("Feed".to_string(), Segment { hectares: 60.0 });
        crop
    }

    #[test]
    fn filter_kinds_parse_from_user_input() {
        assert_eq!("end-use-market".parse::<FilterKind>(), Ok(FilterKind::EndUseMarket));
        assert_eq!("End_Use_Market".parse::<FilterKind>(), Ok(FilterKind::EndUseMarket));
        assert_eq!("none".parse::<FilterKind>(), Ok(FilterKind::None));
        assert!("maturity".parse::<FilterKind>().is_err());
    }

    #[test]
    fn segment_lookup_respects_the_filter_kind() {
        let crop = wheat();
        assert_eq!(crop.segment_hectares(FilterKind::EndUseMarket, "Milling"), Some(90.0));
        assert_eq!(crop.segment_hectares(FilterKind::Variety, "Milling"), None);
        assert_eq!(crop.segment_hectares(FilterKind::None, "Milling"), None);
    }

    #[test]
    fn crops_without_segments_offer_no_tables() {
        let bare = Crop::new(300.0);
        assert!(bare.segments(FilterKind::EndUseMarket).is_none());
        assert!(bare.segments(FilterKind::Variety).is_none());
    }
}
