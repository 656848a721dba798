//! Resolves a filter selection to the area of land it covers.

use foc_model::crop::FilterKind;
use foc_model::sheet::OperationsData;

/// Area a filter selection covers for `crop`: the sum of the selected
/// segments' areas, or the crop's full area when nothing is selected.
///
/// An empty selection means "everything", matching an untouched filter
/// drop-down. Segment names the crop does not carry contribute nothing,
/// including the case where the crop has no table for the filter kind at
/// all, so a stale selection can price a view at zero area rather than
/// silently widening it.
pub fn effective_hectares(
    sheet: &OperationsData,
    crop: &str,
    filter: FilterKind,
    sub_filters: &[String],
) -> f64 {
    let full = sheet.crop_hectares(crop).unwrap_or(0.0);
    if filter == FilterKind::None || sub_filters.is_empty() {
        return full;
    }
    let Some(segments) = sheet.crop(crop).and_then(|c| c.segments(filter)) else {
        return 0.0;
    };
    sub_filters
        .iter()
        .filter_map(|name| segments.get(name))
        .map(|segment| segment.hectares)
        .sum()
}

/// The selection to start from when the sheet switches to `filter`: every
/// end-use segment the crop offers, so totals stay non-zero by default.
/// This is special-cased to the end-use market filter; other kinds start
/// with nothing selected.
pub fn default_sub_filters(sheet: &OperationsData, crop: &str, filter: FilterKind) -> Vec<String> {
    if filter != FilterKind::EndUseMarket {
        return Vec::new();
    }
    sheet
        .crop(crop)
        .and_then(|c| c.segments(filter))
        .map(|segments| segments.keys().cloned().collect())
        .unwrap_or_default()
}

/// Filter kinds that actually segment `crop`, always led by
/// `FilterKind::None`.
pub fn available_filters(sheet: &OperationsData, crop: &str) -> Vec<FilterKind> {
    let mut kinds = vec![FilterKind::None];
    if let Some(crop_entry) = sheet.crop(crop) {
        for kind in [FilterKind::EndUseMarket, FilterKind::Variety] {
            if crop_entry.segments(kind).is_some() {
                kinds.push(kind);
            }
        }
    }
    kinds
}
