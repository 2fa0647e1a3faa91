//! Selected-filter reconstruction
//!
//! Turns the active [`FilterSet`] into labelled, individually removable chips
//! grouped by facet. Labels are resolved concurrently and reassembled in
//! facet-priority, then selection, order.

use futures::future::join_all;
use serde::Serialize;

use crate::filters::{Facet, FilterSet};
use crate::labels::LabelResolver;
use crate::model::SearchMode;

/// One removable selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterChip {
    pub code: String,
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedCategory {
    pub facet: Facet,
    pub heading: String,
    pub items: Vec<FilterChip>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedFilters {
    pub categories: Vec<SelectedCategory>,
}

/// Chip category order for a mode; same facets as [`Facet::offered_in`]
pub fn facet_priority(mode: SearchMode) -> &'static [Facet] {
    const SHARED: [Facet; 4] = [
        Facet::SchoolGroup,
        Facet::SchoolType,
        Facet::SchoolEducationPhase,
        Facet::SchoolStatus,
    ];
    const PROVIDER: [Facet; 5] = [
        Facet::Region,
        Facet::SchoolGroup,
        Facet::SchoolType,
        Facet::SchoolEducationPhase,
        Facet::SchoolStatus,
    ];

    match mode {
        SearchMode::Provider => &PROVIDER,
        SearchMode::Location | SearchMode::School => &SHARED,
    }
}

/// Link that removes exactly `code` from `facet`
pub fn remove_filter_href(facet: Facet, code: &str) -> String {
    format!("/results/remove-{}-filter/{}", facet.slug(), urlencoding::encode(code))
}

/// Chips for every selected code, or `None` when nothing is selected
pub async fn build_selected_filters(
    filters: &FilterSet,
    mode: SearchMode,
    labels: &dyn LabelResolver,
) -> Option<SelectedFilters> {
    let active: Vec<Facet> = facet_priority(mode)
        .iter()
        .copied()
        .filter(|f| !filters.codes(*f).is_empty())
        .collect();

    if active.is_empty() {
        return None;
    }

    let lookups = active.iter().flat_map(|facet| {
        filters
            .codes(*facet)
            .iter()
            .map(move |code| async move { (*facet, code.as_str(), labels.label(*facet, code).await) })
    });
    let resolved = join_all(lookups).await;

    let categories = active
        .into_iter()
        .map(|facet| SelectedCategory {
            facet,
            heading: facet.heading().to_string(),
            items: resolved
                .iter()
                .filter(|(f, _, _)| *f == facet)
                .map(|(_, code, text)| FilterChip {
                    code: code.to_string(),
                    text: text.clone(),
                    href: remove_filter_href(facet, code),
                })
                .collect(),
        })
        .collect();

    Some(SelectedFilters { categories })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::fallback_label;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Resolves "1" and "2" with a delay inversely ordered to the code
    struct SlowLabels;

    #[async_trait]
    impl LabelResolver for SlowLabels {
        async fn label(&self, facet: Facet, code: &str) -> String {
            let delay = if code == "1" { 20 } else { 1 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            match code {
                "1" | "2" => format!("{} {}", facet.heading(), code),
                other => fallback_label(other),
            }
        }
    }

    #[tokio::test]
    async fn test_no_selection_is_none() {
        let selected =
            build_selected_filters(&FilterSet::default(), SearchMode::Location, &SlowLabels).await;
        assert!(selected.is_none());
    }

    #[tokio::test]
    async fn test_categories_follow_priority_and_selection_order() {
        let filters = FilterSet {
            school_type: vec!["1".to_string(), "2".to_string()],
            school_group: vec!["9".to_string()],
            region: vec!["2".to_string()],
            ..FilterSet::default()
        };

        let selected = build_selected_filters(&filters, SearchMode::Location, &SlowLabels)
            .await
            .unwrap();
        let headings: Vec<&str> = selected.categories.iter().map(|c| c.heading.as_str()).collect();
        assert_eq!(headings, vec!["School group", "School type"]);

        let types = &selected.categories[1];
        assert_eq!(types.items[0].text, "School type 1");
        assert_eq!(types.items[1].text, "School type 2");
        assert_eq!(types.items[0].href, "/results/remove-school-type-filter/1");
        assert_eq!(selected.categories[0].items[0].text, "Unknown (9)");
    }

    #[tokio::test]
    async fn test_provider_mode_puts_region_first() {
        let filters = FilterSet {
            school_type: vec!["1".to_string()],
            region: vec!["2".to_string()],
            ..FilterSet::default()
        };
        let selected = build_selected_filters(&filters, SearchMode::Provider, &SlowLabels)
            .await
            .unwrap();
        assert_eq!(selected.categories[0].facet, Facet::Region);
        assert_eq!(selected.categories[0].items[0].href, "/results/remove-region-filter/2");
    }

    #[tokio::test]
    async fn test_chip_link_removes_exactly_its_code() {
        let filters = FilterSet {
            school_status: vec!["open".to_string(), "closing".to_string()],
            school_type: vec!["1".to_string()],
            ..FilterSet::default()
        };
        let selected = build_selected_filters(&filters, SearchMode::School, &SlowLabels)
            .await
            .unwrap();

        for category in &selected.categories {
            for chip in &category.items {
                let prefix = format!("/results/remove-{}-filter/", category.facet.slug());
                let code = chip.href.strip_prefix(&prefix).unwrap();
                let facet = Facet::from_slug(category.facet.slug()).unwrap();
                let next = filters.without(facet, code);

                let mut expected = filters.codes(facet).to_vec();
                expected.retain(|c| c != &chip.code);
                assert_eq!(next.codes(facet), expected.as_slice());
            }
        }
    }

    #[test]
    fn test_chip_order_covers_exactly_the_offered_facets() {
        for mode in [SearchMode::Location, SearchMode::Provider, SearchMode::School] {
            let mut chips = facet_priority(mode).to_vec();
            let mut offered = Facet::offered_in(mode).to_vec();
            chips.sort();
            offered.sort();
            assert_eq!(chips, offered, "{}", mode);
        }
    }

    #[test]
    fn test_href_encodes_unsafe_characters() {
        assert_eq!(
            remove_filter_href(Facet::Region, "a b/c"),
            "/results/remove-region-filter/a%20b%2Fc"
        );
        assert_eq!(
            remove_filter_href(Facet::SchoolType, "Église"),
            "/results/remove-school-type-filter/%C3%89glise"
        );
    }
}
