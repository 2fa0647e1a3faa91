//! Facet predicates over the school dimension

use std::collections::HashSet;

use crate::filters::{Facet, FilterSet};
use crate::model::{SchoolCandidate, SearchMode};

/// Conjunction of "is one of" per selected facet plus an optional keyword.
///
/// Only facets the search mode offers take part.
#[derive(Debug, Clone, Default)]
pub struct FacetFilter {
    facets: Vec<(Facet, HashSet<String>)>,
    keyword: Option<String>,
}

impl FacetFilter {
    pub fn new(filters: &FilterSet, mode: SearchMode) -> Self {
        let facets = Facet::offered_in(mode)
            .iter()
            .copied()
            .filter(|f| !filters.codes(*f).is_empty())
            .map(|f| (f, filters.codes(f).iter().cloned().collect()))
            .collect();

        Self {
            facets,
            keyword: filters
                .keywords
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.facets.is_empty() && self.keyword.is_none()
    }

    pub fn matches(&self, school: &SchoolCandidate) -> bool {
        let facets_match = self.facets.iter().all(|(facet, codes)| {
            school
                .facet_code(*facet)
                .is_some_and(|code| codes.contains(code))
        });

        facets_match && self.keyword_matches(school)
    }

    fn keyword_matches(&self, school: &SchoolCandidate) -> bool {
        let Some(keyword) = &self.keyword else {
            return true;
        };

        [Some(school.name.as_str()), Some(school.urn.as_str()), school.ukprn.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(keyword.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school(name: &str, type_code: &str, region: Option<&str>) -> SchoolCandidate {
        SchoolCandidate {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            urn: "100001".to_string(),
            ukprn: Some("10012345".to_string()),
            type_code: type_code.to_string(),
            group_code: "4".to_string(),
            status_code: "1".to_string(),
            education_phase_code: "2".to_string(),
            region_code: region.map(str::to_string),
            position: None,
        }
    }

    #[test]
    fn test_empty_filter_set_matches_everything() {
        let filter = FacetFilter::new(&FilterSet::default(), SearchMode::Location);
        assert!(filter.is_unconstrained());
        assert!(filter.matches(&school("Oak Lane", "1", None)));
    }

    #[test]
    fn test_keyword_grove_scenario() {
        let filters = FilterSet {
            keywords: Some("grove".to_string()),
            ..FilterSet::default()
        };
        let filter = FacetFilter::new(&filters, SearchMode::Location);
        assert!(filter.matches(&school("Elm Grove Primary", "1", None)));
        assert!(!filter.matches(&school("Oak Lane", "1", None)));
    }

    #[test]
    fn test_keyword_matches_identifiers() {
        let filters = FilterSet {
            keywords: Some("1001234".to_string()),
            ..FilterSet::default()
        };
        assert!(FacetFilter::new(&filters, SearchMode::School).matches(&school("Oak Lane", "1", None)));
    }

    #[test]
    fn test_facets_are_anded_and_values_ored() {
        let filters = FilterSet {
            school_type: vec!["1".to_string(), "2".to_string()],
            region: vec!["L".to_string()],
            ..FilterSet::default()
        };
        let filter = FacetFilter::new(&filters, SearchMode::Provider);

        assert!(filter.matches(&school("A", "2", Some("L"))));
        assert!(!filter.matches(&school("B", "3", Some("L"))));
        assert!(!filter.matches(&school("C", "1", Some("N"))));
        assert!(!filter.matches(&school("D", "1", None)));
    }

    #[test]
    fn test_region_ignored_outside_provider_mode() {
        let filters = FilterSet {
            region: vec!["N".to_string()],
            ..FilterSet::default()
        };
        let london = school("Elm Grove Primary", "1", Some("L"));

        assert!(FacetFilter::new(&filters, SearchMode::Location).is_unconstrained());
        assert!(FacetFilter::new(&filters, SearchMode::Location).matches(&london));
        assert!(!FacetFilter::new(&filters, SearchMode::Provider).matches(&london));
    }
}
