//! Filter normalization
//!
//! Request payloads carry facet selections in whatever shape the form
//! produced: absent, a single value, or a list, possibly padded with the
//! `_unchecked` placeholder that unticked checkbox groups submit. Everything
//! downstream works on [`FilterSet`] only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::SearchMode;

/// Placeholder value submitted by an empty checkbox group
pub const UNCHECKED_SENTINEL: &str = "_unchecked";

/// Query/state key for the radius selection
pub const RADIUS_KEY: &str = "radius";

/// Query/state key for the keyword search
pub const KEYWORDS_KEY: &str = "keywords";

/// Filterable school dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    SchoolType,
    SchoolGroup,
    SchoolStatus,
    SchoolEducationPhase,
    Region,
}

impl Facet {
    pub const ALL: [Facet; 5] = [
        Facet::SchoolType,
        Facet::SchoolGroup,
        Facet::SchoolStatus,
        Facet::SchoolEducationPhase,
        Facet::Region,
    ];

    /// Parameter name in queries and stored state
    pub fn key(self) -> &'static str {
        match self {
            Facet::SchoolType => "schoolType",
            Facet::SchoolGroup => "schoolGroup",
            Facet::SchoolStatus => "schoolStatus",
            Facet::SchoolEducationPhase => "schoolEducationPhase",
            Facet::Region => "region",
        }
    }

    /// Path segment used by the remove-filter links
    pub fn slug(self) -> &'static str {
        match self {
            Facet::SchoolType => "school-type",
            Facet::SchoolGroup => "school-group",
            Facet::SchoolStatus => "school-status",
            Facet::SchoolEducationPhase => "school-education-phase",
            Facet::Region => "region",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Facet::SchoolType => "School type",
            Facet::SchoolGroup => "School group",
            Facet::SchoolStatus => "School status",
            Facet::SchoolEducationPhase => "School education phase",
            Facet::Region => "Region",
        }
    }

    /// Lookup table holding the code labels
    pub fn lookup_table(self) -> &'static str {
        match self {
            Facet::SchoolType => "school_types",
            Facet::SchoolGroup => "school_groups",
            Facet::SchoolStatus => "school_statuses",
            Facet::SchoolEducationPhase => "school_education_phases",
            Facet::Region => "regions",
        }
    }

    /// Facets a search mode offers, in option-list order. Selections outside
    /// this list never constrain that mode's results.
    pub fn offered_in(mode: SearchMode) -> &'static [Facet] {
        const SHARED: [Facet; 4] = [
            Facet::SchoolType,
            Facet::SchoolGroup,
            Facet::SchoolStatus,
            Facet::SchoolEducationPhase,
        ];

        match mode {
            SearchMode::Provider => &Facet::ALL,
            SearchMode::Location | SearchMode::School => &SHARED,
        }
    }

    pub fn from_key(key: &str) -> Option<Facet> {
        Facet::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn from_slug(slug: &str) -> Option<Facet> {
        Facet::ALL.into_iter().find(|f| f.slug() == slug)
    }
}

/// One loosely-shaped filter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    One(String),
    Many(Vec<String>),
}

impl RawValue {
    fn values(&self) -> &[String] {
        match self {
            RawValue::One(v) => std::slice::from_ref(v),
            RawValue::Many(vs) => vs,
        }
    }
}

/// Filter payload as received, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFilters(BTreeMap<String, RawValue>);

impl RawFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect query pairs; repeated keys (and `key[]` forms) become lists
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let key = key.strip_suffix("[]").unwrap_or(key);
            raw.append(key, value.into());
        }
        raw
    }

    pub fn append(&mut self, key: &str, value: String) {
        let next = match self.0.remove(key) {
            None => RawValue::One(value),
            Some(RawValue::One(first)) => RawValue::Many(vec![first, value]),
            Some(RawValue::Many(mut values)) => {
                values.push(value);
                RawValue::Many(values)
            }
        };
        self.0.insert(key.to_string(), next);
    }

    pub fn set(&mut self, key: &str, value: RawValue) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.0.get(key)
    }

    /// True when any facet or radius key is present
    pub fn has_filter_keys(&self) -> bool {
        self.0.contains_key(RADIUS_KEY) || Facet::ALL.iter().any(|f| self.0.contains_key(f.key()))
    }

    pub fn has_keywords(&self) -> bool {
        self.0.contains_key(KEYWORDS_KEY)
    }
}

/// Canonical filter selections: one ordered, duplicate-free code set per facet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    pub school_type: Vec<String>,
    pub school_group: Vec<String>,
    pub school_status: Vec<String>,
    pub school_education_phase: Vec<String>,
    pub region: Vec<String>,
    pub radius: Option<String>,
    pub keywords: Option<String>,
}

impl FilterSet {
    /// Canonicalize a raw payload
    pub fn normalize(raw: &RawFilters) -> Self {
        let mut set = FilterSet::default();
        for facet in Facet::ALL {
            *set.codes_mut(facet) = normalize_values(raw.get(facet.key()));
        }
        set.radius = normalize_values(raw.get(RADIUS_KEY)).into_iter().next();
        set.keywords = raw
            .get(KEYWORDS_KEY)
            .and_then(|v| v.values().first())
            .and_then(|k| normalize_keywords(k));
        set
    }

    /// Inverse of [`FilterSet::normalize`] for storage and links
    pub fn to_raw(&self) -> RawFilters {
        let mut raw = RawFilters::new();
        for facet in Facet::ALL {
            let codes = self.codes(facet);
            if !codes.is_empty() {
                raw.set(facet.key(), RawValue::Many(codes.to_vec()));
            }
        }
        if let Some(radius) = &self.radius {
            raw.set(RADIUS_KEY, RawValue::One(radius.clone()));
        }
        if let Some(keywords) = &self.keywords {
            raw.set(KEYWORDS_KEY, RawValue::One(keywords.clone()));
        }
        raw
    }

    pub fn codes(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::SchoolType => &self.school_type,
            Facet::SchoolGroup => &self.school_group,
            Facet::SchoolStatus => &self.school_status,
            Facet::SchoolEducationPhase => &self.school_education_phase,
            Facet::Region => &self.region,
        }
    }

    fn codes_mut(&mut self, facet: Facet) -> &mut Vec<String> {
        match facet {
            Facet::SchoolType => &mut self.school_type,
            Facet::SchoolGroup => &mut self.school_group,
            Facet::SchoolStatus => &mut self.school_status,
            Facet::SchoolEducationPhase => &mut self.school_education_phase,
            Facet::Region => &mut self.region,
        }
    }

    pub fn has_facet_selections(&self) -> bool {
        Facet::ALL.iter().any(|f| !self.codes(*f).is_empty())
    }

    /// No facet selections and no keywords
    pub fn is_unconstrained(&self) -> bool {
        !self.has_facet_selections() && self.keywords.is_none()
    }

    /// Copy with exactly one code removed from one facet
    pub fn without(&self, facet: Facet, code: &str) -> Self {
        let mut next = self.clone();
        next.codes_mut(facet).retain(|c| c != code);
        next
    }

    /// Copy with every facet and the radius cleared; keywords survive
    pub fn without_facets(&self) -> Self {
        FilterSet {
            keywords: self.keywords.clone(),
            ..FilterSet::default()
        }
    }

    pub fn without_keywords(&self) -> Self {
        FilterSet {
            keywords: None,
            ..self.clone()
        }
    }

    /// Copy with selections for facets `mode` does not offer cleared
    pub fn restricted_to(&self, mode: SearchMode) -> Self {
        let offered = Facet::offered_in(mode);
        let mut next = self.clone();
        for facet in Facet::ALL {
            if !offered.contains(&facet) {
                next.codes_mut(facet).clear();
            }
        }
        next
    }

    /// Replace facet and radius selections, keeping keywords
    pub fn with_facets_from(&self, other: &FilterSet) -> Self {
        FilterSet {
            keywords: self.keywords.clone(),
            ..other.clone()
        }
    }

    pub fn with_keywords(&self, keywords: Option<String>) -> Self {
        FilterSet {
            keywords: keywords.as_deref().and_then(normalize_keywords),
            ..self.clone()
        }
    }

    /// Selected radius if it parses as a positive number of miles
    pub fn radius_miles(&self) -> Option<f64> {
        self.radius
            .as_deref()
            .and_then(|r| r.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite() && *r > 0.0)
    }
}

fn normalize_values(value: Option<&RawValue>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in value.map(RawValue::values).unwrap_or_default() {
        let v = v.trim();
        if v.is_empty() || v == UNCHECKED_SENTINEL || out.iter().any(|seen| seen == v) {
            continue;
        }
        out.push(v.to_string());
    }
    out
}

fn normalize_keywords(keywords: &str) -> Option<String> {
    let trimmed = keywords.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse a positive integer query value, falling back on anything else
pub fn parse_positive(raw: Option<&str>, fallback: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawFilters {
        RawFilters::from_pairs(pairs.iter().map(|(k, v)| (*k, *v)))
    }

    #[test]
    fn test_scalar_becomes_single_element_set() {
        let set = FilterSet::normalize(&raw(&[("schoolType", "1")]));
        assert_eq!(set.school_type, vec!["1"]);
        assert!(set.school_group.is_empty());
    }

    #[test]
    fn test_sentinel_and_duplicates_dropped_in_first_seen_order() {
        let set = FilterSet::normalize(&raw(&[
            ("schoolGroup", "_unchecked"),
            ("schoolGroup", "4"),
            ("schoolGroup", "2"),
            ("schoolGroup", "4"),
        ]));
        assert_eq!(set.school_group, vec!["4", "2"]);
    }

    #[test]
    fn test_bracket_keys_accepted() {
        let set = FilterSet::normalize(&raw(&[("region[]", "A"), ("region[]", "B")]));
        assert_eq!(set.region, vec!["A", "B"]);
    }

    #[test]
    fn test_radius_first_value_wins() {
        let set = FilterSet::normalize(&raw(&[
            ("radius", "_unchecked"),
            ("radius", "25"),
            ("radius", "50"),
        ]));
        assert_eq!(set.radius.as_deref(), Some("25"));
        assert_eq!(set.radius_miles(), Some(25.0));
    }

    #[test]
    fn test_invalid_radius_has_no_miles() {
        let set = FilterSet::normalize(&raw(&[("radius", "far")]));
        assert_eq!(set.radius_miles(), None);
        let set = FilterSet::normalize(&raw(&[("radius", "-5")]));
        assert_eq!(set.radius_miles(), None);
    }

    #[test]
    fn test_keywords_trimmed_and_blank_dropped() {
        let set = FilterSet::normalize(&raw(&[("keywords", "  grove ")]));
        assert_eq!(set.keywords.as_deref(), Some("grove"));
        let set = FilterSet::normalize(&raw(&[("keywords", "   ")]));
        assert_eq!(set.keywords, None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = FilterSet::normalize(&raw(&[
            ("schoolType", "1"),
            ("schoolType", "_unchecked"),
            ("schoolStatus", "open"),
            ("region", "L"),
            ("radius", "10"),
            ("keywords", " elm "),
        ]));
        let twice = FilterSet::normalize(&once.to_raw());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_without_removes_exactly_one_code() {
        let set = FilterSet::normalize(&raw(&[
            ("schoolType", "1"),
            ("schoolType", "2"),
            ("schoolGroup", "1"),
        ]));
        let next = set.without(Facet::SchoolType, "1");
        assert_eq!(next.school_type, vec!["2"]);
        assert_eq!(next.school_group, vec!["1"]);
    }

    #[test]
    fn test_without_facets_keeps_keywords() {
        let set = FilterSet::normalize(&raw(&[
            ("schoolType", "1"),
            ("radius", "25"),
            ("keywords", "elm"),
        ]));
        let cleared = set.without_facets();
        assert!(!cleared.has_facet_selections());
        assert_eq!(cleared.radius, None);
        assert_eq!(cleared.keywords.as_deref(), Some("elm"));

        let no_keywords = set.without_keywords();
        assert_eq!(no_keywords.keywords, None);
        assert_eq!(no_keywords.school_type, vec!["1"]);
    }

    #[test]
    fn test_region_offered_only_in_provider_mode() {
        assert!(Facet::offered_in(SearchMode::Provider).contains(&Facet::Region));
        assert!(!Facet::offered_in(SearchMode::Location).contains(&Facet::Region));
        assert!(!Facet::offered_in(SearchMode::School).contains(&Facet::Region));
    }

    #[test]
    fn test_restricted_to_drops_unoffered_facets() {
        let set = FilterSet::normalize(&raw(&[
            ("schoolType", "1"),
            ("region", "N"),
            ("keywords", "elm"),
        ]));

        let location = set.restricted_to(SearchMode::Location);
        assert!(location.region.is_empty());
        assert_eq!(location.school_type, vec!["1"]);
        assert_eq!(location.keywords.as_deref(), Some("elm"));

        assert_eq!(set.restricted_to(SearchMode::Provider), set);
    }

    #[test]
    fn test_facet_slug_round_trip() {
        for facet in Facet::ALL {
            assert_eq!(Facet::from_slug(facet.slug()), Some(facet));
            assert_eq!(Facet::from_key(facet.key()), Some(facet));
        }
        assert_eq!(Facet::from_slug("colour"), None);
    }

    #[test]
    fn test_raw_filters_deserialize_loose_shapes() {
        let raw: RawFilters =
            serde_json::from_str(r#"{"schoolType":"1","region":["A","_unchecked"]}"#).unwrap();
        let set = FilterSet::normalize(&raw);
        assert_eq!(set.school_type, vec!["1"]);
        assert_eq!(set.region, vec!["A"]);
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(Some("3"), 1), 3);
        assert_eq!(parse_positive(Some("0"), 1), 1);
        assert_eq!(parse_positive(Some("-2"), 25), 25);
        assert_eq!(parse_positive(Some("abc"), 25), 25);
        assert_eq!(parse_positive(None, 25), 25);
    }
}
