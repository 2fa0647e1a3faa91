//! Search pipeline
//!
//! `resolve_anchor` → `rank_schools` yields the complete ordered id list for
//! a search. Both the paginated view and the export load display entries
//! from that same list through an [`EntrySource`], so they can only differ in
//! slicing.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db;
use crate::error::{Result, SearchError};
use crate::facet_filter::FacetFilter;
use crate::filters::FilterSet;
use crate::geo::{self, BoundingBox, GeoPoint};
use crate::geocoding::{Geocoder, Place};
use crate::grouping::{arrange, group_by_school, group_for_provider};
use crate::model::{
    ProviderRef, ProviderSummary, RankedSchool, ResultEntry, SchoolCandidate, SearchMode,
};
use crate::pagination::{paginate, Pagination};
use crate::state_store::SearchState;

/// What a search is anchored on, resolved against the geocoder or database
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Anchor {
    Location {
        place: Place,
        center: GeoPoint,
        radius_miles: f64,
    },
    Provider {
        provider: ProviderSummary,
    },
    School {
        id: String,
        name: String,
        #[serde(skip_serializing)]
        candidate: SchoolCandidate,
    },
}

impl Anchor {
    pub fn mode(&self) -> SearchMode {
        match self {
            Anchor::Location { .. } => SearchMode::Location,
            Anchor::Provider { .. } => SearchMode::Provider,
            Anchor::School { .. } => SearchMode::School,
        }
    }

    /// Human name of the anchor, used in export filenames
    pub fn display_name(&self) -> &str {
        match self {
            Anchor::Location { place, .. } => &place.name,
            Anchor::Provider { provider } => &provider.operating_name,
            Anchor::School { name, .. } => name,
        }
    }

    pub fn provider(&self) -> Option<ProviderRef> {
        match self {
            Anchor::Provider { provider } => Some(provider.to_ref()),
            _ => None,
        }
    }
}

/// Resolve the stored anchor for `mode`
pub async fn resolve_anchor(
    pool: &SqlitePool,
    geocoder: &dyn Geocoder,
    state: &SearchState,
    mode: SearchMode,
    default_radius_miles: f64,
) -> Result<Anchor> {
    let id = state.anchor(mode).ok_or(SearchError::MissingAnchor(mode))?;

    match mode {
        SearchMode::Location => {
            let place = geocoder.place_details(id).await?;
            let center = place
                .location
                .ok_or_else(|| SearchError::PlaceWithoutCoordinates(place.name.clone()))?;
            let radius_miles = state.filters.radius_miles().unwrap_or(default_radius_miles);
            Ok(Anchor::Location {
                place,
                center,
                radius_miles,
            })
        }
        SearchMode::Provider => {
            let provider = db::find_provider(pool, id)
                .await?
                .ok_or_else(|| SearchError::AnchorNotFound(mode, id.to_string()))?;
            Ok(Anchor::Provider { provider })
        }
        SearchMode::School => {
            let candidate = db::fetch_school_candidate(pool, id)
                .await?
                .ok_or_else(|| SearchError::AnchorNotFound(mode, id.to_string()))?;
            Ok(Anchor::School {
                id: candidate.id.clone(),
                name: candidate.name.clone(),
                candidate,
            })
        }
    }
}

fn by_name(a: &SchoolCandidate, b: &SchoolCandidate) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}

/// Filter, refine and order location candidates: nearest first, then by name
pub fn rank_by_distance(
    center: GeoPoint,
    radius_miles: f64,
    candidates: Vec<SchoolCandidate>,
    filter: &FacetFilter,
) -> Vec<RankedSchool> {
    let filtered = candidates.into_iter().filter(|c| filter.matches(c));
    let mut refined = geo::refine(center, radius_miles, filtered, |c| c.position);

    refined.sort_by(|(a, dist_a), (b, dist_b)| {
        dist_a.total_cmp(dist_b).then_with(|| by_name(a, b))
    });

    refined
        .into_iter()
        .map(|(c, distance)| RankedSchool {
            school_id: c.id,
            distance_miles: Some(distance),
        })
        .collect()
}

/// Filter and order candidates alphabetically
pub fn rank_by_name(candidates: Vec<SchoolCandidate>, filter: &FacetFilter) -> Vec<RankedSchool> {
    let mut filtered: Vec<SchoolCandidate> =
        candidates.into_iter().filter(|c| filter.matches(c)).collect();
    filtered.sort_by(by_name);

    filtered
        .into_iter()
        .map(|c| RankedSchool {
            school_id: c.id,
            distance_miles: None,
        })
        .collect()
}

/// Complete ordered result list for an anchor and filter set
pub async fn rank_schools(
    pool: &SqlitePool,
    anchor: &Anchor,
    filters: &FilterSet,
) -> Result<Vec<RankedSchool>> {
    let filter = FacetFilter::new(filters, anchor.mode());

    let ranked = match anchor {
        Anchor::Location {
            center,
            radius_miles,
            ..
        } => {
            let bbox = BoundingBox::around(*center, *radius_miles);
            let candidates = db::fetch_location_candidates(pool, &bbox).await?;
            debug!(candidates = candidates.len(), radius_miles, "Bounding box candidates");
            rank_by_distance(*center, *radius_miles, candidates, &filter)
        }
        Anchor::Provider { provider } => {
            let candidates = db::fetch_provider_candidates(pool, &provider.id).await?;
            rank_by_name(candidates, &filter)
        }
        Anchor::School { candidate, .. } => rank_by_name(vec![candidate.clone()], &filter),
    };

    debug!(mode = %anchor.mode(), results = ranked.len(), "Ranked schools");
    Ok(ranked)
}

/// Loads display entries for a slice of the ranking, in ranking order
#[async_trait]
pub trait EntrySource: Send + Sync {
    async fn load(&self, ranked: &[RankedSchool]) -> Result<Vec<ResultEntry>>;
}

/// Entry source backed by the placements database
#[derive(Clone)]
pub struct SqliteEntrySource {
    pool: SqlitePool,
    provider: Option<ProviderRef>,
}

impl SqliteEntrySource {
    pub fn new(pool: SqlitePool, anchor: &Anchor) -> Self {
        Self {
            pool,
            provider: anchor.provider(),
        }
    }
}

#[async_trait]
impl EntrySource for SqliteEntrySource {
    async fn load(&self, ranked: &[RankedSchool]) -> Result<Vec<ResultEntry>> {
        let ids: Vec<String> = ranked.iter().map(|r| r.school_id.clone()).collect();
        let provider_id = self.provider.as_ref().map(|p| p.id.as_str());
        let rows = db::fetch_placement_rows(&self.pool, &ids, provider_id).await?;

        let entries = match &self.provider {
            Some(provider) => group_for_provider(provider, rows),
            None => group_by_school(rows),
        };

        Ok(arrange(entries, ranked))
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub entries: Vec<ResultEntry>,
    pub pagination: Pagination,
}

pub async fn search_page(
    source: &dyn EntrySource,
    ranked: &[RankedSchool],
    page: usize,
    limit: usize,
) -> Result<SearchPage> {
    let (slice, pagination) = paginate(ranked, page, limit);
    let entries = source.load(slice).await?;

    Ok(SearchPage {
        entries,
        pagination,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::SchoolSummary;

    pub(crate) fn candidate(id: &str, name: &str, position: Option<GeoPoint>) -> SchoolCandidate {
        SchoolCandidate {
            id: id.to_string(),
            name: name.to_string(),
            urn: format!("1{}", id.len()),
            ukprn: None,
            type_code: "1".to_string(),
            group_code: "4".to_string(),
            status_code: "1".to_string(),
            education_phase_code: "2".to_string(),
            region_code: Some("L".to_string()),
            position,
        }
    }

    /// In-memory source producing one entry per ranked school
    pub(crate) struct FakeSource;

    #[async_trait]
    impl EntrySource for FakeSource {
        async fn load(&self, ranked: &[RankedSchool]) -> Result<Vec<ResultEntry>> {
            Ok(ranked
                .iter()
                .map(|r| ResultEntry {
                    school: SchoolSummary {
                        id: r.school_id.clone(),
                        name: format!("School {}", r.school_id),
                        urn: r.school_id.clone(),
                        ukprn: None,
                        school_type: None,
                        group: None,
                        status: None,
                        education_phase: None,
                        region: None,
                        address: None,
                        statutory_low_age: None,
                        statutory_high_age: None,
                    },
                    distance_miles: r.distance_miles,
                    provider: None,
                    academic_years: vec!["2024 to 2025".to_string()],
                    providers: Vec::new(),
                })
                .collect())
        }
    }

    fn north_of(center: GeoPoint, miles: f64) -> GeoPoint {
        GeoPoint::new(
            center.latitude + (miles / geo::EARTH_RADIUS_MILES).to_degrees(),
            center.longitude,
        )
    }

    #[test]
    fn test_rank_by_distance_scenario() {
        let center = GeoPoint::new(51.5, -0.12);
        let candidates = vec![
            candidate("far", "Far", Some(north_of(center, 10.4))),
            candidate("edge", "Edge", Some(north_of(center, 9.9))),
            candidate("near", "Near", Some(north_of(center, 3.0))),
        ];

        let ranked = rank_by_distance(center, 10.0, candidates, &FacetFilter::default());
        let ids: Vec<&str> = ranked.iter().map(|r| r.school_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "edge"]);
        assert!((ranked[0].distance_miles.unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_equal_distance_ties_break_by_name_then_id() {
        let center = GeoPoint::new(51.5, -0.12);
        let p = Some(north_of(center, 2.0));
        let candidates = vec![
            candidate("b", "beech", p),
            candidate("c", "Ash", p),
            candidate("a", "Ash", p),
        ];

        let ranked = rank_by_distance(center, 10.0, candidates, &FacetFilter::default());
        let ids: Vec<&str> = ranked.iter().map(|r| r.school_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_radius_is_monotonic() {
        let center = GeoPoint::new(53.8, -1.55);
        let candidates: Vec<SchoolCandidate> = (0..40)
            .map(|i| {
                let miles = i as f64 * 0.75;
                candidate(&format!("s{}", i), &format!("School {}", i), Some(north_of(center, miles)))
            })
            .collect();

        let radii = [1.0, 5.0, 10.0, 25.0, 50.0];
        for pair in radii.windows(2) {
            let small = rank_by_distance(center, pair[0], candidates.clone(), &FacetFilter::default());
            let large = rank_by_distance(center, pair[1], candidates.clone(), &FacetFilter::default());
            for r in &small {
                assert!(large.iter().any(|l| l.school_id == r.school_id));
            }
        }
    }

    #[test]
    fn test_rank_by_name_applies_filter() {
        let filters = FilterSet {
            keywords: Some("grove".to_string()),
            ..FilterSet::default()
        };
        let ranked = rank_by_name(
            vec![
                candidate("1", "Oak Lane", None),
                candidate("2", "Elm Grove Primary", None),
                candidate("3", "Birch Grove", None),
            ],
            &FacetFilter::new(&filters, SearchMode::School),
        );
        let ids: Vec<&str> = ranked.iter().map(|r| r.school_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
        assert!(ranked.iter().all(|r| r.distance_miles.is_none()));
    }

    #[tokio::test]
    async fn test_search_page_slices_ranking() {
        let ranked: Vec<RankedSchool> = (0..40)
            .map(|i| RankedSchool {
                school_id: format!("s{:02}", i),
                distance_miles: None,
            })
            .collect();

        let page = search_page(&FakeSource, &ranked, 2, 25).await.unwrap();
        assert_eq!(page.entries.len(), 15);
        assert_eq!(page.entries[0].school.id, "s25");
        assert!(page.pagination.has_previous_page);

        let past_end = search_page(&FakeSource, &ranked, 3, 25).await.unwrap();
        assert!(past_end.entries.is_empty());
        assert!(!past_end.pagination.has_next_page);
        assert!(past_end.pagination.has_previous_page);
    }
}
