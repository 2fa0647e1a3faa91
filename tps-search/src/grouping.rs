//! Partnership grouping
//!
//! Collapses (school, provider, academic year) rows into one [`ResultEntry`]
//! per school in the active grouping context. The accumulator is an ordered
//! arena: entries live in a `Vec` in first-seen order and a map from school id
//! to slot gives O(1) merging.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::{PlacementRow, ProviderRef, RankedSchool, ResultEntry};

#[derive(Debug, Clone)]
enum GroupingContext {
    /// Location and school modes: providers accumulate per school
    Schools,
    /// Provider mode: only the anchor's rows count
    Provider(ProviderRef),
}

/// Ordered arena of result entries keyed by school id
#[derive(Debug, Clone)]
pub struct GroupingTable {
    context: GroupingContext,
    index: HashMap<String, usize>,
    entries: Vec<ResultEntry>,
}

impl GroupingTable {
    pub fn for_schools() -> Self {
        Self::with_context(GroupingContext::Schools)
    }

    pub fn for_provider(provider: ProviderRef) -> Self {
        Self::with_context(GroupingContext::Provider(provider))
    }

    fn with_context(context: GroupingContext) -> Self {
        Self {
            context,
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, row: PlacementRow) {
        if let GroupingContext::Provider(anchor) = &self.context {
            if row.provider.as_ref().map(|p| &p.id) != Some(&anchor.id) {
                return;
            }
        }

        let slot = match self.index.get(&row.school.id) {
            Some(slot) => *slot,
            None => {
                let provider = match &self.context {
                    GroupingContext::Provider(anchor) => Some(anchor.clone()),
                    GroupingContext::Schools => None,
                };
                self.index.insert(row.school.id.clone(), self.entries.len());
                self.entries.push(ResultEntry {
                    school: row.school,
                    distance_miles: None,
                    provider,
                    academic_years: Vec::new(),
                    providers: Vec::new(),
                });
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[slot];
        if let Some(year) = row.academic_year {
            if !entry.academic_years.contains(&year.name) {
                entry.academic_years.push(year.name);
            }
        }
        if let (GroupingContext::Schools, Some(provider)) = (&self.context, row.provider) {
            if !entry.providers.iter().any(|p| p.id == provider.id) {
                entry.providers.push(provider);
            }
        }
    }

    pub fn into_entries(self) -> Vec<ResultEntry> {
        self.entries
    }
}

/// One entry per school, providers accumulated
pub fn group_by_school(rows: impl IntoIterator<Item = PlacementRow>) -> Vec<ResultEntry> {
    let mut table = GroupingTable::for_schools();
    rows.into_iter().for_each(|row| table.push(row));
    table.into_entries()
}

/// One entry per school under the anchor provider; other providers' rows are ignored
pub fn group_for_provider(
    provider: &ProviderRef,
    rows: impl IntoIterator<Item = PlacementRow>,
) -> Vec<ResultEntry> {
    let mut table = GroupingTable::for_provider(provider.clone());
    rows.into_iter().for_each(|row| table.push(row));
    table.into_entries()
}

/// Reorder grouped entries to the ranking and attach distances.
///
/// Entries missing from the ranking are dropped; ranked ids without an entry
/// are skipped.
pub fn arrange(entries: Vec<ResultEntry>, ranked: &[RankedSchool]) -> Vec<ResultEntry> {
    let mut by_id: HashMap<String, ResultEntry> = entries
        .into_iter()
        .map(|e| (e.school.id.clone(), e))
        .collect();

    ranked
        .iter()
        .filter_map(|r| {
            let mut entry = by_id.remove(&r.school_id)?;
            entry.distance_miles = r.distance_miles;
            Some(entry)
        })
        .collect()
}

/// Providers partnering a school in one academic year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPartnerships {
    pub code: String,
    pub name: String,
    pub providers: Vec<ProviderRef>,
}

/// Group one school's rows by academic year, latest year first
pub fn group_by_academic_year(rows: impl IntoIterator<Item = PlacementRow>) -> Vec<YearPartnerships> {
    let mut years: BTreeMap<String, YearPartnerships> = BTreeMap::new();

    for row in rows {
        let (Some(year), Some(provider)) = (row.academic_year, row.provider) else {
            continue;
        };
        let group = years.entry(year.name.clone()).or_insert_with(|| YearPartnerships {
            code: year.code,
            name: year.name,
            providers: Vec::new(),
        });
        if !group.providers.iter().any(|p| p.id == provider.id) {
            group.providers.push(provider);
        }
    }

    let mut grouped: Vec<YearPartnerships> = years.into_values().rev().collect();
    for group in &mut grouped {
        group.providers.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AcademicYearRef, SchoolSummary};

    fn summary(id: &str) -> SchoolSummary {
        SchoolSummary {
            id: id.to_string(),
            name: format!("School {}", id),
            urn: "100000".to_string(),
            ukprn: None,
            school_type: None,
            group: None,
            status: None,
            education_phase: None,
            region: None,
            address: None,
            statutory_low_age: None,
            statutory_high_age: None,
        }
    }

    fn provider(id: &str, name: &str) -> ProviderRef {
        ProviderRef {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn year(code: &str) -> AcademicYearRef {
        let start: i32 = code.parse().unwrap();
        AcademicYearRef {
            code: code.to_string(),
            name: format!("{} to {}", start, start + 1),
        }
    }

    fn row(school: &str, y: &str, p: &ProviderRef) -> PlacementRow {
        PlacementRow {
            school: summary(school),
            academic_year: Some(year(y)),
            provider: Some(p.clone()),
        }
    }

    #[test]
    fn test_two_years_same_provider_collapse_to_one_entry() {
        let p = provider("p1", "North Trust");
        let entries = group_by_school(vec![row("s1", "2023", &p), row("s1", "2024", &p)]);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].academic_years, vec!["2023 to 2024", "2024 to 2025"]);
        assert_eq!(entries[0].providers, vec![p]);
    }

    #[test]
    fn test_school_appears_once_and_providers_dedupe() {
        let a = provider("p1", "A");
        let b = provider("p2", "B");
        let entries = group_by_school(vec![
            row("s1", "2024", &a),
            row("s2", "2024", &a),
            row("s1", "2024", &b),
            row("s1", "2024", &a),
        ]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].school.id, "s1");
        assert_eq!(entries[0].academic_years, vec!["2024 to 2025"]);
        assert_eq!(entries[0].providers, vec![a, b]);
    }

    #[test]
    fn test_membership_independent_of_row_order() {
        let a = provider("p1", "A");
        let rows = vec![row("s1", "2023", &a), row("s2", "2024", &a), row("s3", "2023", &a)];
        let mut reversed = rows.clone();
        reversed.reverse();

        let mut forward: Vec<String> = group_by_school(rows).into_iter().map(|e| e.school.id).collect();
        let mut backward: Vec<String> =
            group_by_school(reversed).into_iter().map(|e| e.school.id).collect();
        forward.sort();
        backward.sort();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_provider_context_ignores_other_providers() {
        let anchor = provider("p1", "Anchor");
        let other = provider("p2", "Other");
        let entries = group_for_provider(
            &anchor,
            vec![row("s1", "2023", &anchor), row("s2", "2023", &other), row("s1", "2024", &other)],
        );

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].provider.as_ref(), Some(&anchor));
        assert_eq!(entries[0].academic_years, vec!["2023 to 2024"]);
        assert!(entries[0].providers.is_empty());
    }

    #[test]
    fn test_school_without_placements_still_grouped() {
        let entries = group_by_school(vec![PlacementRow {
            school: summary("s1"),
            academic_year: None,
            provider: None,
        }]);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].academic_years.is_empty());
    }

    #[test]
    fn test_arrange_follows_ranking_and_sets_distance() {
        let a = provider("p1", "A");
        let entries = group_by_school(vec![row("s1", "2024", &a), row("s2", "2024", &a)]);
        let ranked = vec![
            RankedSchool {
                school_id: "s2".to_string(),
                distance_miles: Some(1.5),
            },
            RankedSchool {
                school_id: "s1".to_string(),
                distance_miles: Some(4.0),
            },
        ];

        let arranged = arrange(entries, &ranked);
        assert_eq!(arranged[0].school.id, "s2");
        assert_eq!(arranged[0].distance_miles, Some(1.5));
        assert_eq!(arranged[1].school.id, "s1");
    }

    #[test]
    fn test_partnerships_by_year_descending_and_providers_by_name() {
        let zed = provider("p1", "Zed Teaching");
        let alpha = provider("p2", "alpha SCITT");
        let grouped = group_by_academic_year(vec![
            row("s1", "2023", &zed),
            row("s1", "2024", &zed),
            row("s1", "2024", &alpha),
            row("s1", "2024", &zed),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].name, "2024 to 2025");
        assert_eq!(grouped[0].providers, vec![alpha, zed.clone()]);
        assert_eq!(grouped[1].name, "2023 to 2024");
        assert_eq!(grouped[1].providers, vec![zed]);
    }
}
