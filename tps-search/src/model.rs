//! Domain types shared by the search pipeline

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::filters::Facet;
use crate::geo::GeoPoint;
use crate::grouping::YearPartnerships;

/// How the result set is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Location,
    Provider,
    School,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Location => "location",
            SearchMode::Provider => "provider",
            SearchMode::School => "school",
        }
    }

    /// Entry form the caller is sent back to when the anchor is unusable
    pub fn entry_path(self) -> String {
        format!("/search/{}", self.as_str())
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "location" => Ok(SearchMode::Location),
            "provider" => Ok(SearchMode::Provider),
            "school" => Ok(SearchMode::School),
            other => Err(SearchError::UnknownMode(other.to_string())),
        }
    }
}

/// School admitted for ranking: identity, facet codes and position only
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolCandidate {
    pub id: String,
    pub name: String,
    pub urn: String,
    pub ukprn: Option<String>,
    pub type_code: String,
    pub group_code: String,
    pub status_code: String,
    pub education_phase_code: String,
    pub region_code: Option<String>,
    pub position: Option<GeoPoint>,
}

impl SchoolCandidate {
    /// Code this school carries for a facet
    pub fn facet_code(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::SchoolType => Some(&self.type_code),
            Facet::SchoolGroup => Some(&self.group_code),
            Facet::SchoolStatus => Some(&self.status_code),
            Facet::SchoolEducationPhase => Some(&self.education_phase_code),
            Facet::Region => self.region_code.as_deref(),
        }
    }
}

/// Position of one school in an ordered result list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSchool {
    pub school_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    pub line_1: String,
    pub line_2: Option<String>,
    pub line_3: Option<String>,
    pub town: String,
    pub county: Option<String>,
    pub postcode: String,
}

/// Display record for a school, with lookup codes resolved to names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolSummary {
    pub id: String,
    pub name: String,
    pub urn: String,
    pub ukprn: Option<String>,
    pub school_type: Option<String>,
    pub group: Option<String>,
    pub status: Option<String>,
    pub education_phase: Option<String>,
    pub region: Option<String>,
    pub address: Option<Address>,
    pub statutory_low_age: Option<i64>,
    pub statutory_high_age: Option<i64>,
}

/// Labels from a school's detail row; absent codes stay `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchoolCharacteristics {
    pub admissions_policy: Option<String>,
    pub boarder: Option<String>,
    pub gender: Option<String>,
    pub nursery_provision: Option<String>,
    pub religious_character: Option<String>,
    pub capacity: Option<i64>,
}

/// School detail view: summary, characteristics and partnerships by year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolDetails {
    #[serde(flatten)]
    pub school: SchoolSummary,
    pub characteristics: SchoolCharacteristics,
    pub academic_years: Vec<YearPartnerships>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    pub id: String,
    pub name: String,
}

/// Provider used as the anchor of a provider-mode search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub operating_name: String,
    pub legal_name: Option<String>,
    pub ukprn: Option<String>,
    pub urn: Option<String>,
}

impl ProviderSummary {
    pub fn to_ref(&self) -> ProviderRef {
        ProviderRef {
            id: self.id.clone(),
            name: self.operating_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcademicYearRef {
    pub code: String,
    pub name: String,
}

/// One partnership row joined with its school, year and provider.
///
/// Year and provider are absent for a school that has no live placements
/// (school-mode lookups still return the school itself).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRow {
    pub school: SchoolSummary,
    pub academic_year: Option<AcademicYearRef>,
    pub provider: Option<ProviderRef>,
}

/// Engine output unit: one school per grouping context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub school: SchoolSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    /// Anchor provider (provider mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderRef>,
    pub academic_years: Vec<String>,
    /// Providers seen across the school's rows (provider-free views only)
    pub providers: Vec<ProviderRef>,
}
