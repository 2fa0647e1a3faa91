//! CSV export of a complete result set
//!
//! The export walks the same ranking as the paginated view, loading entries
//! one batch at a time. Batch N+1 is fetched only once batch N has been
//! handed to the response body, so a client disconnect (which drops the
//! stream) stops the database work.

use std::sync::Arc;

use axum::body::Bytes;
use chrono::NaiveDateTime;
use futures::Stream;
use tracing::debug;

use crate::error::SearchError;
use crate::model::{RankedSchool, ResultEntry, SearchMode};
use crate::search::EntrySource;

/// School record on the public register, by URN
pub const REGISTRY_BASE_URL: &str =
    "https://get-information-schools.service.gov.uk/Establishments/Establishment/Details/";

const BYTE_ORDER_MARK: &str = "\u{feff}";
const LINE_END: &str = "\r\n";
const MAX_FILENAME_ANCHOR_LEN: usize = 50;

/// Quote a field if it contains a comma, quote, CR or LF; double inner quotes
pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn format_age_range(low: Option<i64>, high: Option<i64>) -> String {
    match (low, high) {
        (Some(l), Some(h)) => format!("{}–{}", l, h),
        (Some(l), None) => format!("{}+", l),
        (None, Some(h)) => format!("≤{}", h),
        (None, None) => String::new(),
    }
}

pub fn registry_link(urn: &str) -> String {
    format!("{}{}", REGISTRY_BASE_URL, urn)
}

/// `placement-schools-<anchor>-<YYYYMMDD-HHMMSS>.csv`
pub fn export_filename(anchor_name: &str, now: NaiveDateTime) -> String {
    let mut slug = String::new();
    for ch in anchor_name.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug: String = slug
        .trim_matches('-')
        .chars()
        .take(MAX_FILENAME_ANCHOR_LEN)
        .collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("search");
    }

    format!("placement-schools-{}-{}.csv", slug, now.format("%Y%m%d-%H%M%S"))
}

/// Column set for one search mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportLayout {
    mode: SearchMode,
}

impl ExportLayout {
    pub fn new(mode: SearchMode) -> Self {
        Self { mode }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        let mut headers = vec![
            "School name",
            "URN",
            "UKPRN",
            "School type",
            "School group",
            "School status",
            "School education phase",
            "Address line 1",
            "Address line 2",
            "Address line 3",
            "Town",
            "County",
            "Postcode",
            "Age range",
        ];
        match self.mode {
            SearchMode::Location => headers.push("Distance (miles)"),
            SearchMode::Provider => headers.extend(["Training provider", "Region"]),
            SearchMode::School => headers.push("Training providers"),
        }
        headers.extend(["Academic years", "Get information about schools"]);
        headers
    }

    /// Byte-order mark plus header line
    pub fn preamble(&self) -> String {
        let mut out = String::from(BYTE_ORDER_MARK);
        out.push_str(&join_record(self.headers().into_iter().map(str::to_string)));
        out
    }

    pub fn record(&self, entry: &ResultEntry) -> String {
        let school = &entry.school;
        let address = school.address.as_ref();
        let text = |v: Option<&String>| v.cloned().unwrap_or_default();

        let mut fields = vec![
            school.name.clone(),
            school.urn.clone(),
            text(school.ukprn.as_ref()),
            text(school.school_type.as_ref()),
            text(school.group.as_ref()),
            text(school.status.as_ref()),
            text(school.education_phase.as_ref()),
            address.map(|a| a.line_1.clone()).unwrap_or_default(),
            text(address.and_then(|a| a.line_2.as_ref())),
            text(address.and_then(|a| a.line_3.as_ref())),
            address.map(|a| a.town.clone()).unwrap_or_default(),
            text(address.and_then(|a| a.county.as_ref())),
            address.map(|a| a.postcode.clone()).unwrap_or_default(),
            format_age_range(school.statutory_low_age, school.statutory_high_age),
        ];

        match self.mode {
            SearchMode::Location => fields.push(
                entry
                    .distance_miles
                    .map(|d| format!("{:.2}", d))
                    .unwrap_or_default(),
            ),
            SearchMode::Provider => {
                fields.push(entry.provider.as_ref().map(|p| p.name.clone()).unwrap_or_default());
                fields.push(text(school.region.as_ref()));
            }
            SearchMode::School => fields.push(
                entry
                    .providers
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        }

        fields.push(entry.academic_years.join(", "));
        fields.push(registry_link(&school.urn));

        join_record(fields)
    }
}

fn join_record(fields: impl IntoIterator<Item = String>) -> String {
    let mut line = fields
        .into_iter()
        .map(|f| csv_escape(&f))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str(LINE_END);
    line
}

/// Stream the whole ranking as CSV: preamble first, then one chunk per batch
pub fn export_stream(
    source: Arc<dyn EntrySource>,
    ranked: Vec<RankedSchool>,
    layout: ExportLayout,
    batch_size: usize,
) -> impl Stream<Item = Result<Bytes, SearchError>> + Send + 'static {
    let batch_size = batch_size.max(1);

    async_stream::try_stream! {
        yield Bytes::from(layout.preamble());

        for (index, batch) in ranked.chunks(batch_size).enumerate() {
            let entries = source.load(batch).await?;
            debug!(batch = index, rows = entries.len(), "Export batch loaded");

            let mut chunk = String::new();
            for entry in &entries {
                chunk.push_str(&layout.record(entry));
            }
            yield Bytes::from(chunk);
        }
    }
}
