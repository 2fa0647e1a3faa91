//! Code → label resolution for facet values

use async_trait::async_trait;
use serde::Serialize;

use crate::filters::Facet;

/// Radius choices offered in location mode, in miles
pub const RADIUS_OPTIONS_MILES: [u32; 3] = [10, 25, 50];

/// Label shown when a code has no lookup entry
pub fn fallback_label(code: &str) -> String {
    format!("Unknown ({})", code)
}

#[async_trait]
pub trait LabelResolver: Send + Sync {
    /// Display name for a facet code; never fails, falls back to [`fallback_label`]
    async fn label(&self, facet: Facet, code: &str) -> String;
}

/// One selectable filter value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub text: String,
}

pub fn radius_options() -> Vec<FilterOption> {
    RADIUS_OPTIONS_MILES
        .iter()
        .map(|miles| FilterOption {
            value: miles.to_string(),
            text: format!("{} miles", miles),
        })
        .collect()
}
