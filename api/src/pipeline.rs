//! Declarative proximity query plans.
//!
//! A plan says what to fetch (anchor, optional distance bound, filter, sort,
//! window, projection) and how to fetch it; record stores translate it into
//! their own query language.

use crate::geo::GeoPoint;
use crate::location::LocationAnchor;
use crate::validation::QueryDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Page and total come back from a single query.
    CombinedFacet,
    /// One query for the page, a second one for the count.
    SeparateCount,
}

impl ExecutionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "combined" | "facet" | "combined_facet" => Some(Self::CombinedFacet),
            "separate" | "separate_count" => Some(Self::SeparateCount),
            _ => None,
        }
    }
}

/// Searchable record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Malls,
    Banners,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Self::Malls => "malls",
            Self::Banners => "banners",
        }
    }

    pub fn searchable_fields(self) -> &'static [&'static str] {
        match self {
            Self::Malls => &["name", "address", "city"],
            Self::Banners => &["title", "description", "address"],
        }
    }

    pub fn projection(self) -> &'static [&'static str] {
        match self {
            Self::Malls => &["id", "name", "address", "city", "image_url", "created_at"],
            Self::Banners => &["id", "title", "description", "address", "image_url", "created_at"],
        }
    }
}

/// Case-insensitive literal match of `needle` against any of `fields`.
/// `pattern` is the regex-escaped needle, safe to hand to a regex engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub needle: String,
    pub pattern: String,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    pub active_only: bool,
    pub text: Option<TextMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    DistanceAsc,
    CreatedAtDesc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityQueryPlan {
    pub collection: Collection,
    pub anchor: GeoPoint,
    pub max_distance_meters: Option<f64>,
    pub filter: RecordFilter,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: u64,
    pub projection: &'static [&'static str],
    pub execution_mode: ExecutionMode,
}

/// Same predicate as the page query, without sort or window. Used for the
/// total in separate-count mode.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub collection: Collection,
    pub anchor: GeoPoint,
    pub max_distance_meters: Option<f64>,
    pub filter: RecordFilter,
}

impl ProximityQueryPlan {
    pub fn count_query(&self) -> CountQuery {
        CountQuery {
            collection: self.collection,
            anchor: self.anchor,
            max_distance_meters: self.max_distance_meters,
            filter: self.filter.clone(),
        }
    }
}

pub fn build_plan(
    collection: Collection,
    anchor: &LocationAnchor,
    descriptor: &QueryDescriptor,
    execution_mode: ExecutionMode,
) -> ProximityQueryPlan {
    ProximityQueryPlan {
        collection,
        anchor: anchor.point,
        max_distance_meters: anchor.effective_radius_meters,
        filter: RecordFilter {
            active_only: true,
            text: text_match(collection, &descriptor.search_text),
        },
        // Distance ties are common around shared anchors; recency keeps pages stable.
        sort: vec![SortKey::DistanceAsc, SortKey::CreatedAtDesc],
        skip: descriptor.skip,
        limit: descriptor.limit,
        projection: collection.projection(),
        execution_mode,
    }
}

fn text_match(collection: Collection, search_text: &str) -> Option<TextMatch> {
    let needle = search_text.trim();
    if needle.is_empty() {
        return None;
    }
    Some(TextMatch {
        needle: needle.to_string(),
        pattern: regex::escape(needle),
        fields: collection.searchable_fields(),
    })
}
