//! Query, filter, sort, paginate and facet over an in-memory document slice.
//!
//! Pipeline, applied in order:
//! 1. case-insensitive substring match on id, name, description, tags,
//!    uploader and [`SEARCHABLE_CUSTOM_FIELDS`]
//! 2. type / category / status set membership
//! 3. inclusive `uploaded_at` range
//! 4. tag intersection (any requested tag)
//! 5. stable sort
//! 6. offset / limit
//!
//! Facets are counted over the whole collection, not the filtered result, so
//! a filter UI can show what exists outside the current selection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Document, DocumentCategory, DocumentStatus, DocumentType};

/// Custom fields included in free-text matching (string values only).
pub const SEARCHABLE_CUSTOM_FIELDS: &[&str] =
    &["partnerName", "partnerId", "companyName", "contactName", "contactEmail"];

const MAX_SUGGESTIONS: usize = 5;

wire_enum! {
    pub enum SortField {
        Name => "name",
        UploadedAt => "uploaded_at",
        LastModified => "last_modified",
        Size => "size",
    }
}

wire_enum! {
    pub enum SortDirection {
        Asc => "asc",
        Desc => "desc",
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Asc
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

/// Structured query. Empty sets and `None` disable the corresponding stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub types: BTreeSet<DocumentType>,
    pub categories: BTreeSet<DocumentCategory>,
    pub statuses: BTreeSet<DocumentStatus>,
    pub date_range: Option<DateRange>,
    pub tags: BTreeSet<String>,
    pub sort_by: Option<SortField>,
    pub sort_direction: SortDirection,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub types: BTreeMap<DocumentType, usize>,
    pub categories: BTreeMap<DocumentCategory, usize>,
    pub statuses: BTreeMap<DocumentStatus, usize>,
    pub tags: BTreeMap<String, usize>,
}

impl Facets {
    pub fn count(documents: &[Document]) -> Self {
        let mut facets = Facets::default();
        for doc in documents {
            *facets.types.entry(doc.doc_type).or_default() += 1;
            *facets.categories.entry(doc.category).or_default() += 1;
            *facets.statuses.entry(doc.status).or_default() += 1;
            for tag in &doc.tags {
                *facets.tags.entry(tag.clone()).or_default() += 1;
            }
        }
        facets
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub documents: Vec<Document>,
    /// Matches before pagination.
    pub total: usize,
    pub facets: Facets,
    pub suggestions: Vec<String>,
}

fn matches_text(doc: &Document, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    hit(&doc.id)
        || hit(&doc.name)
        || doc.description.as_deref().is_some_and(hit)
        || doc.tags.iter().any(|t| hit(t.as_str()))
        || hit(&doc.uploaded_by)
        || SEARCHABLE_CUSTOM_FIELDS
            .iter()
            .filter_map(|key| doc.custom_str(key))
            .any(hit)
}

fn matches_filters(doc: &Document, query: &SearchQuery) -> bool {
    (query.types.is_empty() || query.types.contains(&doc.doc_type))
        && (query.categories.is_empty() || query.categories.contains(&doc.category))
        && (query.statuses.is_empty() || query.statuses.contains(&doc.status))
        && query
            .date_range
            .as_ref()
            .map_or(true, |range| range.contains(doc.uploaded_at))
        && (query.tags.is_empty() || doc.tags.iter().any(|t| query.tags.contains(t)))
}

fn compare(a: &Document, b: &Document, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortField::UploadedAt => a.uploaded_at.cmp(&b.uploaded_at),
        SortField::LastModified => a.last_modified.cmp(&b.last_modified),
        SortField::Size => a.size.cmp(&b.size),
    }
}

fn suggestions(documents: &[Document], needle: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let candidates = documents
        .iter()
        .flat_map(|doc| std::iter::once(doc.name.as_str()).chain(doc.tags.iter().map(String::as_str)));
    for candidate in candidates {
        let lower = candidate.to_lowercase();
        if lower == needle || !lower.contains(needle) {
            continue;
        }
        if seen.insert(lower) {
            out.push(candidate.to_string());
            if out.len() == MAX_SUGGESTIONS {
                break;
            }
        }
    }
    out
}

/// Run `query` against `documents` (collection order = newest first).
pub fn search(documents: &[Document], query: &SearchQuery) -> SearchResult {
    let needle = query.needle();
    let mut matched: Vec<&Document> = documents
        .iter()
        .filter(|doc| needle.as_deref().map_or(true, |n| matches_text(doc, n)))
        .filter(|doc| matches_filters(doc, query))
        .collect();

    if let Some(field) = query.sort_by {
        // `sort_by` is stable, so ties keep collection order in both directions.
        match query.sort_direction {
            SortDirection::Asc => matched.sort_by(|a, b| compare(a, b, field)),
            SortDirection::Desc => matched.sort_by(|a, b| compare(b, a, field)),
        }
    }

    let total = matched.len();
    let page = matched
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    SearchResult {
        documents: page,
        total,
        facets: Facets::count(documents),
        suggestions: needle
            .as_deref()
            .map(|n| suggestions(documents, n))
            .unwrap_or_default(),
    }
}
