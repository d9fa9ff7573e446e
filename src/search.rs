//! Query resolution: decides whether a search is a location filter, a
//! code lookup or a semantic search, and runs the chosen strategy.
//!
//! Precedence per request:
//! 1. blank query + location filter → location listing
//! 2. short query matching a code → single exact hit, no embedding work
//! 3. everything else → embed, rank, threshold
//!
//! A failed embedding degrades to "no semantic match" (or the keyword
//! fallback when configured); it never fails the whole search.

use serde::Serialize;

use crate::boxes::{BoxRecord, RecordManager, StoreError};
use crate::codes;
use crate::semantic::{self, filter_by_threshold, rank, Embedder};

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    /// Location label to restrict candidates to. Opaque to the resolver.
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredBox {
    pub score: f32,
    #[serde(flatten)]
    pub record: BoxRecord,
}

/// Outcome of one resolved search. Empty-result shapes are distinct so
/// the caller can word each one differently.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Nothing to do: blank query and no location filter.
    NoQuery,
    /// Blank query, location filter set. Recency-ordered; an empty list
    /// means no boxes in that location.
    LocationOnly(Vec<BoxRecord>),
    /// Short query matched a box code exactly.
    CodeMatch(Box<BoxRecord>),
    /// Ranked semantic results above threshold, capped.
    Semantic(Vec<ScoredBox>),
    /// Keyword fallback hits (substring over item text), recency-ordered.
    Keyword(Vec<BoxRecord>),
    /// Semantic path ran but produced nothing usable.
    NoSemanticMatch,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Minimum score a semantic hit must exceed.
    pub threshold: f32,
    /// Maximum number of semantic results.
    pub result_cap: usize,
    /// Queries shorter than this get the code fast path first.
    pub code_query_max_len: usize,
    /// Substring-match item text when the semantic path comes up empty.
    pub keyword_fallback: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            threshold: semantic::DEFAULT_THRESHOLD,
            result_cap: semantic::DEFAULT_RESULT_CAP,
            code_query_max_len: 6,
            keyword_fallback: false,
        }
    }
}

pub struct QueryResolver<'a> {
    records: &'a dyn RecordManager,
    embedder: &'a dyn Embedder,
    opts: ResolverOptions,
}

impl<'a> QueryResolver<'a> {
    pub fn new(
        records: &'a dyn RecordManager,
        embedder: &'a dyn Embedder,
        opts: ResolverOptions,
    ) -> Self {
        Self {
            records,
            embedder,
            opts,
        }
    }

    pub fn resolve(&self, request: &SearchRequest) -> Result<SearchOutcome, StoreError> {
        let query = request.query.trim();
        let location = request
            .location
            .as_deref()
            .map(str::trim)
            .filter(|loc| !loc.is_empty());

        if query.is_empty() && location.is_none() {
            return Ok(SearchOutcome::NoQuery);
        }

        // candidates arrive newest-first; every later step preserves that
        let mut candidates = self.records.list_all()?;
        if let Some(loc) = location {
            candidates.retain(|b| b.location == loc);
        }

        if query.is_empty() {
            return Ok(SearchOutcome::LocationOnly(candidates));
        }

        // Code fast path: codes are unambiguous and cheap to check, so a
        // short query is compared against them before any embedding work.
        if query.chars().count() < self.opts.code_query_max_len {
            let code = codes::normalize_code(query);
            if let Some(hit) = candidates.iter().find(|b| b.code == code) {
                return Ok(SearchOutcome::CodeMatch(Box::new(hit.clone())));
            }
        }

        let query_vector = match self.embedder.embed(query) {
            Ok(vector) => vector,
            Err(err) => {
                log::warn!("Query embedding failed, degrading search: {}", err);
                return Ok(self.fallback_outcome(query, &candidates));
            }
        };

        // Only records with a vector of the current model's dimensionality
        // are comparable; stale vectors from an older model are skipped.
        let comparable: Vec<&BoxRecord> = candidates
            .iter()
            .filter(|b| {
                b.embedding
                    .as_ref()
                    .is_some_and(|e| e.len() == query_vector.len())
            })
            .collect();

        let skipped = candidates
            .iter()
            .filter(|b| b.embedding.is_some())
            .count()
            .saturating_sub(comparable.len());
        if skipped > 0 {
            log::warn!(
                "Skipping {} box(es) with embeddings of a different dimensionality",
                skipped
            );
        }

        let pairs = comparable
            .iter()
            .map(|b| (*b, b.embedding.as_deref().unwrap_or(&[])));
        let ranked = match rank(&query_vector, pairs) {
            Ok(ranked) => ranked,
            Err(err) => {
                log::error!("Ranking failed: {}", err);
                return Ok(self.fallback_outcome(query, &candidates));
            }
        };

        let top = filter_by_threshold(ranked, self.opts.threshold, self.opts.result_cap);

        if top.is_empty() {
            return Ok(self.fallback_outcome(query, &candidates));
        }

        Ok(SearchOutcome::Semantic(
            top.into_iter()
                .map(|scored| ScoredBox {
                    score: scored.score,
                    record: scored.item.clone(),
                })
                .collect(),
        ))
    }

    /// Resolve an externally-decoded code (QR scan or typed entry).
    /// Not-found is a reportable outcome, not an error.
    pub fn resolve_scan(&self, raw_code: &str) -> Result<Option<BoxRecord>, StoreError> {
        let code = codes::normalize_code(raw_code);
        if code.is_empty() {
            return Ok(None);
        }
        self.records.get_by_code(&code)
    }

    fn fallback_outcome(&self, query: &str, candidates: &[BoxRecord]) -> SearchOutcome {
        if !self.opts.keyword_fallback {
            return SearchOutcome::NoSemanticMatch;
        }

        let needle = query.to_lowercase();
        let hits: Vec<BoxRecord> = candidates
            .iter()
            .filter(|b| {
                b.items
                    .iter()
                    .any(|item| item.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();

        if hits.is_empty() {
            SearchOutcome::NoSemanticMatch
        } else {
            SearchOutcome::Keyword(hits)
        }
    }
}
