//! Citation handling for grounded research text.
//!
//! Web research replies carry grounding metadata: a list of web chunks and a
//! list of supports linking byte ranges of the reply to chunk indices. Real
//! urls are long, so each chunk gets a placeholder ("short url") that stays in
//! the research text until the finalizer swaps it back for the real url.
//!
//! ```text
//! research reply + grounding ──resolve_urls──▶ uri → short url
//!                            ──extract_citations──▶ [Citation]
//!                            ──insert_citation_markers──▶ "text [label](short)"
//! final answer ──resolve_citations──▶ "text [label](https://real/url)"
//! ```

use crate::state::{Source, SourceSet};
use llm::{GroundingChunk, GroundingMetadata};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

/// Prefix of every placeholder url.
pub const SHORT_URL_PREFIX: &str = "https://vertexaisearch.cloud.google.com/id/";

/// A cited span of research text and the sources backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// Byte offset where the span starts
    pub start: usize,
    /// Byte offset where the span ends; markers go here
    pub end: usize,
    pub sources: Vec<Source>,
}

/// Map each chunk uri to a placeholder url unique to this task.
///
/// The first chunk carrying a uri determines its placeholder.
pub fn resolve_urls(chunks: &[GroundingChunk], task_id: usize) -> HashMap<String, String> {
    let mut resolved = HashMap::new();
    for (idx, chunk) in chunks.iter().enumerate() {
        if let Some(web) = &chunk.web {
            resolved
                .entry(web.uri.clone())
                .or_insert_with(|| format!("{}{}-{}", SHORT_URL_PREFIX, task_id, idx));
        }
    }
    resolved
}

/// Display label for a source: the first dotted component of its title.
pub fn source_label(title: Option<&str>, uri: &str) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => match title.split_once('.') {
            Some((head, _)) if !head.is_empty() => head.to_string(),
            _ => title.to_string(),
        },
        None => uri.to_string(),
    }
}

/// Build citations from grounding supports.
///
/// Supports without a segment end are skipped, as are chunk indices that do
/// not point at a web chunk.
pub fn extract_citations(grounding: &GroundingMetadata, resolved: &HashMap<String, String>) -> Vec<Citation> {
    let mut citations = Vec::new();

    for support in &grounding.grounding_supports {
        let Some(segment) = &support.segment else {
            continue;
        };
        let Some(end) = segment.end_index else {
            continue;
        };
        let start = segment.start_index.unwrap_or(0);

        let sources: Vec<Source> = support
            .grounding_chunk_indices
            .iter()
            .filter_map(|&idx| grounding.grounding_chunks.get(idx)?.web.as_ref())
            .filter_map(|web| {
                let short_url = resolved.get(&web.uri)?;
                Some(Source::new(
                    source_label(web.title.as_deref(), &web.uri),
                    short_url.clone(),
                    web.uri.clone(),
                ))
            })
            .collect();

        if !sources.is_empty() {
            citations.push(Citation { start, end, sources });
        }
    }

    citations
}

/// Insert ` [label](short_url)` markers after each cited span.
///
/// Citations are applied from the end of the text backwards so earlier
/// offsets stay valid. Offsets are byte offsets; one that splits a character
/// moves forward to the next boundary and one past the end clamps to it.
pub fn insert_citation_markers(text: &str, citations: &[Citation]) -> String {
    let mut ordered: Vec<&Citation> = citations.iter().collect();
    ordered.sort_by(|a, b| (b.end, b.start).cmp(&(a.end, a.start)));

    let mut out = text.to_string();
    for citation in ordered {
        // Offsets refer to the original text; earlier inserts all sit at or after `at`.
        let at = snap_to_boundary(text, citation.end);
        let marker: String = citation
            .sources
            .iter()
            .map(|s| format!(" [{}]({})", s.label, s.short_url))
            .collect();
        out.insert_str(at, &marker);
    }
    out
}

fn snap_to_boundary(text: &str, offset: usize) -> usize {
    let mut at = offset.min(text.len());
    while !text.is_char_boundary(at) {
        at += 1;
    }
    at
}

/// Outcome of replacing placeholders in a final answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCitations {
    /// Answer text with real urls
    pub content: String,
    /// Sources referenced by the answer, in source-set order
    pub sources: Vec<Source>,
    /// Placeholders with no matching source, in order of appearance
    pub unresolved: Vec<String>,
}

fn linked_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([^\]]*)\]\((https://vertexaisearch\.cloud\.google\.com/id/[^)\s]*)\)")
            .expect("valid linked marker regex")
    })
}

fn bare_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"https://vertexaisearch\.cloud\.google\.com/id/[^\s)\]]*")
            .expect("valid bare marker regex")
    })
}

/// Swap placeholder urls in `answer` for the real urls they stand for.
///
/// A markdown link whose placeholder is unknown is reduced to its label; an
/// unknown bare placeholder is removed. Both are reported in
/// [`ResolvedCitations::unresolved`].
pub fn resolve_citations(answer: &str, sources: &SourceSet) -> ResolvedCitations {
    let mut cited: Vec<&str> = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();

    let mut note_unresolved = |marker: &str| {
        if !unresolved.iter().any(|m| m == marker) {
            unresolved.push(marker.to_string());
        }
    };

    let linked = linked_marker_re().replace_all(answer, |caps: &Captures| {
        let label = &caps[1];
        let marker = &caps[2];
        match sources.by_short_url(marker) {
            Some(source) => {
                cited.push(source.url.as_str());
                format!("[{}]({})", label, source.url)
            }
            None => {
                note_unresolved(marker);
                label.to_string()
            }
        }
    });

    let content = bare_marker_re()
        .replace_all(&linked, |caps: &Captures| {
            let marker = &caps[0];
            match sources.by_short_url(marker) {
                Some(source) => {
                    cited.push(source.url.as_str());
                    source.url.clone()
                }
                None => {
                    note_unresolved(marker);
                    String::new()
                }
            }
        })
        .into_owned();

    let cited_sources: Vec<Source> = sources
        .iter()
        .filter(|s| cited.contains(&s.url.as_str()))
        .cloned()
        .collect();

    if !unresolved.is_empty() {
        warn!(count = unresolved.len(), markers = ?unresolved, "Answer cites unknown sources");
    }

    ResolvedCitations {
        content,
        sources: cited_sources,
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::{GroundingSupport, Segment, WebChunk};

    fn chunk(uri: &str, title: &str) -> GroundingChunk {
        GroundingChunk {
            web: Some(WebChunk {
                uri: uri.to_string(),
                title: Some(title.to_string()),
            }),
        }
    }

    fn support(start: Option<usize>, end: Option<usize>, indices: Vec<usize>) -> GroundingSupport {
        GroundingSupport {
            segment: Some(Segment {
                start_index: start,
                end_index: end,
                text: None,
            }),
            grounding_chunk_indices: indices,
        }
    }

    #[test]
    fn test_resolve_urls_first_occurrence_wins() {
        let chunks = vec![
            chunk("https://a.example", "a.com"),
            GroundingChunk::default(),
            chunk("https://a.example", "a.com"),
            chunk("https://b.example", "b.com"),
        ];
        let resolved = resolve_urls(&chunks, 4);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["https://a.example"], format!("{}4-0", SHORT_URL_PREFIX));
        assert_eq!(resolved["https://b.example"], format!("{}4-3", SHORT_URL_PREFIX));
    }

    #[test]
    fn test_source_label() {
        assert_eq!(source_label(Some("uefa.com"), "u"), "uefa");
        assert_eq!(source_label(Some("bbc.co.uk"), "u"), "bbc");
        assert_eq!(source_label(Some("Wikipedia"), "u"), "Wikipedia");
        assert_eq!(source_label(None, "https://x.example"), "https://x.example");
    }

    #[test]
    fn test_extract_citations_skips_incomplete_supports() {
        let grounding = GroundingMetadata {
            web_search_queries: vec![],
            grounding_chunks: vec![chunk("https://a.example", "a.com")],
            grounding_supports: vec![
                support(None, Some(5), vec![0]),
                support(Some(1), None, vec![0]),
                GroundingSupport {
                    segment: None,
                    grounding_chunk_indices: vec![0],
                },
                support(Some(0), Some(3), vec![7]),
            ],
        };
        let resolved = resolve_urls(&grounding.grounding_chunks, 0);

        let citations = extract_citations(&grounding, &resolved);

        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].start, 0);
        assert_eq!(citations[0].end, 5);
        assert_eq!(citations[0].sources[0].label, "a");
    }

    #[test]
    fn test_insert_markers_from_the_end() {
        let a = Source::new("a", "S0", "https://a");
        let b = Source::new("b", "S1", "https://b");
        let citations = vec![
            Citation {
                start: 0,
                end: 5,
                sources: vec![a.clone()],
            },
            Citation {
                start: 6,
                end: 11,
                sources: vec![a, b],
            },
        ];
        assert_eq!(
            insert_citation_markers("Hello world", &citations),
            "Hello [a](S0) world [a](S0) [b](S1)"
        );
    }

    #[test]
    fn test_insert_markers_snaps_offsets() {
        let s = Source::new("s", "S", "https://s");
        let cite = |end| Citation {
            start: 0,
            end,
            sources: vec![s.clone()],
        };

        // byte 1 splits the two-byte 'é'
        assert_eq!(insert_citation_markers("éa", &[cite(1)]), "é [s](S)a");
        assert_eq!(insert_citation_markers("né", &[cite(2), cite(99)]), "né [s](S) [s](S)");
    }

    #[test]
    fn test_resolve_citations_replaces_and_collects() {
        let mut sources = SourceSet::new();
        sources.insert(Source::new("uefa", format!("{}0-0", SHORT_URL_PREFIX), "https://uefa.example/stats"));
        sources.insert(Source::new("bbc", format!("{}0-1", SHORT_URL_PREFIX), "https://bbc.example/euro"));
        sources.insert(Source::new("uefa", format!("{}1-0", SHORT_URL_PREFIX), "https://uefa.example/stats"));

        let answer = format!(
            "Kane scored 3 [uefa]({p}1-0). Also [uefa]({p}0-0).",
            p = SHORT_URL_PREFIX
        );
        let resolved = resolve_citations(&answer, &sources);

        assert_eq!(
            resolved.content,
            "Kane scored 3 [uefa](https://uefa.example/stats). Also [uefa](https://uefa.example/stats)."
        );
        assert_eq!(resolved.sources.len(), 1);
        assert_eq!(resolved.sources[0].url, "https://uefa.example/stats");
        assert!(resolved.unresolved.is_empty());
    }

    #[test]
    fn test_resolve_citations_does_not_confuse_prefixed_ids() {
        let mut sources = SourceSet::new();
        sources.insert(Source::new("a", format!("{}0-1", SHORT_URL_PREFIX), "https://a"));
        sources.insert(Source::new("b", format!("{}0-10", SHORT_URL_PREFIX), "https://b"));

        let answer = format!("x [b]({}0-10)", SHORT_URL_PREFIX);
        let resolved = resolve_citations(&answer, &sources);

        assert_eq!(resolved.content, "x [b](https://b)");
        assert_eq!(resolved.sources, vec![Source::new("b", format!("{}0-10", SHORT_URL_PREFIX), "https://b")]);
    }

    #[test]
    fn test_unresolved_markers_are_surfaced() {
        let sources = SourceSet::new();
        let answer = format!("Claim [bbc]({p}9-9). Bare {p}7-1 here.", p = SHORT_URL_PREFIX);

        let resolved = resolve_citations(&answer, &sources);

        assert_eq!(resolved.content, "Claim bbc. Bare  here.");
        assert!(resolved.sources.is_empty());
        assert_eq!(
            resolved.unresolved,
            vec![format!("{}9-9", SHORT_URL_PREFIX), format!("{}7-1", SHORT_URL_PREFIX)]
        );
    }
}
