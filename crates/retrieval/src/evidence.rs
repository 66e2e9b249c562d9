//! Text renderings of merged evidence for the LLM collaborators.

use crate::types::{Citation, MergedResult};
use std::fmt::Write;

/// Numbered `[Source n]` blocks for answer assembly.
///
/// `source_index[i]` is the citation number of `merged[i]`; duplicates
/// therefore appear twice under the same number. Titles and URLs come from
/// the matching citation so the evidence names a source the way the
/// citation list does.
pub fn format_context(
    merged: &[MergedResult],
    source_index: &[usize],
    citations: &[Citation],
) -> String {
    if merged.is_empty() {
        return "No matching documents were retrieved.".to_string();
    }

    let mut out = String::new();
    for (i, result) in merged.iter().enumerate() {
        let source = cited(result, i, source_index, citations);
        let _ = writeln!(
            out,
            "[Source {}] {} ({}, score {:.2})",
            source.number,
            source.title,
            label(result),
            result.score()
        );
        if let Some(url) = source.url {
            let _ = writeln!(out, "URL: {}", url);
        }
        let _ = writeln!(out, "{}\n", result.hit.text.trim());
    }
    out.trim_end().to_string()
}

/// Summary handed to the sequential reasoner so it does not re-fetch what
/// the fan-out already found.
pub fn already_retrieved(
    merged: &[MergedResult],
    source_index: &[usize],
    citations: &[Citation],
) -> String {
    if merged.is_empty() {
        return "ALREADY RETRIEVED: nothing relevant was found in the first pass.".to_string();
    }

    let mut out = String::from("ALREADY RETRIEVED - do not search for these again:\n");
    for (i, result) in merged.iter().enumerate() {
        let _ = writeln!(
            out,
            "- [{}] {} (score {:.2}): {}",
            result.partition(),
            cited(result, i, source_index, citations).title,
            result.score(),
            first_line(&result.hit.text)
        );
    }
    out.trim_end().to_string()
}

struct CitedSource<'a> {
    number: usize,
    title: &'a str,
    url: Option<&'a str>,
}

/// Citation number, title and URL for `merged[i]`, falling back to the raw
/// hit when no citation carries that number.
fn cited<'a>(
    result: &'a MergedResult,
    i: usize,
    source_index: &[usize],
    citations: &'a [Citation],
) -> CitedSource<'a> {
    let number = source_index.get(i).copied().unwrap_or(i + 1);
    match citations.iter().find(|c| c.index == number) {
        Some(citation) => CitedSource {
            number,
            title: &citation.title,
            url: citation.url.as_deref(),
        },
        None => CitedSource {
            number,
            title: result
                .hit
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("Untitled"),
            url: result.hit.url.as_deref().filter(|u| !u.trim().is_empty()),
        },
    }
}

/// `[n] title - url` lines for the citation list section of a prompt.
pub fn format_citations(citations: &[Citation]) -> String {
    citations
        .iter()
        .map(|c| match c.url {
            Some(ref url) => format!("[{}] {} - {}", c.index, c.title, url),
            None => format!("[{}] {}", c.index, c.title),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn label(result: &MergedResult) -> String {
    if result.role.is_empty() {
        result.partition().as_str().to_uppercase()
    } else {
        format!("{}: {}", result.partition().as_str().to_uppercase(), result.role)
    }
}

fn first_line(text: &str) -> &str {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    match line.char_indices().nth(120) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchHit;

    fn merged(partition: &str, title: &str, text: &str) -> MergedResult {
        MergedResult {
            hit: SearchHit::new(partition, 0.8, text).with_title(title),
            role: "Role".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_context_keeps_duplicate_texts() {
        let evidence = vec![
            merged("guidance", "Same", "guidance wording"),
            merged("usc", "Same", "statute wording"),
        ];
        let context = format_context(&evidence, &[1, 1], &[]);
        assert!(context.contains("guidance wording"));
        assert!(context.contains("statute wording"));
        assert_eq!(context.matches("[Source 1]").count(), 2);
        assert!(context.contains("GUIDANCE: Role"));
    }

    #[test]
    fn test_already_retrieved_lists_every_hit() {
        let evidence = vec![
            merged("ecfr", "Part 117", "Hazard analysis\nmore"),
            merged("gras", "GRN 1", ""),
        ];
        let summary = already_retrieved(&evidence, &[1, 2], &[]);
        assert!(summary.starts_with("ALREADY RETRIEVED"));
        assert!(summary.contains("[ecfr] Part 117 (score 0.80): Hazard analysis"));
        assert!(summary.contains("[gras] GRN 1"));
        assert!(!summary.contains("more"));
    }

    #[test]
    fn test_untitled_hit_uses_citation_title() {
        let evidence = vec![MergedResult {
            hit: SearchHit::new("gras", 0.9, "GRN 000123 sesame"),
            role: String::new(),
            description: String::new(),
        }];
        let citations = vec![Citation {
            index: 1,
            partition: "gras".into(),
            title: "GRAS Document 1".to_string(),
            url: Some("https://www.fda.gov/gras".to_string()),
            score: 0.9,
        }];

        let context = format_context(&evidence, &[1], &citations);
        assert!(context.starts_with("[Source 1] GRAS Document 1 (GRAS, score 0.90)"));
        assert!(context.contains("URL: https://www.fda.gov/gras"));
        assert!(!context.contains("Untitled"));

        let summary = already_retrieved(&evidence, &[1], &citations);
        assert!(summary.contains("[gras] GRAS Document 1 (score 0.90)"));
    }

    #[test]
    fn test_format_citations() {
        let citations = vec![
            Citation {
                index: 1,
                partition: "ecfr".into(),
                title: "Part 117".to_string(),
                url: Some("https://x.test".to_string()),
                score: 0.9,
            },
            Citation {
                index: 2,
                partition: "custom".into(),
                title: "CUSTOM Document 2".to_string(),
                url: None,
                score: 0.7,
            },
        ];
        assert_eq!(
            format_citations(&citations),
            "[1] Part 117 - https://x.test\n[2] CUSTOM Document 2"
        );
    }

    #[test]
    fn test_empty_evidence() {
        assert!(format_context(&[], &[], &[]).starts_with("No matching"));
        assert!(already_retrieved(&[], &[], &[]).contains("nothing relevant"));
    }
}
