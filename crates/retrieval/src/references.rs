//! Well-known regulation references mentioned in a final answer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulationReference {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedReferences {
    pub references: Vec<RegulationReference>,
    pub keywords: Vec<String>,
}

struct KnownReference {
    needles: &'static [&'static str],
    title: &'static str,
    url: &'static str,
    keywords: &'static [&'static str],
}

const KNOWN_REFERENCES: &[KnownReference] = &[
    KnownReference {
        needles: &["21 CFR 117", "21 CFR Part 117"],
        title: "21 CFR 117 - CGMP, Hazard Analysis, and Risk-Based Preventive Controls",
        url: "https://www.ecfr.gov/current/title-21/chapter-I/subchapter-B/part-117",
        keywords: &["HACCP", "preventive controls", "CGMP"],
    },
    KnownReference {
        needles: &["FSVP", "Foreign Supplier Verification"],
        title: "21 CFR 1 Subpart L - Foreign Supplier Verification Programs (FSVP)",
        url: "https://www.ecfr.gov/current/title-21/chapter-I/subchapter-A/part-1/subpart-L",
        keywords: &["FSVP", "importer verification"],
    },
    KnownReference {
        needles: &["21 CFR 101", "21 CFR Part 101"],
        title: "21 CFR 101 - Food Labeling",
        url: "https://www.ecfr.gov/current/title-21/chapter-I/subchapter-B/part-101",
        keywords: &["labeling", "nutrition facts"],
    },
    KnownReference {
        needles: &["GRAS"],
        title: "GRAS Notice Inventory",
        url: "https://www.fda.gov/food/generally-recognized-safe-gras/gras-notice-inventory",
        keywords: &["GRAS"],
    },
    KnownReference {
        needles: &["Import Alert"],
        title: "FDA Import Alerts",
        url: "https://www.accessdata.fda.gov/cms_ia/ialist.html",
        keywords: &["import alert", "DWPE"],
    },
    KnownReference {
        needles: &["21 U.S.C. 343", "21 USC 343"],
        title: "21 U.S.C. 343 - Misbranded Food",
        url: "https://uscode.house.gov/view.xhtml?req=granuleid:USC-prelim-title21-section343&num=0&edition=prelim",
        keywords: &["misbranding"],
    },
];

/// Scan `text` for known references, case-insensitively.
///
/// References and keywords are de-duplicated and listed in table order,
/// not in the order they appear in `text`.
/// A numeric needle only matches when not followed by another digit, so
/// "21 CFR 1010" does not count as "21 CFR 101".
pub fn extract_references(text: &str) -> ExtractedReferences {
    let haystack = text.to_lowercase();
    let mut extracted = ExtractedReferences::default();

    for known in KNOWN_REFERENCES {
        if !known.needles.iter().any(|n| mentions(&haystack, &n.to_lowercase())) {
            continue;
        }

        extracted.references.push(RegulationReference {
            title: known.title.to_string(),
            url: known.url.to_string(),
        });
        for keyword in known.keywords {
            if !extracted.keywords.iter().any(|k| k == keyword) {
                extracted.keywords.push(keyword.to_string());
            }
        }
    }

    extracted
}

fn mentions(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        haystack[start + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_digit())
    })
}
