//! citelaw-patterns: the closed, ordered set of citation-syntax patterns,
//! expressed as a declarative table of compiled regexes rather than
//! inlined into the detector.
//!
//! [`scan`] applies every pattern left-to-right, non-overlapping: once a
//! byte range has been claimed by an earlier pattern, no later pattern may
//! claim any part of it — except the application/読み替え upgrade (P11),
//! which re-classifies an already-matched citation instead of claiming new
//! text.

use std::ops::Range;

use citelaw_core::CitationKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// The Japanese-numeral character class used throughout the catalog:
/// kanji digits/multipliers plus half- and full-width ASCII digits.
const NUM: &str = r"[〇一二三四五六七八九十百千0-9０-９]+";

/// Which catalog entry produced a [`RawMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
    P9,
    P10,
    /// A bare `第<n>条` with no law-name prefix, no branch, and not part of
    /// a range or plural citation — the catalog otherwise has no entry for
    /// the ordinary intra-statute reference `第五条の規定により...`.
    /// Runs last so the more specific range/branch/plural patterns always
    /// get first claim on the same text.
    PBareArticle,
}

/// The raw, unresolved fields a pattern extracts. Not every field is
/// populated by every pattern; see the comment on each catalog entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchFields {
    pub law_name: Option<String>,
    pub era_kanji: Option<String>,
    pub year_kanji: Option<String>,
    pub seq_kanji: Option<String>,
    pub article_main_kanji: Option<String>,
    pub article_branch_kanji: Option<String>,
    pub paragraph_kanji: Option<String>,
    pub range_end_article_kanji: Option<String>,
    pub second_article_kanji: Option<String>,
    pub structural_marker: Option<char>,
    pub relative_phrase: Option<String>,
    pub defined_term_head: Option<String>,
}

/// One non-overlapping match produced by the pattern catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub pattern: PatternId,
    pub kind: CitationKind,
    pub range: Range<usize>,
    pub text: String,
    pub base_confidence: f64,
    pub fields: MatchFields,
    /// Set by the P11 pass: a trailing `...を準用する|を適用する|と読み替える`
    /// was found within a 32-character window, so the detector should
    /// upgrade this match's emitted kind to [`CitationKind::Application`].
    pub application_upgrade: bool,
}

static RE_P1: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<name>[^\s、。「」（）]+法)（(?P<era>明治|大正|昭和|平成|令和)(?P<year>{NUM})年法律第(?P<seq>{NUM})号）"
    ))
    .unwrap()
});

static RE_P2: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<name>[^\s、。「」（）]+法)第(?P<main>{NUM})条(?:の(?P<branch>{NUM}))?(?:第(?P<para>{NUM})項)?"
    ))
    .unwrap()
});

static RE_P3: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?:この法律|本法)(?:第(?P<main>{NUM})条)?")).unwrap()
});

static RE_P4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"前条第(?P<para>{NUM})項|前条|次条|前二項|前三項|前各項|前項|次項"
    ))
    .unwrap()
});

// The defined-term head is matched before P2's generic external-name
// pattern gets a chance at it (see `scan`'s catalog order): "新法第十条"
// names an article of the in-text-defined "新法", not an external law
// literally titled "新法". A trailing article reference is captured here
// so that case resolves as one Defined citation rather than being split.
static RE_P5: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:新法|旧法|改正法|新(?P<new_head>[^\s、。「」（）]+法)|旧(?P<old_head>[^\s、。「」（）]+法))(?:第(?P<main>{NUM})条(?:の(?P<branch>{NUM}))?(?:第(?P<para>{NUM})項)?)?"
    ))
    .unwrap()
});

static RE_P6: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"同法(?:第(?P<main>{NUM})条)?|当該(?P<name>[^\s、。「」（）]+法)"
    ))
    .unwrap()
});

static RE_P7: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"第(?P<start>{NUM})条から第(?P<end>{NUM})条まで"
    ))
    .unwrap()
});

static RE_P8: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"第(?P<first>{NUM})条(?:及び|又は|若しくは)第(?P<second>{NUM})条"
    ))
    .unwrap()
});

static RE_P9: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"第(?P<main>{NUM})条の(?P<branch>{NUM})(?:第(?P<para>{NUM})項)?"
    ))
    .unwrap()
});

static RE_P10: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"第(?P<main>{NUM})(?P<marker>[章編節款])")).unwrap()
});

static RE_BARE_ARTICLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"第(?P<main>{NUM})条(?:第(?P<para>{NUM})項)?")).unwrap()
});

/// The window (in characters) P11 looks ahead for a trailing
/// 準用/適用/読替え phrase.
const APPLICATION_WINDOW_CHARS: usize = 32;

fn overlaps(covered: &[Range<usize>], range: &Range<usize>) -> bool {
    covered
        .iter()
        .any(|c| range.start < c.end && c.start < range.end)
}

fn claim(covered: &mut Vec<Range<usize>>, range: Range<usize>) {
    covered.push(range);
}

/// Runs the full ordered catalog over `text`, returning non-overlapping
/// matches sorted by byte offset. P11's application upgrade is applied as
/// a final pass over the P2/P9 (article-citing) results.
pub fn scan(text: &str) -> Vec<RawMatch> {
    let mut covered: Vec<Range<usize>> = Vec::new();
    let mut out: Vec<RawMatch> = Vec::new();

    apply_p1(text, &mut covered, &mut out);
    // P5 runs before P2: a defined-term head like "新法" immediately
    // followed by "第X条" must bind to the in-text definition, not be
    // reinterpreted as an external citation to a law literally named
    // "新法".
    apply_p5(text, &mut covered, &mut out);
    apply_p2(text, &mut covered, &mut out);
    apply_p3(text, &mut covered, &mut out);
    apply_p4(text, &mut covered, &mut out);
    apply_p6(text, &mut covered, &mut out);
    apply_p7(text, &mut covered, &mut out);
    apply_p8(text, &mut covered, &mut out);
    apply_p9(text, &mut covered, &mut out);
    apply_p10(text, &mut covered, &mut out);
    // Runs last: claims only what no more specific pattern already did.
    apply_bare_article(text, &mut covered, &mut out);

    out.sort_by_key(|m| m.range.start);
    apply_p11(text, &mut out);
    out
}

fn apply_p1(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P1.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        let name_resolves_hint = true; // resolved later by the dictionary; base confidence assumes resolution
        out.push(RawMatch {
            pattern: PatternId::P1,
            kind: CitationKind::External,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence: if name_resolves_hint { 0.98 } else { 0.95 },
            fields: MatchFields {
                law_name: Some(caps["name"].to_string()),
                era_kanji: Some(caps["era"].to_string()),
                year_kanji: Some(caps["year"].to_string()),
                seq_kanji: Some(caps["seq"].to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p2(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P2.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        out.push(RawMatch {
            pattern: PatternId::P2,
            kind: CitationKind::External,
            range: range.clone(),
            text: m.as_str().to_string(),
            // Base confidence depends on whether the name resolves; the
            // detector fills in the resolved value (0.90 vs 0.60).
            base_confidence: 0.60,
            fields: MatchFields {
                law_name: Some(caps["name"].to_string()),
                article_main_kanji: Some(caps["main"].to_string()),
                article_branch_kanji: caps.name("branch").map(|m| m.as_str().to_string()),
                paragraph_kanji: caps.name("para").map(|m| m.as_str().to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p3(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P3.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        out.push(RawMatch {
            pattern: PatternId::P3,
            kind: CitationKind::Internal,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence: 0.85,
            fields: MatchFields {
                article_main_kanji: caps.name("main").map(|m| m.as_str().to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p4(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P4.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        out.push(RawMatch {
            pattern: PatternId::P4,
            kind: CitationKind::Relative,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence: 0.85,
            fields: MatchFields {
                relative_phrase: Some(m.as_str().to_string()),
                paragraph_kanji: caps.name("para").map(|m| m.as_str().to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p5(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P5.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        // The defined-term key used to look up the in-text definition:
        // the head alone, never including a trailing article reference.
        let term = if let Some(new_head) = caps.name("new_head") {
            format!("新{}", new_head.as_str())
        } else if let Some(old_head) = caps.name("old_head") {
            format!("旧{}", old_head.as_str())
        } else {
            // One of the three fixed literals; find which one the
            // overall match starts with, since captures carries no
            // named group for it.
            ["新法", "旧法", "改正法"]
                .into_iter()
                .find(|lit| m.as_str().starts_with(lit))
                .unwrap()
                .to_string()
        };
        // Base confidence: exact "新法"/"旧法"/"改正法" score 0.95, the
        // 新X法/旧X法 generalized forms score 0.85.
        let base_confidence = if caps.name("new_head").is_some() || caps.name("old_head").is_some() {
            0.85
        } else {
            0.95
        };
        out.push(RawMatch {
            pattern: PatternId::P5,
            kind: CitationKind::Defined,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence,
            fields: MatchFields {
                defined_term_head: Some(term),
                article_main_kanji: caps.name("main").map(|m| m.as_str().to_string()),
                article_branch_kanji: caps.name("branch").map(|m| m.as_str().to_string()),
                paragraph_kanji: caps.name("para").map(|m| m.as_str().to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p6(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P6.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        out.push(RawMatch {
            pattern: PatternId::P6,
            kind: CitationKind::Contextual,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence: 0.85,
            fields: MatchFields {
                law_name: caps.name("name").map(|m| m.as_str().to_string()),
                article_main_kanji: caps.name("main").map(|m| m.as_str().to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p7(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P7.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        out.push(RawMatch {
            pattern: PatternId::P7,
            kind: CitationKind::Internal,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence: 0.85,
            fields: MatchFields {
                article_main_kanji: Some(caps["start"].to_string()),
                range_end_article_kanji: Some(caps["end"].to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p8(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P8.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        // P8 emits two citations: register both, anchored at their own
        // sub-offsets within the full match so dedup keys stay distinct.
        let first = caps.name("first").unwrap();
        let second = caps.name("second").unwrap();
        out.push(RawMatch {
            pattern: PatternId::P8,
            kind: CitationKind::Internal,
            range: first.start()..first.end(),
            text: format!("第{}条", &caps["first"]),
            base_confidence: 0.85,
            fields: MatchFields {
                article_main_kanji: Some(caps["first"].to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        out.push(RawMatch {
            pattern: PatternId::P8,
            kind: CitationKind::Internal,
            range: second.start()..second.end(),
            text: format!("第{}条", &caps["second"]),
            base_confidence: 0.85,
            fields: MatchFields {
                article_main_kanji: Some(caps["second"].to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p9(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P9.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        out.push(RawMatch {
            pattern: PatternId::P9,
            kind: CitationKind::Internal,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence: 0.85,
            fields: MatchFields {
                article_main_kanji: Some(caps["main"].to_string()),
                article_branch_kanji: Some(caps["branch"].to_string()),
                paragraph_kanji: caps.name("para").map(|m| m.as_str().to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_p10(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_P10.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        let marker = caps["marker"].chars().next().unwrap();
        out.push(RawMatch {
            pattern: PatternId::P10,
            kind: CitationKind::Structural,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence: 0.80,
            fields: MatchFields {
                article_main_kanji: Some(caps["main"].to_string()),
                structural_marker: Some(marker),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

fn apply_bare_article(text: &str, covered: &mut Vec<Range<usize>>, out: &mut Vec<RawMatch>) {
    for caps in RE_BARE_ARTICLE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if overlaps(covered, &range) {
            continue;
        }
        out.push(RawMatch {
            pattern: PatternId::PBareArticle,
            kind: CitationKind::Internal,
            range: range.clone(),
            text: m.as_str().to_string(),
            base_confidence: 0.85,
            fields: MatchFields {
                article_main_kanji: Some(caps["main"].to_string()),
                paragraph_kanji: caps.name("para").map(|m| m.as_str().to_string()),
                ..Default::default()
            },
            application_upgrade: false,
        });
        claim(covered, range);
    }
}

static RE_APPLICATION_TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"を準用する|を適用する|と読み替える").unwrap());

/// P11: re-classifies an already-matched citation as [`CitationKind::Application`]
/// when a trailing 準用/適用/読み替え phrase is found within
/// [`APPLICATION_WINDOW_CHARS`] Japanese characters. Eligible kinds are the
/// ones P2/P9/P7/P3 produce (External/Internal); Relative, Structural,
/// Contextual and Defined citations are left alone.
fn apply_p11(text: &str, matches: &mut [RawMatch]) {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for m in matches.iter_mut() {
        if !matches!(m.kind, CitationKind::External | CitationKind::Internal) {
            continue;
        }
        let end_char_idx = match chars.iter().position(|(b, _)| *b >= m.range.end) {
            Some(idx) => idx,
            None => chars.len(),
        };
        let window_end_char = (end_char_idx + APPLICATION_WINDOW_CHARS).min(chars.len());
        let window_start_byte = m.range.end;
        let window_end_byte = chars.get(window_end_char).map(|(b, _)| *b).unwrap_or(text.len());
        if window_start_byte >= window_end_byte {
            continue;
        }
        let window = &text[window_start_byte..window_end_byte];
        if RE_APPLICATION_TRIGGER.is_match(window) {
            m.application_upgrade = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p1_matches_law_number_citation() {
        let text = "民法（明治二十九年法律第八十九号）の定めるところによる。";
        let matches = scan(text);
        let p1 = matches.iter().find(|m| m.pattern == PatternId::P1).unwrap();
        assert_eq!(p1.fields.law_name.as_deref(), Some("民法"));
        assert_eq!(p1.fields.era_kanji.as_deref(), Some("明治"));
        assert_eq!(p1.fields.year_kanji.as_deref(), Some("二十九"));
        assert_eq!(p1.fields.seq_kanji.as_deref(), Some("八十九"));
    }

    #[test]
    fn p4_relative_phrases_are_ordered_longest_first() {
        let text = "前条第二項の規定";
        let matches = scan(text);
        let p4 = matches.iter().find(|m| m.pattern == PatternId::P4).unwrap();
        assert_eq!(p4.text, "前条第二項");
        assert_eq!(p4.fields.paragraph_kanji.as_deref(), Some("二"));
    }

    #[test]
    fn p8_splits_into_two_citations() {
        let text = "民法第九十条及び商法第五百二十二条";
        let matches = scan(text);
        // P2 claims both "民法第九十条" and "商法第五百二十二条" as External
        // citations before P8 ever runs, since P2 precedes P8 in the
        // catalog order and both spans are law-name-prefixed.
        let externals: Vec<_> = matches
            .iter()
            .filter(|m| m.kind == CitationKind::External)
            .collect();
        assert_eq!(externals.len(), 2);
        assert_eq!(externals[0].fields.law_name.as_deref(), Some("民法"));
        assert_eq!(externals[1].fields.law_name.as_deref(), Some("商法"));
    }

    #[test]
    fn p8_splits_bare_article_range_without_law_name() {
        let text = "第五条及び第七条の規定";
        let matches = scan(text);
        let internals: Vec<_> = matches
            .iter()
            .filter(|m| m.kind == CitationKind::Internal)
            .collect();
        assert_eq!(internals.len(), 2);
        assert_eq!(internals[0].fields.article_main_kanji.as_deref(), Some("五"));
        assert_eq!(internals[1].fields.article_main_kanji.as_deref(), Some("七"));
    }

    #[test]
    fn p9_branch_article() {
        let text = "第十条の二第一項の規定";
        let matches = scan(text);
        let p9 = matches.iter().find(|m| m.pattern == PatternId::P9).unwrap();
        assert_eq!(p9.fields.article_main_kanji.as_deref(), Some("十"));
        assert_eq!(p9.fields.article_branch_kanji.as_deref(), Some("二"));
        assert_eq!(p9.fields.paragraph_kanji.as_deref(), Some("一"));
    }

    #[test]
    fn p11_upgrades_trailing_junyou() {
        let text = "民法第九十条の規定を準用する。";
        let matches = scan(text);
        let m = matches.iter().find(|m| m.pattern == PatternId::P2).unwrap();
        assert!(m.application_upgrade);
    }

    #[test]
    fn p11_does_not_upgrade_relative_citations() {
        let text = "前条の規定を準用する。";
        let matches = scan(text);
        let m = matches.iter().find(|m| m.pattern == PatternId::P4).unwrap();
        assert!(!m.application_upgrade);
    }

    #[test]
    fn patterns_never_overlap() {
        let text = "この法律の施行前に商法（明治三十二年法律第四十八号）第五条の規定により行った処分は、新法第十条の規定によるものとみなす。";
        let matches = scan(text);
        for i in 0..matches.len() {
            for j in (i + 1)..matches.len() {
                let a = &matches[i].range;
                let b = &matches[j].range;
                assert!(a.end <= b.start || b.end <= a.start, "overlap: {a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn structural_pattern() {
        let text = "第三章の規定は";
        let matches = scan(text);
        let p10 = matches.iter().find(|m| m.pattern == PatternId::P10).unwrap();
        assert_eq!(p10.fields.structural_marker, Some('章'));
    }
}
