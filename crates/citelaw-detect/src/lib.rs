//! citelaw-detect: the per-article detection pipeline. Consumes article
//! text plus a law dictionary and a mutable document context, and emits a
//! deduplicated, offset-sorted list of resolved citations.

pub mod definitions;
pub mod residual;

use std::ops::Range;
use std::time::{Duration, Instant};

use citelaw_context::{DocumentContext, RelativePhrase};
use citelaw_core::numeral::{kanji_to_int, ArticleLabel};
use citelaw_core::{Citation, CitationKind, Era, LawId, ResolutionMethod};
use citelaw_dict::LawDictionary;
use citelaw_patterns::{MatchFields, PatternId, RawMatch};
use once_cell::sync::Lazy;
use regex::Regex;
use residual::ResidualResolver;

/// Article text this long or longer bypasses external enrichment
/// entirely, regardless of whether a resolver is configured.
const RESIDUAL_SIZE_LIMIT: usize = 10_000;

/// How much surrounding text is handed to the residual resolver as
/// context for each unmatched occurrence.
const RESIDUAL_WINDOW_CHARS: usize = 40;

/// Confidence is never allowed above this for an externally-resolved
/// residual citation, regardless of what the resolver reports.
const RESIDUAL_CONFIDENCE_CAP: f64 = 0.70;

pub struct DetectorConfig {
    pub residual_resolver: Option<Box<dyn ResidualResolver + Send + Sync>>,
    pub residual_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            residual_resolver: None,
            residual_timeout: Duration::from_millis(200),
        }
    }
}

pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Runs the full six-phase pipeline over one article's text, mutating
    /// `ctx` as citations are found so later citations in the same
    /// article (and later articles, via the caller re-using `ctx`) can
    /// bind to what came before.
    pub fn detect(&self, text: &str, dict: &LawDictionary, ctx: &mut DocumentContext) -> Vec<Citation> {
        definitions::capture_definitions(text, ctx);

        let raw_matches = citelaw_patterns::scan(text);
        let mut covered: Vec<Range<usize>> = raw_matches.iter().map(|m| m.range.clone()).collect();
        let mut citations = Vec::with_capacity(raw_matches.len());

        for m in &raw_matches {
            if let Some(citation) = resolve_pattern_match(m, dict, ctx) {
                citations.push(citation);
            }
        }

        scan_same_article(text, &mut covered, ctx, &mut citations);

        if let Some(resolver) = self.config.residual_resolver.as_deref() {
            if text.chars().count() < RESIDUAL_SIZE_LIMIT {
                scan_residual(text, &covered, dict, resolver, self.config.residual_timeout, &mut citations);
            }
        }

        citations.sort_by_key(|c| c.byte_offset);
        dedup_by_offset_and_text(&mut citations);
        citations
    }
}

fn dedup_by_offset_and_text(citations: &mut Vec<Citation>) {
    let mut seen: Vec<(usize, String)> = Vec::with_capacity(citations.len());
    citations.retain(|c| {
        let key = (c.byte_offset, c.source_text.clone());
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

fn resolve_pattern_match(m: &RawMatch, dict: &LawDictionary, ctx: &mut DocumentContext) -> Option<Citation> {
    let kind = if m.application_upgrade { CitationKind::Application } else { m.kind };

    let citation = match m.pattern {
        PatternId::P1 => resolve_law_number(m, kind)?,
        PatternId::P2 => resolve_external_name(m, kind, dict),
        PatternId::P3 => resolve_this_law(m, kind, ctx)?,
        PatternId::P4 => resolve_relative(m, kind, ctx)?,
        PatternId::P5 => resolve_defined(m, kind, dict, ctx),
        PatternId::P6 => resolve_contextual(m, kind, dict, ctx),
        PatternId::P7 => resolve_range(m, kind, ctx),
        PatternId::P8 => resolve_plain_article(m, kind, ctx),
        PatternId::P9 => resolve_branch_article(m, kind, ctx)?,
        PatternId::P10 => resolve_structural(m, kind, ctx),
        PatternId::PBareArticle => resolve_plain_article(m, kind, ctx),
    };

    if m.kind == CitationKind::External {
        if let (Some(id), Some(name)) = (&citation.target_law_id, &citation.target_law_name) {
            ctx.note_law_mention(id.clone(), name.clone(), m.range.start);
        }
    }

    Some(citation)
}

fn fields(m: &RawMatch) -> &MatchFields {
    &m.fields
}

fn resolve_law_number(m: &RawMatch, kind: CitationKind) -> Option<Citation> {
    let f = fields(m);
    let era = Era::from_kanji(f.era_kanji.as_deref()?)?;
    let year = kanji_to_int(f.year_kanji.as_deref()?)?;
    let seq = kanji_to_int(f.seq_kanji.as_deref()?)?;
    let law_id = LawId::from_law_number(era.digit(), year, seq as u64);
    Some(Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id: Some(law_id),
        target_law_name: f.law_name.clone(),
        target_article_number: None,
        target_paragraph: None,
        confidence: m.base_confidence,
        resolution_method: ResolutionMethod::LawNumber,
    })
}

fn resolve_external_name(m: &RawMatch, kind: CitationKind, dict: &LawDictionary) -> Citation {
    let f = fields(m);
    let name = f.law_name.clone().unwrap_or_default();
    let resolved = dict.resolve_name(&name);
    let article_number = article_number_from_fields(f);
    let paragraph = f.paragraph_kanji.as_deref().and_then(kanji_to_int);
    let confidence = if resolved.is_some() { 0.90 } else { 0.60 };
    Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id: resolved,
        target_law_name: Some(name),
        target_article_number: article_number,
        target_paragraph: paragraph,
        confidence,
        resolution_method: ResolutionMethod::Dictionary,
    }
}

/// A bare `この法律`/`本法` mention with no trailing article is not a
/// citation at all — it is the kind of same-law reference the context pass
/// tracks, not something with a distinct target to point at. Only emit a
/// citation when an explicit `第X条` follows.
fn resolve_this_law(m: &RawMatch, kind: CitationKind, ctx: &DocumentContext) -> Option<Citation> {
    let f = fields(m);
    let main = f.article_main_kanji.as_deref().and_then(kanji_to_int)?;
    let article_number = ArticleLabel::new(main).to_article_number();
    Some(Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id: ctx.current_law_id().cloned(),
        target_law_name: ctx.current_law_name().map(|s| s.to_string()),
        target_article_number: Some(article_number),
        target_paragraph: None,
        confidence: m.base_confidence,
        resolution_method: ResolutionMethod::Pattern,
    })
}

fn map_relative_phrase(text: &str, paragraph_kanji: Option<&str>) -> Option<RelativePhrase> {
    match text {
        "前条" => Some(RelativePhrase::PrecedingArticle),
        "次条" => Some(RelativePhrase::FollowingArticle),
        "前項" => Some(RelativePhrase::PrecedingParagraph),
        "次項" => Some(RelativePhrase::FollowingParagraph),
        "前二項" => Some(RelativePhrase::PrecedingNParagraphs(2)),
        "前三項" => Some(RelativePhrase::PrecedingNParagraphs(3)),
        "前各項" => Some(RelativePhrase::AllPrecedingParagraphs),
        _ => {
            if text.starts_with("前条第") && text.ends_with('項') {
                let k = kanji_to_int(paragraph_kanji?)?;
                Some(RelativePhrase::PrecedingArticleParagraph(k))
            } else {
                None
            }
        }
    }
}

fn resolve_relative(m: &RawMatch, kind: CitationKind, ctx: &mut DocumentContext) -> Option<Citation> {
    let f = fields(m);
    let phrase_text = f.relative_phrase.as_deref()?;
    let phrase = map_relative_phrase(phrase_text, f.paragraph_kanji.as_deref())?;
    let resolution = ctx.resolve_relative(phrase)?;

    if let Some(article_number) = resolution.article_number {
        ctx.note_article_mention(ArticleLabel::new(article_number), m.range.start);
    }

    Some(Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id: ctx.current_law_id().cloned(),
        target_law_name: None,
        target_article_number: resolution.article_number.map(|n| ArticleLabel::new(n).to_article_number()),
        target_paragraph: if resolution.all_preceding { None } else { resolution.paragraph_number },
        confidence: m.base_confidence,
        resolution_method: ResolutionMethod::Relative,
    })
}

fn resolve_defined(m: &RawMatch, kind: CitationKind, dict: &LawDictionary, ctx: &DocumentContext) -> Citation {
    let f = fields(m);
    let term = f.defined_term_head.as_deref().unwrap_or(&m.text);
    let definition = ctx.lookup_definition(term);
    let (target_law_id, confidence) = match definition {
        Some(def) => match dict.resolve_name(&def.text) {
            Some(id) => (Some(id), 0.95),
            None => (ctx.current_law_id().cloned(), 0.85),
        },
        None => (ctx.current_law_id().cloned(), 0.85),
    };
    Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id,
        target_law_name: definition.map(|d| d.text.clone()),
        target_article_number: article_number_from_fields(f),
        target_paragraph: f.paragraph_kanji.as_deref().and_then(kanji_to_int),
        confidence,
        resolution_method: ResolutionMethod::Definition,
    }
}

fn resolve_contextual(m: &RawMatch, kind: CitationKind, dict: &LawDictionary, ctx: &DocumentContext) -> Citation {
    let f = fields(m);
    let article_number = f.article_main_kanji.as_deref().and_then(kanji_to_int).map(|n| ArticleLabel::new(n).to_article_number());

    let (target_law_id, target_law_name) = if let Some(name) = &f.law_name {
        match dict.resolve_name(name) {
            Some(id) => (Some(id), Some(name.clone())),
            None => match ctx.most_recent_law(m.range.start) {
                Some((id, name)) => (Some(id.clone()), Some(name.to_string())),
                None => (None, Some(name.clone())),
            },
        }
    } else {
        match ctx.most_recent_law(m.range.start) {
            Some((id, name)) => (Some(id.clone()), Some(name.to_string())),
            None => (None, None),
        }
    };

    Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id,
        target_law_name,
        target_article_number: article_number,
        target_paragraph: None,
        confidence: m.base_confidence,
        resolution_method: ResolutionMethod::Context,
    }
}

fn resolve_range(m: &RawMatch, kind: CitationKind, ctx: &DocumentContext) -> Citation {
    let f = fields(m);
    let start = f.article_main_kanji.as_deref().and_then(kanji_to_int);
    let end = f.range_end_article_kanji.as_deref().and_then(kanji_to_int);
    let target_article_number = match (start, end) {
        (Some(s), Some(e)) => Some(format!(
            "{}から{}まで",
            ArticleLabel::new(s).to_article_number(),
            ArticleLabel::new(e).to_article_number()
        )),
        _ => None,
    };
    Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id: ctx.current_law_id().cloned(),
        target_law_name: None,
        target_article_number,
        target_paragraph: None,
        confidence: m.base_confidence,
        resolution_method: ResolutionMethod::Pattern,
    }
}

fn resolve_plain_article(m: &RawMatch, kind: CitationKind, ctx: &DocumentContext) -> Citation {
    let f = fields(m);
    let article_number = f.article_main_kanji.as_deref().and_then(kanji_to_int).map(|n| ArticleLabel::new(n).to_article_number());
    Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id: ctx.current_law_id().cloned(),
        target_law_name: None,
        target_article_number: article_number,
        target_paragraph: None,
        confidence: m.base_confidence,
        resolution_method: ResolutionMethod::Pattern,
    }
}

fn resolve_branch_article(m: &RawMatch, kind: CitationKind, ctx: &DocumentContext) -> Option<Citation> {
    let f = fields(m);
    let main = kanji_to_int(f.article_main_kanji.as_deref()?)?;
    let branch = kanji_to_int(f.article_branch_kanji.as_deref()?)?;
    let paragraph = f.paragraph_kanji.as_deref().and_then(kanji_to_int);
    Some(Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id: ctx.current_law_id().cloned(),
        target_law_name: None,
        target_article_number: Some(ArticleLabel::with_branch(main, branch).to_article_number()),
        target_paragraph: paragraph,
        confidence: m.base_confidence,
        resolution_method: ResolutionMethod::Pattern,
    })
}

fn resolve_structural(m: &RawMatch, kind: CitationKind, ctx: &DocumentContext) -> Citation {
    Citation {
        kind,
        source_text: m.text.clone(),
        byte_offset: m.range.start,
        target_law_id: ctx.current_law_id().cloned(),
        target_law_name: None,
        target_article_number: None,
        target_paragraph: None,
        confidence: m.base_confidence,
        resolution_method: ResolutionMethod::Pattern,
    }
}

fn article_number_from_fields(f: &MatchFields) -> Option<String> {
    let main = f.article_main_kanji.as_deref().and_then(kanji_to_int)?;
    match f.article_branch_kanji.as_deref().and_then(kanji_to_int) {
        Some(branch) => Some(ArticleLabel::with_branch(main, branch).to_article_number()),
        None => Some(ArticleLabel::new(main).to_article_number()),
    }
}

static RE_SAME_ARTICLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"同条(?:第(?P<para>{NUM})項)?", NUM = r"[〇一二三四五六七八九十百千0-9０-９]+")).unwrap()
});

/// The `同条` context-pass phrase: not part of the pattern catalog (its
/// target depends on the most recently mentioned article, not just the
/// enclosing one), so it is resolved directly against already-covered
/// ranges here.
fn scan_same_article(text: &str, covered: &mut Vec<Range<usize>>, ctx: &DocumentContext, citations: &mut Vec<Citation>) {
    for caps in RE_SAME_ARTICLE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let range = m.start()..m.end();
        if covered.iter().any(|c| range.start < c.end && c.start < range.end) {
            continue;
        }
        let label = ctx.most_recent_article(range.start).or_else(|| ctx.current_article());
        let paragraph = caps.name("para").and_then(|p| kanji_to_int(p.as_str()));
        citations.push(Citation {
            kind: CitationKind::Contextual,
            source_text: m.as_str().to_string(),
            byte_offset: range.start,
            target_law_id: ctx.current_law_id().cloned(),
            target_law_name: None,
            target_article_number: label.map(|l| l.to_article_number()),
            target_paragraph: paragraph,
            confidence: 0.85,
            resolution_method: ResolutionMethod::Context,
        });
        covered.push(range);
    }
}

static RE_RESIDUAL_TABLE_LAW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"別表第{NUM}に掲げる法律", NUM = r"[〇一二三四五六七八九十百千0-9０-９]+")).unwrap()
});
static RE_RESIDUAL_PRECEDING_ITEMS: Lazy<Regex> = Lazy::new(|| Regex::new(r"前各号の法").unwrap());
static RE_RESIDUAL_RELATED_LAWS: Lazy<Regex> = Lazy::new(|| Regex::new(r"関係法令").unwrap());
static RE_RESIDUAL_PRE_AMENDMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"改正前の(?P<x>[^\s、。「」]+法)").unwrap());

fn scan_residual(
    text: &str,
    covered: &[Range<usize>],
    dict: &LawDictionary,
    resolver: &(dyn ResidualResolver + Send + Sync),
    timeout: Duration,
    citations: &mut Vec<Citation>,
) {
    let regexes: [&Lazy<Regex>; 4] = [
        &RE_RESIDUAL_TABLE_LAW,
        &RE_RESIDUAL_PRECEDING_ITEMS,
        &RE_RESIDUAL_RELATED_LAWS,
        &RE_RESIDUAL_PRE_AMENDMENT,
    ];

    for re in regexes {
        for m in re.find_iter(text) {
            let range = m.start()..m.end();
            if covered.iter().any(|c| range.start < c.end && c.start < range.end) {
                continue;
            }
            let window = window_around(text, &range, RESIDUAL_WINDOW_CHARS);
            let deadline = Instant::now() + timeout;
            let Some(candidate) = resolver.resolve(m.as_str(), &window, deadline) else {
                continue;
            };
            let Some(law_id) = dict.resolve_name(&candidate) else {
                continue;
            };
            citations.push(Citation {
                kind: CitationKind::External,
                source_text: m.as_str().to_string(),
                byte_offset: range.start,
                target_law_id: Some(law_id),
                target_law_name: Some(candidate),
                target_article_number: None,
                target_paragraph: None,
                confidence: RESIDUAL_CONFIDENCE_CAP,
                resolution_method: ResolutionMethod::Context,
            });
        }
    }
}

fn window_around(text: &str, range: &Range<usize>, chars_each_side: usize) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let start_idx = chars.iter().position(|(b, _)| *b >= range.start).unwrap_or(0);
    let end_idx = chars.iter().position(|(b, _)| *b >= range.end).unwrap_or(chars.len());
    let window_start = start_idx.saturating_sub(chars_each_side);
    let window_end = (end_idx + chars_each_side).min(chars.len());
    let start_byte = chars.get(window_start).map(|(b, _)| *b).unwrap_or(0);
    let end_byte = chars.get(window_end).map(|(b, _)| *b).unwrap_or(text.len());
    text[start_byte..end_byte].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use citelaw_core::LawKind;
    use citelaw_dict::DictionaryRecord;
    use residual::TableResolver;

    fn sample_dict() -> LawDictionary {
        LawDictionary::build(vec![
            DictionaryRecord {
                kind: "法律".into(),
                number: "明治二十九年法律第八十九号".into(),
                canonical_title: "民法".into(),
                reading: "".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "129AC0000000089".into(),
            },
            DictionaryRecord {
                kind: "法律".into(),
                number: "".into(),
                canonical_title: "労働基準法".into(),
                reading: "".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "322AC0000000049".into(),
            },
        ])
    }

    fn fresh_ctx() -> DocumentContext {
        let mut ctx = DocumentContext::new();
        ctx.enter_document(LawId::new("322AC0000000049"), "労働基準法");
        ctx.enter_article(ArticleLabel::new(15));
        ctx
    }

    #[test]
    fn resolves_law_number_citation() {
        let detector = Detector::new(DetectorConfig::default());
        let dict = sample_dict();
        let mut ctx = fresh_ctx();
        let citations = detector.detect("民法（明治二十九年法律第八十九号）の定めるところによる。", &dict, &mut ctx);
        let c = citations.iter().find(|c| c.kind == CitationKind::External).unwrap();
        assert_eq!(c.target_law_id, Some(LawId::new("129AC0000000089")));
        assert_eq!(c.resolution_method, ResolutionMethod::LawNumber);
    }

    #[test]
    fn bare_this_law_mention_emits_no_citation() {
        let detector = Detector::new(DetectorConfig::default());
        let dict = sample_dict();
        let mut ctx = fresh_ctx();
        let citations = detector.detect(
            "商事に関し、この法律に定めがない事項については商慣習に従い、商慣習がないときは民法（明治二十九年法律第八十九号）の定めるところによる。",
            &dict,
            &mut ctx,
        );
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].target_law_id, Some(LawId::new("129AC0000000089")));
    }

    #[test]
    fn resolves_relative_and_same_article_scenario() {
        let detector = Detector::new(DetectorConfig::default());
        let dict = sample_dict();
        let mut ctx = fresh_ctx();
        let citations = detector.detect("前条の規定により、同条第二項の適用を受ける。", &dict, &mut ctx);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].target_article_number.as_deref(), Some("第14条"));
        assert_eq!(citations[0].kind, CitationKind::Relative);
        assert_eq!(citations[1].target_article_number.as_deref(), Some("第14条"));
        assert_eq!(citations[1].target_paragraph, Some(2));
        assert_eq!(citations[1].kind, CitationKind::Contextual);
    }

    #[test]
    fn unresolvable_external_name_keeps_low_confidence() {
        let detector = Detector::new(DetectorConfig::default());
        let dict = sample_dict();
        let mut ctx = fresh_ctx();
        let citations = detector.detect("未知法第五条の規定による。", &dict, &mut ctx);
        let c = citations.iter().find(|c| c.kind == CitationKind::External).unwrap();
        assert!(c.target_law_id.is_none());
        assert_eq!(c.confidence, 0.60);
    }

    #[test]
    fn defined_term_resolves_via_context() {
        let detector = Detector::new(DetectorConfig::default());
        let dict = sample_dict();
        let mut ctx = fresh_ctx();
        let citations = detector.detect(
            "労働基準法（以下「新法」という。）を適用する。新法第一条の規定は",
            &dict,
            &mut ctx,
        );
        let defined = citations.iter().find(|c| c.kind == CitationKind::Defined).unwrap();
        assert_eq!(defined.target_law_id, Some(LawId::new("322AC0000000049")));
        assert_eq!(defined.resolution_method, ResolutionMethod::Definition);
    }

    #[test]
    fn application_upgrade_marks_kind() {
        let detector = Detector::new(DetectorConfig::default());
        let dict = sample_dict();
        let mut ctx = fresh_ctx();
        let citations = detector.detect("民法第九十条の規定を準用する。", &dict, &mut ctx);
        let c = citations.iter().find(|c| c.source_text.contains("第九十条")).unwrap();
        assert_eq!(c.kind, CitationKind::Application);
    }

    #[test]
    fn residual_phrase_resolves_through_table_and_dictionary() {
        let resolver = TableResolver::new().with_entry("関係法令", "労働基準法");
        let detector = Detector::new(DetectorConfig {
            residual_resolver: Some(Box::new(resolver)),
            residual_timeout: Duration::from_millis(50),
        });
        let dict = sample_dict();
        let mut ctx = fresh_ctx();
        let citations = detector.detect("その他関係法令の定めるところによる。", &dict, &mut ctx);
        let c = citations.iter().find(|c| c.source_text == "関係法令").unwrap();
        assert_eq!(c.target_law_id, Some(LawId::new("322AC0000000049")));
        assert!(c.confidence <= RESIDUAL_CONFIDENCE_CAP);
    }

    #[test]
    fn dedup_key_prevents_duplicate_offsets() {
        let mut citations = vec![
            Citation {
                kind: CitationKind::Internal,
                source_text: "第五条".into(),
                byte_offset: 3,
                target_law_id: None,
                target_law_name: None,
                target_article_number: None,
                target_paragraph: None,
                confidence: 0.8,
                resolution_method: ResolutionMethod::Pattern,
            },
            Citation {
                kind: CitationKind::Internal,
                source_text: "第五条".into(),
                byte_offset: 3,
                target_law_id: None,
                target_law_name: None,
                target_article_number: None,
                target_paragraph: None,
                confidence: 0.8,
                resolution_method: ResolutionMethod::Pattern,
            },
        ];
        dedup_by_offset_and_text(&mut citations);
        assert_eq!(citations.len(), 1);
    }
}
