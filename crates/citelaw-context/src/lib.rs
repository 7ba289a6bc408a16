//! citelaw-context: per-document mutable state for resolving citations
//! whose target depends on what came before — `前条`, `同法`, `新法`.
//!
//! A [`DocumentContext`] belongs to exactly one worker processing exactly
//! one statute; it is never shared across documents or threads. The only
//! thing a detection pass treats as shared, read-only state is the law
//! dictionary, which lives in `citelaw-dict`.

use std::collections::VecDeque;

use citelaw_core::numeral::ArticleLabel;
use citelaw_core::LawId;
use indexmap::IndexMap;

/// How many trailing mentions of laws or articles are retained for
/// antecedent resolution. Older mentions fall off the back.
const RECENT_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RecentLaw {
    pub law_id: LawId,
    pub law_name: String,
    pub byte_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentArticle {
    pub label: ArticleLabel,
    pub byte_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub text: String,
    pub byte_offset: usize,
}

/// The six relative-position phrases the context tracker resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativePhrase {
    PrecedingArticle,
    FollowingArticle,
    PrecedingParagraph,
    FollowingParagraph,
    /// `前二項`/`前三項`: back up `n` paragraphs from the current one.
    PrecedingNParagraphs(u32),
    /// `前各項`: every paragraph before the current one.
    AllPrecedingParagraphs,
    /// `前条第<k>項`: paragraph `k` of the preceding article.
    PrecedingArticleParagraph(u32),
}

/// The resolved target of a [`RelativePhrase`]. `all_preceding` is set only
/// for [`RelativePhrase::AllPrecedingParagraphs`], which has no single
/// paragraph number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeResolution {
    pub article_number: Option<u32>,
    pub paragraph_number: Option<u32>,
    pub all_preceding: bool,
}

/// Per-document state mutated synchronously as the detector scans an
/// article's text left-to-right.
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    current_law_id: Option<LawId>,
    current_law_name: Option<String>,
    current_article: Option<ArticleLabel>,
    current_paragraph: u32,
    recent_laws: VecDeque<RecentLaw>,
    recent_articles: VecDeque<RecentArticle>,
    definitions: IndexMap<String, Definition>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self {
            current_paragraph: 1,
            ..Default::default()
        }
    }

    /// Resets context at the start of a new statute. Definitions and
    /// recent-mention history do not carry over from a previous document.
    pub fn enter_document(&mut self, law_id: LawId, law_name: impl Into<String>) {
        *self = Self::new();
        self.current_law_id = Some(law_id);
        self.current_law_name = Some(law_name.into());
    }

    pub fn enter_article(&mut self, label: ArticleLabel) {
        self.current_article = Some(label);
        self.current_paragraph = 1;
    }

    pub fn enter_paragraph(&mut self, n: u32) {
        self.current_paragraph = n.max(1);
    }

    pub fn current_law_id(&self) -> Option<&LawId> {
        self.current_law_id.as_ref()
    }

    pub fn current_law_name(&self) -> Option<&str> {
        self.current_law_name.as_deref()
    }

    pub fn current_article(&self) -> Option<ArticleLabel> {
        self.current_article
    }

    pub fn current_paragraph(&self) -> u32 {
        self.current_paragraph
    }

    /// Records a law mention, most-recent-first, dropping the oldest entry
    /// past the retention cap.
    pub fn note_law_mention(&mut self, law_id: LawId, law_name: impl Into<String>, byte_offset: usize) {
        self.recent_laws.push_front(RecentLaw {
            law_id,
            law_name: law_name.into(),
            byte_offset,
        });
        self.recent_laws.truncate(RECENT_CAPACITY);
    }

    /// Records an article mention (e.g. a `前条` match), so a later `同条`
    /// in the same article can bind to the article that was actually
    /// under discussion rather than the lexically enclosing one.
    pub fn note_article_mention(&mut self, label: ArticleLabel, byte_offset: usize) {
        self.recent_articles.push_front(RecentArticle { label, byte_offset });
        self.recent_articles.truncate(RECENT_CAPACITY);
    }

    /// Registers a term definition. Monotonic: a term already defined
    /// keeps its first definition.
    pub fn define_term(&mut self, term: impl Into<String>, definition: impl Into<String>, byte_offset: usize) {
        self.definitions.entry(term.into()).or_insert(Definition {
            text: definition.into(),
            byte_offset,
        });
    }

    pub fn lookup_definition(&self, term: &str) -> Option<&Definition> {
        self.definitions.get(term)
    }

    /// The nearest law mention strictly before `before_offset` — how
    /// `同法`/`当該X法` bind to an antecedent.
    pub fn most_recent_law(&self, before_offset: usize) -> Option<(&LawId, &str)> {
        self.recent_laws
            .iter()
            .find(|l| l.byte_offset < before_offset)
            .map(|l| (&l.law_id, l.law_name.as_str()))
    }

    /// The nearest article mention strictly before `before_offset` — how
    /// `同条` binds to an antecedent `前条`/`次条` rather than always
    /// resolving to the enclosing article.
    pub fn most_recent_article(&self, before_offset: usize) -> Option<ArticleLabel> {
        self.recent_articles
            .iter()
            .find(|a| a.byte_offset < before_offset)
            .map(|a| a.label)
    }

    /// Resolves a relative-position phrase against the current article
    /// and paragraph. Returns `None` only when there is no current
    /// article to resolve against (e.g. called before `enter_article`).
    pub fn resolve_relative(&self, phrase: RelativePhrase) -> Option<RelativeResolution> {
        let article = self.current_article?;
        let paragraph = self.current_paragraph;

        Some(match phrase {
            RelativePhrase::PrecedingArticle => RelativeResolution {
                article_number: Some(article.preceding().main),
                paragraph_number: None,
                all_preceding: false,
            },
            RelativePhrase::FollowingArticle => RelativeResolution {
                article_number: Some(article.following().main),
                paragraph_number: None,
                all_preceding: false,
            },
            RelativePhrase::PrecedingParagraph => RelativeResolution {
                article_number: Some(article.main),
                paragraph_number: Some(paragraph.saturating_sub(1).max(1)),
                all_preceding: false,
            },
            RelativePhrase::FollowingParagraph => RelativeResolution {
                article_number: Some(article.main),
                paragraph_number: Some(paragraph.saturating_add(1)),
                all_preceding: false,
            },
            RelativePhrase::PrecedingNParagraphs(n) => RelativeResolution {
                article_number: Some(article.main),
                paragraph_number: Some(paragraph.saturating_sub(n).max(1)),
                all_preceding: false,
            },
            RelativePhrase::AllPrecedingParagraphs => RelativeResolution {
                article_number: Some(article.main),
                paragraph_number: None,
                all_preceding: true,
            },
            RelativePhrase::PrecedingArticleParagraph(k) => RelativeResolution {
                article_number: Some(article.preceding().main),
                paragraph_number: Some(k.max(1)),
                all_preceding: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_at(article: u32, paragraph: u32) -> DocumentContext {
        let mut ctx = DocumentContext::new();
        ctx.enter_document(LawId::new("1"), "テスト法");
        ctx.enter_article(ArticleLabel::new(article));
        ctx.enter_paragraph(paragraph);
        ctx
    }

    #[test]
    fn preceding_article_resolves() {
        let ctx = ctx_at(15, 1);
        let r = ctx.resolve_relative(RelativePhrase::PrecedingArticle).unwrap();
        assert_eq!(r.article_number, Some(14));
        assert_eq!(r.paragraph_number, None);
    }

    #[test]
    fn preceding_article_clamps_at_one() {
        let ctx = ctx_at(1, 1);
        let r = ctx.resolve_relative(RelativePhrase::PrecedingArticle).unwrap();
        assert_eq!(r.article_number, Some(1));
    }

    #[test]
    fn preceding_article_paragraph_k() {
        let ctx = ctx_at(15, 1);
        let r = ctx
            .resolve_relative(RelativePhrase::PrecedingArticleParagraph(2))
            .unwrap();
        assert_eq!(r.article_number, Some(14));
        assert_eq!(r.paragraph_number, Some(2));
    }

    #[test]
    fn no_current_article_returns_none() {
        let ctx = DocumentContext::new();
        assert!(ctx.resolve_relative(RelativePhrase::PrecedingArticle).is_none());
    }

    #[test]
    fn most_recent_law_binds_to_nearest_antecedent() {
        let mut ctx = DocumentContext::new();
        ctx.enter_document(LawId::new("1"), "現行法");
        ctx.note_law_mention(LawId::new("A"), "民法", 10);
        ctx.note_law_mention(LawId::new("B"), "商法", 50);
        assert_eq!(ctx.most_recent_law(100).map(|(id, _)| id.clone()), Some(LawId::new("B")));
        assert_eq!(ctx.most_recent_law(20).map(|(id, _)| id.clone()), Some(LawId::new("A")));
        assert!(ctx.most_recent_law(5).is_none());
    }

    #[test]
    fn recent_laws_are_bounded() {
        let mut ctx = DocumentContext::new();
        ctx.enter_document(LawId::new("1"), "現行法");
        for i in 0..10 {
            ctx.note_law_mention(LawId::new(i.to_string()), format!("法{i}"), i * 10);
        }
        assert_eq!(ctx.recent_laws.len(), RECENT_CAPACITY);
        assert_eq!(ctx.most_recent_law(1000).map(|(id, _)| id.clone()), Some(LawId::new("9")));
    }

    #[test]
    fn same_article_binds_to_most_recent_mention_not_enclosing_article() {
        // Scenario: current article is 15, but "前条" mentioned article 14
        // earlier in the text; a later "同条" should bind to 14.
        let mut ctx = ctx_at(15, 1);
        ctx.note_article_mention(ArticleLabel::new(14), 5);
        assert_eq!(ctx.most_recent_article(50), Some(ArticleLabel::new(14)));
    }

    #[test]
    fn definitions_are_monotonic() {
        let mut ctx = DocumentContext::new();
        ctx.define_term("新法", "改正後の本法", 10);
        ctx.define_term("新法", "別の定義", 20);
        assert_eq!(ctx.lookup_definition("新法").unwrap().text, "改正後の本法");
        assert_eq!(ctx.lookup_definition("新法").unwrap().byte_offset, 10);
    }
}
