//! Phase 1 of detection: scanning an article once for in-text term
//! definitions and registering each on first occurrence.

use citelaw_context::DocumentContext;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_AMENDMENT_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"この(?:法律|政令|省令|規則)による改正(?:前|後)の(?P<x>[^\s、。「」]+)（以下「(?P<t>[^」]+)」という。?）").unwrap()
});

static RE_GENERIC_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<x>[^\s、。「」]+)（以下(?:単に)?「(?P<t>[^」]+)」という。?）").unwrap()
});

static RE_ABBREVIATION_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<x>[^\s、。「」]+)（以下「(?P<t>[^」]+)」と略す。?）").unwrap()
});

static RE_SECTION_SCOPED_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"この(?:附則|規定|章|節|条)で、(?P<t>[^、]+)とは、(?P<d>.+?)をいい").unwrap()
});

static RE_QUOTED_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"「(?P<t>[^」]+)」とは、(?P<d>.+?)をいう").unwrap()
});

static RE_STATUTE_SCOPED_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"この(?:法律|政令|省令|規則)において「(?P<t>[^」]+)」とは、(?P<d>.+?)をいう").unwrap()
});

/// Runs every definition pattern over `text` and registers each hit into
/// `ctx` on first occurrence. Order matches the catalog so a term defined
/// by more than one pattern keeps the earliest (leftmost-scanned) value —
/// `DocumentContext::define_term` itself enforces the first-write-wins
/// rule regardless of scan order.
pub fn capture_definitions(text: &str, ctx: &mut DocumentContext) {
    for caps in RE_AMENDMENT_ALIAS.captures_iter(text) {
        let m = caps.get(0).unwrap();
        ctx.define_term(&caps["t"], &caps["x"], m.start());
    }
    for caps in RE_ABBREVIATION_ALIAS.captures_iter(text) {
        let m = caps.get(0).unwrap();
        ctx.define_term(&caps["t"], &caps["x"], m.start());
    }
    for caps in RE_GENERIC_ALIAS.captures_iter(text) {
        let m = caps.get(0).unwrap();
        ctx.define_term(&caps["t"], &caps["x"], m.start());
    }
    for caps in RE_STATUTE_SCOPED_DEFINITION.captures_iter(text) {
        let m = caps.get(0).unwrap();
        ctx.define_term(&caps["t"], &caps["d"], m.start());
    }
    for caps in RE_SECTION_SCOPED_DEFINITION.captures_iter(text) {
        let m = caps.get(0).unwrap();
        ctx.define_term(&caps["t"], &caps["d"], m.start());
    }
    for caps in RE_QUOTED_DEFINITION.captures_iter(text) {
        let m = caps.get(0).unwrap();
        ctx.define_term(&caps["t"], &caps["d"], m.start());
    }
}
