//! Abbreviation derivation: a fixed set of morphological rewrites applied
//! to a canonical title, plus a small table of well-known customary
//! abbreviations that are merged in regardless of what the rewrites
//! produce.

/// The well-known abbreviation table, merged in after the morphological
/// rewrites. First entry of a pair is the canonical title, the rest are
/// its customary short forms.
const KNOWN_ABBREVIATIONS: &[(&str, &[&str])] = &[
    ("民事訴訟法", &["民訴法", "民訴"]),
    ("刑事訴訟法", &["刑訴法", "刑訴"]),
    ("独立行政法人通則法", &["通則法"]),
    ("労働基準法", &["労基法"]),
    ("地方自治法", &["自治法"]),
];

/// Derives the candidate abbreviations for a canonical title by applying
/// the fixed rewrite table in order, then merging in any well-known
/// abbreviations for that exact title. Order is preserved and duplicates
/// are not produced twice.
pub fn derive_abbreviations(title: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push_unique = |s: String| {
        if !out.contains(&s) && s != title {
            out.push(s);
        }
    };

    if let Some(prefix) = title.strip_suffix("に関する特別措置法") {
        push_unique(format!("{prefix}特措法"));
    }
    if let Some(prefix) = title.strip_suffix("の特例に関する法律") {
        push_unique(format!("{prefix}特例法"));
    }
    if let Some(prefix) = title.strip_suffix("等に関する法律") {
        push_unique(format!("{prefix}等法"));
    }
    // This general rule must run after the more specific suffixes above,
    // since e.g. "...に関する特別措置法" also ends in "...法" but has
    // already been handled by a more specific rewrite.
    if let Some(prefix) = title.strip_suffix("に関する法律") {
        push_unique(format!("{prefix}法"));
    }

    if let Some((_, shorts)) = KNOWN_ABBREVIATIONS.iter().find(|(t, _)| *t == title) {
        for short in *shorts {
            push_unique((*short).to_string());
        }
    }

    out
}
