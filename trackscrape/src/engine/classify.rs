/*!
    Field classification for one track row.

    Play count, duration and sometimes the title are rendered with identical
    styling and no stable per-field selector, so they are told apart by the
    shape of their text. The heuristics are a rule table evaluated in fixed
    precedence order over labelled fragment sets; nothing here knows about
    any particular markup.
*/

use std::sync::OnceLock;

use regex::Regex;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const DEFAULT_STREAM_COUNT: &str = "0";
pub const DEFAULT_DURATION: &str = "0";

/// Text fragments collected from one row, grouped by where they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFragments {
    /// Texts of the ranked name selectors, in rank order.
    pub named: Vec<String>,
    /// Texts of every link in the row.
    pub links: Vec<String>,
    /// Texts of every text-bearing leaf in the row.
    pub leaves: Vec<String>,
    /// Same-styled small text cells, in document order.
    pub cells: Vec<String>,
}

impl RowFragments {
    fn set(&self, set: FragmentSet) -> &[String] {
        match set {
            FragmentSet::Named => &self.named,
            FragmentSet::Links => &self.links,
            FragmentSet::Leaves => &self.leaves,
            FragmentSet::Cells => &self.cells,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    StreamCount,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentSet {
    Named,
    Links,
    Leaves,
    Cells,
}

#[derive(Debug, Clone, Copy)]
enum Pick {
    /// First accepted fragment.
    First,
    /// Longest accepted fragment.
    Longest,
    /// The fragment `n` places from the end, if accepted.
    FromEnd(usize),
}

struct Rule {
    field: Field,
    set: FragmentSet,
    min_fragments: usize,
    accepts: fn(&str) -> bool,
    pick: Pick,
}

/// Precedence order: the first rule that resolves a field wins.
const RULES: &[Rule] = &[
    Rule {
        field: Field::Name,
        set: FragmentSet::Named,
        min_fragments: 1,
        accepts: is_label,
        pick: Pick::First,
    },
    Rule {
        field: Field::Name,
        set: FragmentSet::Links,
        min_fragments: 1,
        accepts: is_label,
        pick: Pick::First,
    },
    Rule {
        field: Field::Name,
        set: FragmentSet::Leaves,
        min_fragments: 1,
        accepts: is_plain_label,
        pick: Pick::Longest,
    },
    Rule {
        field: Field::Duration,
        set: FragmentSet::Cells,
        min_fragments: 1,
        accepts: is_duration,
        pick: Pick::First,
    },
    Rule {
        field: Field::Duration,
        set: FragmentSet::Cells,
        min_fragments: 2,
        accepts: is_present,
        pick: Pick::FromEnd(1),
    },
    Rule {
        field: Field::StreamCount,
        set: FragmentSet::Cells,
        min_fragments: 1,
        accepts: is_stream_count,
        pick: Pick::First,
    },
    Rule {
        field: Field::StreamCount,
        set: FragmentSet::Cells,
        min_fragments: 3,
        accepts: has_no_colon,
        pick: Pick::FromEnd(2),
    },
];

/// Result of classifying one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub name: String,
    pub stream_count: String,
    pub duration: String,
}

/**
    Assign row fragments to name, stream count and duration.

    A fragment already assigned to one field is never reused for another.
    Unresolved fields fall back to their sentinel defaults.
*/
pub fn classify(fragments: &RowFragments) -> Classification {
    let mut name: Option<String> = None;
    let mut stream_count: Option<String> = None;
    let mut duration: Option<String> = None;

    for rule in RULES {
        let slot = match rule.field {
            Field::Name => &name,
            Field::StreamCount => &stream_count,
            Field::Duration => &duration,
        };
        if slot.is_some() {
            continue;
        }

        let claimed: Vec<&str> = [&name, &stream_count, &duration]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .collect();

        let Some(value) = apply(rule, fragments.set(rule.set), &claimed) else {
            continue;
        };

        match rule.field {
            Field::Name => name = Some(value),
            Field::StreamCount => stream_count = Some(value),
            Field::Duration => duration = Some(value),
        }
    }

    Classification {
        name: name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        stream_count: stream_count.unwrap_or_else(|| DEFAULT_STREAM_COUNT.to_string()),
        duration: duration.unwrap_or_else(|| DEFAULT_DURATION.to_string()),
    }
}

fn apply(rule: &Rule, fragments: &[String], claimed: &[&str]) -> Option<String> {
    if fragments.len() < rule.min_fragments {
        return None;
    }

    let usable = |text: &&str| !claimed.contains(text) && (rule.accepts)(*text);

    let picked = match rule.pick {
        Pick::First => fragments.iter().map(|f| f.trim()).find(usable),
        Pick::Longest => fragments
            .iter()
            .map(|f| f.trim())
            .filter(usable)
            // First of equally long candidates wins.
            .fold(None, |best: Option<&str>, text| match best {
                Some(b) if b.chars().count() >= text.chars().count() => Some(b),
                _ => Some(text),
            }),
        Pick::FromEnd(n) => fragments
            .len()
            .checked_sub(n)
            .map(|i| fragments[i].trim())
            .filter(usable),
    };

    picked.map(ToString::to_string)
}

// ── Fragment predicates ─────────────────────────────────────────────────────

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+:\d+").unwrap())
}

fn count_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\d{1,3}(?:,\d{3})+|\d+)$").unwrap())
}

fn magnitude_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\d+(?:\.\d+)?\s?[KMB]$").unwrap())
}

fn digit_group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d,]*").unwrap())
}

fn numeric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$").unwrap())
}

/// The whole text is one number, like a rank or a plain count.
pub fn is_numeric(text: &str) -> bool {
    numeric_regex().is_match(text.trim())
}

fn is_present(text: &str) -> bool {
    !text.is_empty()
}

fn has_no_colon(text: &str) -> bool {
    !text.is_empty() && !text.contains(':')
}

fn is_label(text: &str) -> bool {
    !text.is_empty() && !is_numeric(text)
}

/// A label that cannot be mistaken for a count or a duration.
fn is_plain_label(text: &str) -> bool {
    text.chars().count() > 2
        && !is_numeric(text)
        && !text.contains(':')
        && !digit_group_regex().is_match(text)
}

pub fn is_duration(text: &str) -> bool {
    duration_regex().is_match(text)
}

pub fn is_stream_count(text: &str) -> bool {
    text.chars().count() > 1
        && !text.contains(':')
        && (count_regex().is_match(text) || magnitude_regex().is_match(text))
}
