//! Diff engine: merges the record sets of two binaries by name and computes
//! size deltas, orderings and aggregate totals.
//!
//! Direction is fixed throughout: the first binary is `old` (baseline), the
//! second is `new`, and every delta is `new - old`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Section, Symbol, SymbolKind};

/// Unanchored name filter. An empty pattern matches everything.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    regex: Option<Regex>,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        if pattern.is_empty() {
            return Ok(Self::match_all());
        }
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex: Some(regex) })
    }

    pub fn match_all() -> Self {
        Self { regex: None }
    }

    pub fn is_match_all(&self) -> bool {
        self.regex.is_none()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(name))
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_ref().map_or("", Regex::as_str)
    }
}

/// Relative change in percent. `Undefined` when the old size is zero or absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum Percent {
    Defined(f64),
    Undefined,
}

impl Percent {
    /// `100 * (new / old - 1)`.
    pub fn change(old: u64, new: u64) -> Self {
        if old == 0 {
            Percent::Undefined
        } else {
            Percent::Defined(100.0 * (new as f64 / old as f64 - 1.0))
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Percent::Defined(v) => Some(v),
            Percent::Undefined => None,
        }
    }

    /// Total order: defined values by `f64::total_cmp`, `Undefined` last.
    pub fn total_cmp(&self, other: &Percent) -> Ordering {
        match (self, other) {
            (Percent::Defined(a), Percent::Defined(b)) => a.total_cmp(b),
            (Percent::Defined(_), Percent::Undefined) => Ordering::Less,
            (Percent::Undefined, Percent::Defined(_)) => Ordering::Greater,
            (Percent::Undefined, Percent::Undefined) => Ordering::Equal,
        }
    }
}

impl From<Percent> for Option<f64> {
    fn from(p: Percent) -> Self {
        p.value()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percent::Defined(v) => write!(f, "{v:.2}%"),
            Percent::Undefined => f.write_str("n/a"),
        }
    }
}

/// Anything with a byte size that can be diffed by name.
pub trait SizedRecord {
    fn size(&self) -> u64;
}

impl SizedRecord for Symbol {
    fn size(&self) -> u64 {
        self.size
    }
}

impl SizedRecord for Section {
    fn size(&self) -> u64 {
        self.size
    }
}

/// Size change of one named entry. At least one side is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryDiff {
    pub name: String,
    pub old: Option<u64>,
    pub new: Option<u64>,
    pub delta: i64,
    pub percent: Percent,
}

impl EntryDiff {
    pub fn old_size(&self) -> u64 {
        self.old.unwrap_or(0)
    }

    pub fn new_size(&self) -> u64 {
        self.new.unwrap_or(0)
    }

    pub fn is_added(&self) -> bool {
        self.old.is_none()
    }

    pub fn is_removed(&self) -> bool {
        self.new.is_none()
    }
}

fn signed_delta(old: u64, new: u64) -> i64 {
    new.wrapping_sub(old) as i64
}

/// Diff one entry, or `None` when its size did not change.
///
/// The percent is only defined when the entry exists on both sides.
pub fn diff_entry(name: &str, old: Option<u64>, new: Option<u64>) -> Option<EntryDiff> {
    let (old_size, new_size) = (old.unwrap_or(0), new.unwrap_or(0));
    if old_size == new_size {
        return None;
    }
    let percent = match (old, new) {
        (Some(_), Some(_)) => Percent::change(old_size, new_size),
        _ => Percent::Undefined,
    };
    Some(EntryDiff {
        name: name.to_string(),
        old,
        new,
        delta: signed_delta(old_size, new_size),
        percent,
    })
}

/// Sorted, deduplicated union of the names of both maps.
pub fn union_names<A, B>(a: &BTreeMap<String, A>, b: &BTreeMap<String, B>) -> Vec<String> {
    let names: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    names.into_iter().cloned().collect()
}

/// Names retained by `filter`, order preserved.
pub fn filter_by_pattern(names: Vec<String>, filter: &NameFilter) -> Vec<String> {
    if filter.is_match_all() {
        return names;
    }
    names.into_iter().filter(|n| filter.is_match(n)).collect()
}

/// Ordering of diff entries. Each policy is applied as a stable pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Lexicographic by name; always the base order.
    Name,
    /// Ascending by the new size.
    NewSize,
    /// Ascending by delta, ties by percent.
    SizeDelta,
    /// Ascending by percent, ties by delta.
    PercentDelta,
}

impl SortPolicy {
    pub fn compare(self, a: &EntryDiff, b: &EntryDiff) -> Ordering {
        match self {
            SortPolicy::Name => a.name.cmp(&b.name),
            SortPolicy::NewSize => a.new_size().cmp(&b.new_size()),
            SortPolicy::SizeDelta => {
                a.delta.cmp(&b.delta).then_with(|| a.percent.total_cmp(&b.percent))
            }
            SortPolicy::PercentDelta => {
                a.percent.total_cmp(&b.percent).then_with(|| a.delta.cmp(&b.delta))
            }
        }
    }
}

/// Sort by name, then apply each policy in turn as a stable pass.
pub fn sort_entries(entries: &mut [EntryDiff], policies: &[SortPolicy]) {
    entries.sort_by(|a, b| SortPolicy::Name.compare(a, b));
    for policy in policies {
        entries.sort_by(|a, b| policy.compare(a, b));
    }
}

/// Options for [`diff_tables`].
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions<'a> {
    pub filter: &'a NameFilter,
    pub sort: &'a [SortPolicy],
    /// Keep only entries whose new size is strictly greater than the old.
    pub only_larger: bool,
}

/// Merge two record maps by name and return the changed entries in the
/// requested order.
pub fn diff_tables<A, B>(
    old: &BTreeMap<String, A>,
    new: &BTreeMap<String, B>,
    options: &DiffOptions<'_>,
) -> Vec<EntryDiff>
where
    A: SizedRecord,
    B: SizedRecord,
{
    let names = filter_by_pattern(union_names(old, new), options.filter);
    let mut entries: Vec<EntryDiff> = names
        .iter()
        .filter_map(|name| {
            diff_entry(name, old.get(name).map(A::size), new.get(name).map(B::size))
        })
        .filter(|entry| !options.only_larger || entry.new_size() > entry.old_size())
        .collect();
    sort_entries(&mut entries, options.sort);
    entries
}

/// Old/new totals with their delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeTotals {
    pub old: u64,
    pub new: u64,
    pub delta: i64,
    pub percent: Percent,
}

impl SizeTotals {
    pub fn new(old: u64, new: u64) -> Self {
        Self { old, new, delta: signed_delta(old, new), percent: Percent::change(old, new) }
    }
}

/// Totals over a list of diff entries (the `total` row of a table).
pub fn total_of(entries: &[EntryDiff]) -> SizeTotals {
    let (old, new) = entries
        .iter()
        .fold((0u64, 0u64), |(o, n), e| (o + e.old_size(), n + e.new_size()));
    SizeTotals::new(old, new)
}

/// Size change of one symbol kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KindRow {
    pub kind: SymbolKind,
    pub totals: SizeTotals,
}

/// Per-kind summary. Kinds that did not change are left out of `rows` but
/// always count towards `total`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindSummary {
    pub rows: Vec<KindRow>,
    pub total: SizeTotals,
}

pub fn summarize_kinds(
    old: &BTreeMap<SymbolKind, u64>,
    new: &BTreeMap<SymbolKind, u64>,
) -> KindSummary {
    let kinds: BTreeSet<SymbolKind> = old.keys().chain(new.keys()).copied().collect();
    let mut rows = Vec::new();
    let (mut old_total, mut new_total) = (0u64, 0u64);
    for kind in kinds {
        let old_size = old.get(&kind).copied().unwrap_or(0);
        let new_size = new.get(&kind).copied().unwrap_or(0);
        old_total += old_size;
        new_total += new_size;
        if old_size != new_size {
            rows.push(KindRow { kind, totals: SizeTotals::new(old_size, new_size) });
        }
    }
    KindSummary { rows, total: SizeTotals::new(old_total, new_total) }
}
