use std::collections::BTreeMap;

use bincmp_core::diff::{
    diff_entry, diff_tables, filter_by_pattern, sort_entries, summarize_kinds, total_of,
    union_names, DiffOptions, NameFilter, Percent, SortPolicy,
};
use bincmp_core::error::ConfigError;
use bincmp_core::model::{Symbol, SymbolKind};

fn table(entries: &[(&str, u64)]) -> BTreeMap<String, Symbol> {
    entries
        .iter()
        .map(|(name, size)| {
            (name.to_string(), Symbol::new(*name, SymbolKind::GlobalText, *size, 0))
        })
        .collect()
}

fn names(entries: &[bincmp_core::diff::EntryDiff]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn union_is_sorted_deduplicated_and_commutative() {
    let a = table(&[("b", 1), ("a", 1)]);
    let b = table(&[("c", 1), ("a", 2)]);
    assert_eq!(union_names(&a, &b), vec!["a", "b", "c"]);
    assert_eq!(union_names(&a, &b), union_names(&b, &a));
    assert_eq!(union_names(&a, &a), vec!["a", "b"]);
}

#[test]
fn unchanged_entries_are_suppressed() {
    assert!(diff_entry("same", Some(10), Some(10)).is_none());
    assert!(diff_entry("empty", Some(0), None).is_none());
    assert!(diff_entry("empty", None, Some(0)).is_none());
}

#[test]
fn removed_entry_has_negative_delta_and_undefined_percent() {
    let old = table(&[("foo", 100)]);
    let new = table(&[]);
    let filter = NameFilter::match_all();
    let entries = diff_tables(
        &old,
        &new,
        &DiffOptions { filter: &filter, sort: &[SortPolicy::SizeDelta], only_larger: false },
    );
    assert_eq!(entries.len(), 1);
    let foo = &entries[0];
    assert_eq!(foo.delta, -100);
    assert_eq!(foo.old, Some(100));
    assert_eq!(foo.new, None);
    assert!(foo.is_removed());
    assert_eq!(foo.percent, Percent::Undefined);
}

#[test]
fn added_entry_has_undefined_percent() {
    let diff = diff_entry("bar", None, Some(64)).unwrap();
    assert_eq!(diff.delta, 64);
    assert_eq!(diff.percent, Percent::Undefined);
    assert!(diff.is_added());
    assert_eq!(diff.percent.to_string(), "n/a");
}

#[test]
fn percent_formats_with_two_decimals() {
    assert_eq!(Percent::change(200, 250).to_string(), "25.00%");
    assert_eq!(Percent::change(3, 2).to_string(), "-33.33%");
    assert_eq!(Percent::change(0, 5), Percent::Undefined);
}

#[test]
fn percent_serializes_as_number_or_null() {
    assert_eq!(serde_json::to_string(&Percent::change(4, 5)).unwrap(), "25.0");
    assert_eq!(serde_json::to_string(&Percent::Undefined).unwrap(), "null");
}

#[test]
fn undefined_percent_sorts_after_defined() {
    let mut entries = vec![
        diff_entry("new_fn", None, Some(10)).unwrap(),
        diff_entry("grown", Some(10), Some(20)).unwrap(),
        diff_entry("shrunk", Some(20), Some(10)).unwrap(),
    ];
    sort_entries(&mut entries, &[SortPolicy::PercentDelta]);
    assert_eq!(names(&entries), vec!["shrunk", "grown", "new_fn"]);
}

#[test]
fn ties_fall_back_to_name_order() {
    let old = table(&[("zeta", 10), ("alpha", 10), ("mid", 10)]);
    let new = table(&[("zeta", 20), ("alpha", 20), ("mid", 20)]);
    let filter = NameFilter::match_all();
    let entries = diff_tables(
        &old,
        &new,
        &DiffOptions { filter: &filter, sort: &[SortPolicy::SizeDelta], only_larger: false },
    );
    assert_eq!(names(&entries), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn sort_policies_apply_in_order() {
    let old = table(&[("a", 10), ("b", 100), ("c", 50)]);
    let new = table(&[("a", 30), ("b", 90), ("c", 60)]);
    let filter = NameFilter::match_all();
    let run = |sort: &[SortPolicy]| {
        let entries = diff_tables(
            &old,
            &new,
            &DiffOptions { filter: &filter, sort, only_larger: false },
        );
        names(&entries).into_iter().map(str::to_string).collect::<Vec<_>>()
    };

    assert_eq!(run(&[SortPolicy::Name]), vec!["a", "b", "c"]);
    assert_eq!(run(&[SortPolicy::NewSize]), vec!["a", "c", "b"]);
    assert_eq!(run(&[SortPolicy::SizeDelta]), vec!["b", "c", "a"]);
    assert_eq!(run(&[SortPolicy::PercentDelta]), vec!["b", "c", "a"]);
    // The last pass decides, earlier passes break its ties.
    assert_eq!(run(&[SortPolicy::SizeDelta, SortPolicy::NewSize]), vec!["a", "c", "b"]);
}

#[test]
fn equal_deltas_order_by_percent() {
    let old = table(&[("a", 10), ("b", 100)]);
    let new = table(&[("a", 20), ("b", 110)]);
    let filter = NameFilter::match_all();
    let entries = diff_tables(
        &old,
        &new,
        &DiffOptions { filter: &filter, sort: &[SortPolicy::SizeDelta], only_larger: false },
    );
    assert_eq!(names(&entries), vec!["b", "a"]);
}

#[test]
fn equal_percents_order_by_delta() {
    let old = table(&[("x", 10), ("y", 5)]);
    let new = table(&[("x", 20), ("y", 10)]);
    let filter = NameFilter::match_all();
    let entries = diff_tables(
        &old,
        &new,
        &DiffOptions { filter: &filter, sort: &[SortPolicy::PercentDelta], only_larger: false },
    );
    assert_eq!(names(&entries), vec!["y", "x"]);
}

#[test]
fn only_larger_keeps_growth_including_additions() {
    let old = table(&[("grew", 10), ("shrank", 10), ("gone", 5)]);
    let new = table(&[("grew", 11), ("shrank", 9), ("added", 3)]);
    let filter = NameFilter::match_all();
    let entries = diff_tables(
        &old,
        &new,
        &DiffOptions { filter: &filter, sort: &[SortPolicy::Name], only_larger: true },
    );
    assert_eq!(names(&entries), vec!["added", "grew"]);
}

#[test]
fn pattern_matches_anywhere_in_name() {
    let filter = NameFilter::new("http2").unwrap();
    let kept = filter_by_pattern(
        vec!["net/http2.pair".into(), "runtime.main".into(), "x.http2y".into()],
        &filter,
    );
    assert_eq!(kept, vec!["net/http2.pair", "x.http2y"]);
    assert_eq!(filter.pattern(), "http2");

    let all = NameFilter::new("").unwrap();
    assert!(all.is_match_all());
    assert!(all.is_match("anything"));
}

#[test]
fn invalid_pattern_is_rejected() {
    match NameFilter::new("(unclosed") {
        Err(ConfigError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
        other => panic!("expected invalid pattern, got {other:?}"),
    }
}

#[test]
fn totals_cover_reported_entries() {
    let entries = vec![
        diff_entry("a", Some(10), Some(60)).unwrap(),
        diff_entry("b", None, Some(15)).unwrap(),
        diff_entry("c", Some(40), None).unwrap(),
    ];
    let total = total_of(&entries);
    assert_eq!(total.old, 50);
    assert_eq!(total.new, 75);
    assert_eq!(total.delta, 25);
    assert_eq!(total.percent, Percent::Defined(50.0));

    let empty = total_of(&[]);
    assert_eq!((empty.old, empty.new, empty.delta), (0, 0, 0));
    assert_eq!(empty.percent, Percent::Undefined);
}

#[test]
fn kind_summary_omits_unchanged_kinds_but_totals_them() {
    let old = BTreeMap::from([
        (SymbolKind::GlobalText, 100),
        (SymbolKind::GlobalData, 40),
        (SymbolKind::Bss, 8),
    ]);
    let new = BTreeMap::from([
        (SymbolKind::GlobalText, 120),
        (SymbolKind::GlobalData, 40),
        (SymbolKind::ReadOnlyData, 16),
    ]);

    let summary = summarize_kinds(&old, &new);
    let kinds: Vec<SymbolKind> = summary.rows.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![SymbolKind::Bss, SymbolKind::GlobalText, SymbolKind::ReadOnlyData]);

    let bss = &summary.rows[0].totals;
    assert_eq!((bss.old, bss.new, bss.delta), (8, 0, -8));

    assert_eq!(summary.total.old, 148);
    assert_eq!(summary.total.new, 176);
    assert_eq!(summary.total.delta, 28);
}
