#![cfg(unix)]

mod common;

use std::fs;

use common::Workspace;
use predicates::prelude::*;

#[test]
fn no_arguments_prints_help_and_succeeds() {
    assert_cmd::cargo::cargo_bin_cmd!("bincmp")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn single_binary_prints_help_and_succeeds() {
    let ws = Workspace::new();
    ws.cmd()
        .arg(&ws.old)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("symbol name").not());
}

#[test]
fn missing_binary_is_fatal() {
    let ws = Workspace::new();
    ws.cmd()
        .arg(&ws.old)
        .arg(ws.path().join("does-not-exist"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Binary not found"));
}

#[test]
fn text_report_shows_symbol_and_section_tables() {
    let ws = Workspace::new();
    ws.compare()
        .assert()
        .success()
        .stdout(predicate::str::contains("binary\tdelta\told\tnew\tpercent"))
        .stdout(predicate::str::contains("app.new\t1\t10\t11\t10.00%"))
        .stdout(predicate::str::contains("runtime.prefetchnta\t10\t9\t19\t111.11%"))
        .stdout(predicate::str::contains("encoding/xml.second\t-8\t8\t\tn/a"))
        .stdout(predicate::str::contains("global bss\t32\t16\t48\t200.00%"))
        .stdout(predicate::str::contains("section name\tdelta\told\tnew\tpercent"))
        .stdout(predicate::str::contains(".text\t256\t70281\t70537\t"));
}

#[test]
fn default_order_is_by_delta() {
    let ws = Workspace::new();
    let output = ws.compare().assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    let removed = text.find("encoding/xml.second").unwrap();
    let grown = text.find("runtime.prefetchnta").unwrap();
    let added = text.find("main.added").unwrap();
    assert!(removed < grown && grown < added, "{text}");
}

#[test]
fn sort_by_name_is_alphabetical() {
    let ws = Workspace::new();
    let output =
        ws.compare().args(["--sort", "name"]).assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    let rows: Vec<&str> = text
        .lines()
        .skip_while(|l| !l.starts_with("symbol name"))
        .skip(1)
        .take(3)
        .map(|l| l.split('\t').next().unwrap())
        .collect();
    assert_eq!(rows, vec!["encoding/xml.second", "main.added", "runtime.prefetchnta"]);
}

#[test]
fn json_report_is_machine_readable() {
    let ws = Workspace::new();
    let output = ws.compare().arg("--json").assert().success().get_output().stdout.clone();
    let body: serde_json::Value = serde_json::from_slice(&output).expect("report json");

    assert_eq!(body["file"]["delta"], 1);
    let entries = body["symbols"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1]["name"], "runtime.prefetchnta");
    assert_eq!(entries[1]["kind"], "global_text");
    assert!(entries[2]["percent"].is_null());
    assert_eq!(body["sections"]["entries"][0]["name"], ".text");
}

#[test]
fn pattern_and_larger_filter_rows() {
    let ws = Workspace::new();
    ws.compare()
        .args(["--pattern", "^runtime\\.", "--larger"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runtime.prefetchnta"))
        .stdout(predicate::str::contains("main.added").not())
        .stdout(predicate::str::contains("section name").not());
}

#[test]
fn invalid_pattern_is_rejected() {
    let ws = Workspace::new();
    ws.compare()
        .args(["--pattern", "("])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid pattern"));
}

#[test]
fn sections_only_conflicts_with_disassembly() {
    let ws = Workspace::new();
    ws.compare()
        .args(["--no-symtab", "--disassemble"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("incompatible options"));
}

#[test]
fn sections_only_skips_symbol_table() {
    let ws = Workspace::new();
    // A broken nm proves the symbol table is never read.
    ws.tool("nm", "", "", 1);
    ws.compare()
        .arg("--no-symtab")
        .assert()
        .success()
        .stdout(predicate::str::contains("symbol name").not())
        .stdout(predicate::str::contains("kind\tdelta").not())
        .stdout(predicate::str::contains(".text\t256"));
}

#[test]
fn failing_provider_is_fatal() {
    let ws = Workspace::new();
    ws.tool("nm", "", "", 3);
    ws.compare().assert().failure().stderr(predicate::str::contains("nm exited"));
}

#[test]
fn disassembly_marks_changed_instructions() {
    let ws = Workspace::new();
    ws.tool(
        "nm",
        "0000000000401000 0000000000000013 T main.init.1\n",
        "0000000000401000 0000000000000014 T main.init.1\n",
        0,
    );
    ws.compare()
        .args(["--disassemble", "--exact"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main.init.1\t1\t17\t18\t"))
        .stdout(
            predicate::str::is_match(
                r"401000:    sub    \$0x48,%rsp\s+! 401000:    sub    \$0x58,%rsp",
            )
            .unwrap(),
        )
        .stdout(predicate::str::contains("(padding removed: 2 old, 2 new)"));
}

#[test]
fn config_file_supplies_defaults_and_flags_override() {
    let ws = Workspace::new();
    let config = ws.path().join("bincmp.yaml");
    fs::write(&config, "pattern: \"^encoding/\"\nsort: [name]\n").unwrap();

    ws.compare()
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("encoding/xml.second"))
        .stdout(predicate::str::contains("runtime.prefetchnta").not());

    ws.compare()
        .arg("--config")
        .arg(&config)
        .args(["--pattern", "prefetch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runtime.prefetchnta"))
        .stdout(predicate::str::contains("encoding/xml.second").not());
}

#[test]
fn verbose_flag_logs_to_stderr() {
    let ws = Workspace::new();
    ws.compare()
        .arg("-vv")
        .assert()
        .success()
        .stderr(predicate::str::contains("running"));
}
