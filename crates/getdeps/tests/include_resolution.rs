use std::fs;
use std::path::{Path, PathBuf};

use getdeps::Error;
use getdeps::config::{Config, MAX_INCLUDE_DEPTH, Setting, merge_configs, resolve, resolve_file};

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).expect("write fixture");
}

#[test]
fn later_includes_and_top_level_fields_win() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path();
    write(
        dir,
        "a.json",
        r#"{"kernel":{"git":[{"label":"linux","url":"https://a/linux.git","branch":"v5.4","hash":"aaa"}]}}"#,
    );
    write(
        dir,
        "b.json",
        r#"{"includes":["a.json"],"kernel":{"git":[{"label":"linux","branch":"v5.10"}]},
            "initramfs":{"untar":[{"label":"go","url":"https://b/go.tar.gz","hash":"sha256:bb"}]}}"#,
    );
    write(
        dir,
        "c.json",
        r#"{"kernel":{"git":[{"label":"linux","hash":"ccc"},{"label":"tools","url":"https://c/tools.git"}]}}"#,
    );
    let top = r#"{"includes":["b.json","c.json"],"kernel":{"git":[{"label":"linux","url":"https://d/linux.git"}]}}"#;
    write(dir, "top.json", top);

    let got = resolve_file(&dir.join("top.json"), dir).expect("resolve");

    let load = |name: &str| Config::parse(&fs::read(dir.join(name)).expect("read")).expect("parse");
    let mut b = load("b.json");
    b.includes.clear();
    let a_then_b = merge_configs(&merge_configs(&Config::default(), &load("a.json")).expect("a"), &b)
        .expect("b");
    let with_c = merge_configs(&a_then_b, &load("c.json")).expect("c");
    let expected = merge_configs(&with_c, &Config::parse(top.as_bytes()).expect("top")).expect("d");
    assert_eq!(got, expected);

    let linux = &got.kernel.git[0];
    assert_eq!(linux.url, "https://d/linux.git");
    assert_eq!(linux.branch, Setting::Value("v5.10".into()));
    assert_eq!(linux.hash, Setting::Value("ccc".into()));
    assert_eq!(got.kernel.git[1].label, "tools");
    assert_eq!(got.initramfs.untar[0].hash, "sha256:bb");
    assert!(got.includes.is_empty());
}

#[test]
fn nested_override_clears_pinned_hash() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path();
    write(
        dir,
        "base.json",
        r#"{"coreboot":{"git":[{"label":"coreboot","url":"https://review.coreboot.org/coreboot","branch":"master","hash":"0123abcd"}]}}"#,
    );
    write(dir, "mid.json", r#"{"includes":["base.json"]}"#);
    let data = br#"{"includes":["mid.json"],"coreboot":{"git":[{"label":"coreboot","hash":""}]}}"#;

    let got = resolve(data, dir).expect("resolve");
    assert_eq!(got.coreboot.git.len(), 1);
    assert_eq!(got.coreboot.git[0].branch, Setting::Value("master".into()));
    assert!(got.coreboot.git[0].hash.is_unset());
}

#[test]
fn includes_resolve_against_base_dir_at_every_level() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path();
    fs::create_dir_all(dir.join("boards")).expect("mkdir");
    write(
        dir,
        "common.json",
        r#"{"initramfs":{"files":{"label":"blobs","dest":"fw","filelist":[{"url":"https://x/a.bin"}]}}}"#,
    );
    // Relative to the base dir, not to boards/.
    write(&dir.join("boards"), "board.json", r#"{"includes":["common.json"]}"#);

    let got = resolve(br#"{"includes":["boards/board.json"]}"#, dir).expect("resolve");
    let files = got.initramfs.files.expect("files");
    assert_eq!(files.label, "blobs");
    assert_eq!(files.filelist.len(), 1);
}

#[test]
fn cyclic_includes_hit_the_depth_bound() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path();
    write(dir, "loop.json", r#"{"includes":["loop.json"]}"#);

    let err = resolve_file(&dir.join("loop.json"), dir).expect_err("cycle must fail");
    assert!(matches!(err.root(), Error::RecursionLimit(MAX_INCLUDE_DEPTH)), "{err}");
    assert!(err.to_string().contains("loop.json"), "{err}");
}

#[test]
fn cycle_on_a_small_stack_still_reports_the_limit() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().to_path_buf();
    write(&dir, "a.json", r#"{"includes":["b.json"]}"#);
    write(&dir, "b.json", r#"{"includes":["a.json"]}"#);

    let handle = std::thread::Builder::new()
        .stack_size(512 * 1024)
        .spawn(move || resolve_file(&dir.join("a.json"), &dir))
        .expect("spawn");
    let err = handle.join().expect("join").expect_err("cycle must fail");
    assert!(matches!(err.root(), Error::RecursionLimit(_)), "{err}");
}

// doc1.json includes doc2.json and so on; the last one includes nothing.
fn write_chain(dir: &Path, len: usize) -> PathBuf {
    for i in 1..=len {
        let body = if i == len {
            format!(r#"{{"kernel":{{"untar":[{{"label":"doc{i}","url":"https://x/{i}.tar.gz"}}]}}}}"#)
        } else {
            format!(r#"{{"includes":["doc{}.json"]}}"#, i + 1)
        };
        write(dir, &format!("doc{i}.json"), &body);
    }
    dir.join("doc1.json")
}

#[test]
fn nesting_up_to_the_bound_resolves() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = write_chain(tmp.path(), MAX_INCLUDE_DEPTH);
    let got = resolve_file(&root, tmp.path()).expect("512 documents deep is allowed");
    assert_eq!(got.kernel.untar[0].label, format!("doc{MAX_INCLUDE_DEPTH}"));
}

#[test]
fn nesting_one_past_the_bound_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = write_chain(tmp.path(), MAX_INCLUDE_DEPTH + 1);
    let err = resolve_file(&root, tmp.path()).expect_err("513 documents deep");
    assert!(matches!(err.root(), Error::RecursionLimit(MAX_INCLUDE_DEPTH)), "{err}");
    assert!(err.to_string().contains("doc513.json"), "{err}");
}

#[test]
fn malformed_include_reports_parse_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(tmp.path(), "bad.json", "{not json");
    let err = resolve(br#"{"includes":["bad.json"]}"#, tmp.path()).expect_err("bad include");
    assert!(matches!(err.root(), Error::Parse(_)), "{err}");
    assert!(err.to_string().contains("bad.json"), "{err}");
}

#[test]
fn nested_include_error_names_the_failing_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(tmp.path(), "mid.json", r#"{"includes":["gone.json"]}"#);
    let err = resolve(br#"{"includes":["mid.json"]}"#, tmp.path()).expect_err("missing");
    assert!(matches!(err.root(), Error::Io { .. }), "{err}");
    assert!(err.to_string().contains("gone.json"), "{err}");
}

#[test]
fn unlabeled_entry_in_include_names_the_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(
        tmp.path(),
        "board.json",
        r#"{"coreboot":{"git":[{"url":"https://review.coreboot.org/coreboot"}]}}"#,
    );
    let err = resolve(br#"{"includes":["board.json"]}"#, tmp.path()).expect_err("empty label");
    assert!(matches!(err.root(), Error::Validation(_)), "{err}");
    assert!(err.to_string().contains("board.json"), "{err}");
}
