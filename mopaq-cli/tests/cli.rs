//! End-to-end tests driving the `mpq` binary through its CLI surface.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn mpq() -> Command {
    Command::cargo_bin("mpq").unwrap()
}

#[test]
fn test_cli_help() {
    mpq()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Create a new archive"));
}

#[test]
fn test_create_from_directory_and_list() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("cats.txt"), "meow meow meow").unwrap();
    fs::write(source.join("dogs.txt"), "woof woof woof woof").unwrap();

    mpq()
        .arg("create")
        .arg(&source)
        .arg("-o")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created archive"));

    assert!(archive.exists());

    mpq()
        .arg("list")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("cats.txt"))
        .stdout(predicate::str::contains("dogs.txt"));
}

#[test]
fn test_create_v2_and_info() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("bytes.bin"), vec![7u8; 4096 * 3]).unwrap();

    mpq()
        .arg("create")
        .arg(&source)
        .arg("-o")
        .arg(&archive)
        .arg("-v")
        .arg("2")
        .assert()
        .success();

    mpq()
        .arg("info")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("V2"))
        .stdout(predicate::str::contains("File count"));

    mpq()
        .arg("info")
        .arg(&archive)
        .arg("-p")
        .arg("file-count")
        .assert()
        .success()
        .stdout(predicate::str::contains("3")); // bytes.bin, (listfile), (attributes)
}

#[test]
fn test_read_and_extract_round_trip() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");
    let extract_dir = temp.path().join("out");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("hello.txt"), "hello mpq").unwrap();

    mpq().arg("create").arg(&source).arg("-o").arg(&archive).assert().success();

    mpq()
        .arg("read")
        .arg("hello.txt")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("hello mpq"));

    mpq()
        .arg("extract")
        .arg(&archive)
        .arg("-o")
        .arg(&extract_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted: hello.txt"));

    let extracted = fs::read_to_string(extract_dir.join("hello.txt")).unwrap();
    assert_eq!(extracted, "hello mpq");
}

#[test]
fn test_add_and_remove() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");
    let extra = temp.path().join("extra.txt");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("first.txt"), "first").unwrap();
    fs::write(&extra, "second").unwrap();

    mpq().arg("create").arg(&source).arg("-o").arg(&archive).assert().success();

    mpq()
        .arg("add")
        .arg(&extra)
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added: extra.txt"));

    mpq()
        .arg("list")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("extra.txt"));

    mpq()
        .arg("remove")
        .arg("extra.txt")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed: extra.txt"));

    mpq()
        .arg("list")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("first.txt").and(predicate::str::contains("extra.txt").not()));
}

#[test]
fn test_locale_specific_add_and_list_fallback() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("neutral.txt"), "neutral").unwrap();

    mpq().arg("create").arg(&source).arg("-o").arg(&archive).assert().success();

    let locale_file = temp.path().join("strings.txt");
    fs::write(&locale_file, "bonjour").unwrap();

    mpq()
        .arg("add")
        .arg(&locale_file)
        .arg(&archive)
        .arg("--locale")
        .arg("frFR")
        .assert()
        .success();

    mpq()
        .arg("read")
        .arg("strings.txt")
        .arg(&archive)
        .arg("--locale")
        .arg("frFR")
        .assert()
        .success()
        .stdout(predicate::str::contains("bonjour"));
}

#[test]
fn test_verify_unsigned_archive_fails() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();

    mpq().arg("create").arg(&source).arg("-o").arg(&archive).assert().success();

    mpq().arg("verify").arg(&archive).assert().failure();
}

#[test]
fn test_verify_signed_archive_succeeds() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();

    mpq()
        .arg("create")
        .arg(&source)
        .arg("-o")
        .arg(&archive)
        .arg("--sign")
        .assert()
        .success();

    mpq()
        .arg("verify")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Verify success"));
}

#[test]
fn test_extract_with_no_listfile_synthesizes_names() {
    // A directory-sourced create always writes a (listfile), so force the
    // no-listfile path by removing names via an external-listfile-free read
    // path isn't directly reachable through this CLI; instead this checks
    // that detailed listing never panics on a freshly-created archive and
    // resolves every entry by its real name.
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("only.txt"), "only").unwrap();

    mpq().arg("create").arg(&source).arg("-o").arg(&archive).assert().success();

    mpq()
        .arg("list")
        .arg(&archive)
        .arg("--detailed")
        .assert()
        .success()
        .stdout(predicate::str::contains("only.txt"));
}

#[test]
fn test_create_missing_source_fails_with_invalid_input_code() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("test.mpq");

    mpq()
        .arg("create")
        .arg(temp.path().join("does-not-exist"))
        .arg("-o")
        .arg(&archive)
        .assert()
        .failure()
        .code(105);
}

#[test]
fn test_list_property_filters_by_locale() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("cats.txt"), "meow").unwrap();

    mpq().arg("create").arg(&source).arg("-o").arg(&archive).assert().success();

    let locale_file = temp.path().join("cats.txt");
    fs::write(&locale_file, "miau").unwrap();
    mpq()
        .arg("add")
        .arg(&locale_file)
        .arg(&archive)
        .arg("--locale")
        .arg("esES")
        .assert()
        .success();

    mpq()
        .arg("list")
        .arg(&archive)
        .arg("-p")
        .arg("locale")
        .arg("-p")
        .arg("name")
        .assert()
        .success()
        .stdout(predicate::str::contains("enUS cats.txt"))
        .stdout(predicate::str::contains("esES cats.txt"));
}

#[test]
fn test_list_all_includes_internal_entries() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();

    mpq().arg("create").arg(&source).arg("-o").arg(&archive).assert().success();

    mpq()
        .arg("list")
        .arg(&archive)
        .arg("--all")
        .assert()
        .success()
        .stdout(predicate::str::contains("(listfile)"));
}

#[test]
fn test_verify_print_outputs_hex_signature() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();

    mpq()
        .arg("create")
        .arg(&source)
        .arg("-o")
        .arg(&archive)
        .arg("--sign")
        .assert()
        .success();

    mpq()
        .arg("verify")
        .arg(&archive)
        .arg("-p")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{144}").unwrap());
}

#[test]
fn test_unknown_locale_on_add_is_invalid_input() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let archive = temp.path().join("test.mpq");
    let extra = temp.path().join("extra.txt");

    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();
    fs::write(&extra, "b").unwrap();

    mpq().arg("create").arg(&source).arg("-o").arg(&archive).assert().success();

    mpq()
        .arg("add")
        .arg(&extra)
        .arg(&archive)
        .arg("--locale")
        .arg("zzZZ")
        .assert()
        .failure()
        .code(105);
}
