use assert_cmd::cargo::cargo_bin_cmd;
use lopdf::content::Content;
use lopdf::{Document, Object};
use pagemark_model::PageSize;
use pdf_engine::build_numbered_pages;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn write_fixture(dir: &Path, name: &str, sizes: &[PageSize]) -> PathBuf {
    let path = dir.join(name);
    let bytes = build_numbered_pages(sizes).expect("fixture should build");
    fs::write(&path, bytes).expect("fixture should be written");
    path
}

fn letter_fixture(dir: &Path, pages: usize) -> PathBuf {
    write_fixture(dir, "letter.pdf", &vec![PageSize::new(612.0, 792.0); pages])
}

fn shown_strings(doc: &Document, page_number: u32) -> Vec<String> {
    let bytes = doc.get_page_content(doc.get_pages()[&page_number]).expect("page content");
    Content::decode(&bytes)
        .expect("content should decode")
        .operations
        .into_iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .collect()
}

#[test]
fn info_emits_stable_json_contract() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = write_fixture(
        temp.path(),
        "fractional.pdf",
        &[PageSize::new(612.5, 792.5), PageSize::new(300.5, 200.25)],
    );

    let output = cargo_bin_cmd!("pagemark")
        .arg("info")
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let mut value: Value =
        serde_json::from_slice(&output).expect("stdout should contain valid json");
    value["path"] = Value::String("<FIXTURE>".to_owned());

    insta::assert_json_snapshot!("cli_info_fractional_pdf", value);
}

#[test]
fn blank_writes_requested_pages() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let output_path = temp.path().join("nested").join("blank.pdf");

    cargo_bin_cmd!("pagemark")
        .arg("blank")
        .arg(&output_path)
        .arg("--pages")
        .arg("3")
        .arg("--width")
        .arg("400")
        .arg("--height")
        .arg("300")
        .assert()
        .success()
        .stdout(predicate::str::contains("blank.pdf"));

    let doc = Document::load(&output_path).expect("output should parse");
    assert_eq!(doc.get_pages().len(), 3);
}

#[test]
fn blank_rejects_zero_pages() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("pagemark")
        .arg("blank")
        .arg(temp.path().join("none.pdf"))
        .arg("--pages")
        .arg("0")
        .assert()
        .failure();
}

#[test]
fn render_writes_png_at_zoomed_size() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = write_fixture(temp.path(), "small.pdf", &[PageSize::new(200.0, 100.0); 2]);
    let output_path = temp.path().join("page.png");

    cargo_bin_cmd!("pagemark")
        .env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path())
        .arg("render")
        .arg(&file)
        .arg("--page")
        .arg("2")
        .arg("--zoom")
        .arg("1.5")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    let image = image::open(&output_path).expect("render output should be readable image");
    assert_eq!((image.width(), image.height()), (300, 150));
}

#[test]
fn render_rejects_page_past_the_end() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = letter_fixture(temp.path(), 2);

    cargo_bin_cmd!("pagemark")
        .arg("render")
        .arg(&file)
        .arg("--page")
        .arg("5")
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn annotate_bakes_scripted_text_into_default_output() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = letter_fixture(temp.path(), 3);
    let script = temp.path().join("script.json");
    fs::write(
        &script,
        r#"[
            { "action": "place_text_box", "text": "Draft" },
            { "action": "go_to_page", "page": 2 },
            { "action": "stroke", "points": [[10.0, 10.0], [120.0, 80.0]] },
            { "action": "go_to_page", "page": 3 }
        ]"#,
    )
    .expect("script should be written");

    let expected_output = temp.path().join("edited.pdf");

    cargo_bin_cmd!("pagemark")
        .env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path())
        .arg("annotate")
        .arg(&file)
        .arg("--script")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("edited.pdf"));

    let doc = Document::load(&expected_output).expect("export should parse");
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(shown_strings(&doc, 1), vec!["Page 1", "Draft"]);
    assert_eq!(shown_strings(&doc, 3), vec!["Page 3"]);

    let page_two = doc.get_dictionary(doc.get_pages()[&2]).expect("page dict");
    let resources = page_two.get(b"Resources").and_then(Object::as_dict).expect("resources");
    assert!(resources.get(b"XObject").is_ok(), "stroke should be baked into page 2");
}

#[test]
fn annotate_uses_config_export_name() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = letter_fixture(temp.path(), 1);
    let script = temp.path().join("script.json");
    fs::write(&script, "[]").expect("script should be written");
    let config = temp.path().join("config.json");
    fs::write(&config, r#"{ "export_file_name": "marked.pdf" }"#).expect("config should be written");

    cargo_bin_cmd!("pagemark")
        .arg("--config")
        .arg(&config)
        .arg("annotate")
        .arg(&file)
        .arg("--script")
        .arg(&script)
        .assert()
        .success();

    assert!(temp.path().join("marked.pdf").exists());
}

#[test]
fn annotate_fails_for_malformed_script() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = letter_fixture(temp.path(), 1);
    let script = temp.path().join("script.json");
    fs::write(&script, r#"[{ "action": "set_zoom", "zoom": -1 }]"#).expect("write");

    cargo_bin_cmd!("pagemark")
        .arg("annotate")
        .arg(&file)
        .arg("--script")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse script"));
}

#[test]
fn config_prints_overridden_values() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let config = temp.path().join("config.json");
    fs::write(&config, r#"{ "pen": { "color": "rgb(0, 0, 255)" } }"#).expect("write");

    let output = cargo_bin_cmd!("pagemark")
        .arg("config")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["pen"]["color"], "#0000ff");
    assert_eq!(value["export_mime_type"], "application/pdf");
}

#[test]
fn saved_config_becomes_the_default() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let custom = temp.path().join("custom.json");
    fs::write(&custom, r#"{ "export_file_name": "kept.pdf" }"#).expect("write");

    cargo_bin_cmd!("pagemark")
        .env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path())
        .arg("config")
        .arg("--config")
        .arg(&custom)
        .arg("--save")
        .assert()
        .success()
        .stderr(predicate::str::contains("saved config to"));

    let output = cargo_bin_cmd!("pagemark")
        .env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path())
        .arg("config")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["export_file_name"], "kept.pdf");
}

#[test]
fn info_fails_for_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("pagemark")
        .arg("info")
        .arg(temp.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = temp.path().join("invalid.pdf");
    fs::write(&file, b"this is not a pdf").expect("write");

    cargo_bin_cmd!("pagemark")
        .arg("info")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_marker_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = letter_fixture(temp.path(), 1);
    let mut bytes = fs::read(&file).expect("read");
    bytes.extend_from_slice(b"\n% /Encrypt\n");
    fs::write(&file, bytes).expect("write");

    cargo_bin_cmd!("pagemark")
        .arg("info")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("pagemark")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
