use super::*;

use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_dir() -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("intake_answers_test_{suffix}"));
    fs::create_dir_all(dir.join("photos")).expect("mkdir");
    dir
}

const STORE: &str = r#"
[store]
store_name = "ACME"
phone_number = "03-1234-5678"
needs_direct_communication = "no"
"#;

#[tokio::test]
async fn reads_step_tables_and_files_relative_to_base() {
    let dir = temp_dir();
    fs::write(dir.join("photos/front.png"), b"front").expect("write");
    fs::write(dir.join("guide.pdf"), b"%PDF").expect("write");
    fs::write(dir.join("fire.pdf"), b"%PDF").expect("write");

    let raw = format!(
        r#"{STORE}
[photos]
front = "photos/front.png"

[construction]
construction_possibility = "yes"
required_documents = ["fire"]

[construction.files]
fire-document = "fire.pdf"

[facility_access]
entry_procedures = "受付で記帳"
entrance_guide_file = "guide.pdf"

[work_details]
parking_option = "available"
"#
    );

    let answers = parse_answers(&raw, &dir).await.expect("answers");
    assert_eq!(answers.store.store_name, "ACME");
    assert_eq!(answers.work_details.parking_option, "available");

    let front = &answers.photos.files[&FileSlot::Front];
    assert_eq!(front.file_name, "front.png");
    assert_eq!(front.content_type, "image/png");
    assert_eq!(front.bytes, b"front");
    assert!(answers.photos.kept.is_empty());

    assert_eq!(answers.construction.construction_possibility, "yes");
    assert_eq!(answers.construction.required_documents, vec!["fire".to_string()]);
    assert_eq!(
        answers.construction.documents[&FileSlot::FireDocument].content_type,
        "application/pdf"
    );

    assert_eq!(answers.facility_access.entry_procedures, "受付で記帳");
    let guide = answers.facility_access.entrance_guide.expect("guide");
    assert_eq!(guide.file_name, "guide.pdf");
}

#[tokio::test]
async fn missing_tables_default_to_empty_inputs() {
    let answers = parse_answers(STORE, Path::new(".")).await.expect("answers");
    assert!(answers.photos.files.is_empty());
    assert!(answers.construction.documents.is_empty());
    assert!(answers.facility_access.entrance_guide.is_none());
    assert_eq!(answers.facility_manager.manager_name, "");
}

#[tokio::test]
async fn unknown_slot_id_is_rejected() {
    let raw = format!("{STORE}\n[photos]\nroof = \"roof.png\"\n");
    let err = parse_answers(&raw, Path::new("."))
        .await
        .expect_err("unknown slot");
    assert!(err.to_string().contains("roof"), "{err}");
}

#[tokio::test]
async fn missing_file_is_reported() {
    let dir = temp_dir();
    let raw = format!("{STORE}\n[photos]\nleft = \"photos/left.jpg\"\n");
    let err = parse_answers(&raw, &dir).await.expect_err("missing file");
    assert!(err.to_string().contains("left.jpg"), "{err}");
}

#[tokio::test]
async fn load_answers_resolves_against_the_file_directory() {
    let dir = temp_dir();
    fs::write(dir.join("photos/right.jpg"), b"right").expect("write");
    let path = dir.join("answers.toml");
    fs::write(&path, format!("{STORE}\n[photos]\nright = \"photos/right.jpg\"\n")).expect("write");

    let answers = load_answers(&path).await.expect("answers");
    assert_eq!(answers.photos.files[&FileSlot::Right].content_type, "image/jpeg");
}
