use super::*;
use crate::fixtures::{full_record, minimal_record};

#[test]
fn minimal_record_is_complete() {
    minimal_record("ACME").check_complete().expect("complete");
}

#[test]
fn full_record_is_complete() {
    full_record("ACME").check_complete().expect("complete");
}

#[test]
fn direct_communication_requires_manager_fields() {
    let mut record = minimal_record("ACME");
    record.needs_direct_communication = Some(YesNo::Yes);
    let err = record.check_complete().expect_err("manager missing");
    assert_eq!(
        err,
        RecordError::Missing(vec!["manager_name", "manager_phone"])
    );
}

#[test]
fn manager_fields_outside_branch_are_rejected() {
    let mut record = minimal_record("ACME");
    record.manager_name = Some("山田".into());
    let err = record.check_complete().expect_err("unexpected manager");
    assert_eq!(err, RecordError::Unexpected(vec!["manager_name"]));
}

#[test]
fn conditional_detail_fields_follow_their_choice() {
    let mut record = minimal_record("ACME");
    record.submission_method = Some(SubmissionMethod::Email);
    record.parking_option = Some(ParkingOption::Other);
    let err = record.check_complete().expect_err("details missing");
    assert_eq!(
        err,
        RecordError::Missing(vec!["email_address", "parking_option_other"])
    );
}

#[test]
fn missing_photo_slot_is_reported_once() {
    let mut record = minimal_record("ACME");
    record.photos.remove(&FileSlot::Ceiling);
    record.photos.remove(&FileSlot::Left);
    let err = record.check_complete().expect_err("photos missing");
    assert_eq!(err, RecordError::Missing(vec!["photos"]));
}

#[test]
fn document_slot_in_photo_map_is_rejected() {
    let mut record = minimal_record("ACME");
    record
        .photos
        .insert(FileSlot::FireDocument, "ACME/消防作業申請書.pdf".into());
    let err = record.check_complete().expect_err("misplaced");
    assert_eq!(
        err,
        RecordError::MisplacedSlot {
            field: "photos",
            slot: FileSlot::FireDocument
        }
    );
}

#[test]
fn stored_keys_cover_every_file_field() {
    let record = full_record("ACME");
    let keys = record.stored_keys();
    assert_eq!(keys.len(), 8);
    assert!(keys.contains(&(FileSlot::EntranceGuide, "ACME/入館説明用資料.pdf")));
}

#[test]
fn serializes_flat_and_skips_absent_fields() {
    let value = serde_json::to_value(minimal_record("ACME")).expect("json");
    assert_eq!(value["store_name"], "ACME");
    assert_eq!(value["needs_direct_communication"], "no");
    assert_eq!(value["photos"]["front"], "ACME/店舗外観_正面.png");
    assert!(value.get("manager_name").is_none());
    assert!(value.get("construction_documents").is_none());
}
