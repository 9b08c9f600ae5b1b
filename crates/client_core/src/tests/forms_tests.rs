use super::*;
use crate::test_support::png;

fn construction(method: &str) -> ConstructionInput {
    ConstructionInput {
        unavailable_dates: " 年末年始 ".into(),
        construction_possibility: "possible".into(),
        required_documents: vec!["construction".into()],
        submission_method: method.into(),
        fax_number: "03-1234-0000".into(),
        email_address: "facility@example.com".into(),
        other_submission_details: "専用サイトから申請".into(),
        application_deadline: "作業の2週間前".into(),
        ..ConstructionInput::default()
    }
}

#[test]
fn empty_store_step_reports_every_field() {
    let errors = StoreInput::default().validate().expect_err("empty");
    assert!(errors.has("store_name"));
    assert!(errors.has("phone_number"));
    assert!(errors.has("needs_direct_communication"));
}

#[test]
fn store_answers_are_trimmed() {
    let result = StoreInput {
        store_name: "  ACME 渋谷店 ".into(),
        phone_number: "03-1234-5678".into(),
        needs_direct_communication: "yes".into(),
    }
    .validate()
    .expect("valid");

    let StepResult::Store(answers) = result else {
        panic!("expected store answers");
    };
    assert_eq!(answers.store_name, "ACME 渋谷店");
    assert_eq!(answers.needs_direct_communication, YesNo::Yes);
}

#[test]
fn phone_numbers_allow_digits_and_hyphens_only() {
    let errors = ManagerInput {
        manager_name: "山田".into(),
        manager_phone: "+81 90 0000".into(),
    }
    .validate()
    .expect_err("bad phone");
    assert_eq!(errors.0.len(), 1);
    assert_eq!(errors.0[0].field, "manager_phone");
    assert_eq!(errors.0[0].message, "電話番号は数字とハイフンのみ入力可能です");
}

#[test]
fn only_the_chosen_submission_method_is_kept() {
    let answers = construction("email").validate().expect("valid");
    assert_eq!(answers.submission_method, SubmissionMethod::Email);
    assert_eq!(answers.email_address.as_deref(), Some("facility@example.com"));
    assert_eq!(answers.fax_number, None);
    assert_eq!(answers.other_submission_details, None);
    assert_eq!(answers.unavailable_dates, "年末年始");
}

#[test]
fn chosen_method_needs_its_detail() {
    let mut input = construction("email");
    input.email_address = "not-an-address".into();
    assert!(input.validate().expect_err("bad email").has("email_address"));

    let mut input = construction("fax");
    input.fax_number = String::new();
    assert!(input.validate().expect_err("no fax").has("fax_number"));

    let mut input = construction("other");
    input.other_submission_details = "  ".into();
    assert!(input
        .validate()
        .expect_err("no details")
        .has("other_submission_details"));
}

#[test]
fn other_possibility_needs_details() {
    let mut input = construction("fax");
    input.construction_possibility = "other".into();
    let errors = input.validate().expect_err("no details");
    assert!(errors.has("construction_possibility_other"));

    input.construction_possibility_other = "夜間のみ可能".into();
    let answers = input.validate().expect("valid");
    assert_eq!(
        answers.construction_possibility_other.as_deref(),
        Some("夜間のみ可能")
    );
}

#[test]
fn at_least_one_document_kind_is_required() {
    let mut input = construction("fax");
    input.required_documents.clear();
    assert!(input.validate().expect_err("none").has("required_documents"));

    input.required_documents = vec!["fire".into(), "fire".into(), "construction".into()];
    let answers = input.validate().expect("valid");
    assert_eq!(
        answers.required_documents,
        vec![RequiredDocument::Fire, RequiredDocument::Construction]
    );
}

#[test]
fn document_files_must_match_selected_kinds() {
    let mut input = construction("fax");
    input
        .documents
        .insert(FileSlot::FireDocument, png("fire.png"));
    assert!(input
        .validate()
        .expect_err("fire not selected")
        .has("construction_documents"));
}

#[test]
fn kept_documents_of_deselected_kinds_are_dropped() {
    let mut input = construction("fax");
    input.kept_documents.insert(
        FileSlot::ConstructionDocument,
        "ACME/工事作業申請書.pdf".into(),
    );
    input
        .kept_documents
        .insert(FileSlot::FireDocument, "ACME/消防作業申請書.pdf".into());

    let answers = input.validate().expect("valid");
    assert_eq!(answers.construction_documents.len(), 1);
    assert!(answers
        .construction_documents
        .contains_key(&FileSlot::ConstructionDocument));
}

#[test]
fn photos_need_every_slot() {
    let mut input = PhotosInput::default();
    for slot in &FileSlot::PHOTOS[..5] {
        input.files.insert(*slot, png("p.png"));
    }
    let errors = input.validate().expect_err("server rack missing");
    assert_eq!(errors.0.len(), 1);

    input
        .kept
        .insert(FileSlot::ServerRack, "ACME/サーバーラック内.png".into());
    assert!(input.validate().is_ok());
}

#[test]
fn work_details_optional_text_becomes_none() {
    let result = WorkDetailsInput {
        parking_option: "other".into(),
        parking_option_other: "近隣のコインパーキング".into(),
        night_time_restriction: "no".into(),
        restriction_details: "   ".into(),
        auto_light_off: "yes".into(),
        light_off_details: "警備室に連絡".into(),
        backyard_key_management: "店長が保管".into(),
        server_rack_key_management: "施錠なし".into(),
        other_considerations: String::new(),
    }
    .validate()
    .expect("valid");

    let StepResult::WorkDetails(answers) = result else {
        panic!("expected work details");
    };
    assert_eq!(answers.parking_option, ParkingOption::Other);
    assert_eq!(answers.restriction_details, None);
    assert_eq!(answers.light_off_details.as_deref(), Some("警備室に連絡"));
    assert_eq!(answers.other_considerations, None);
}

#[test]
fn unknown_choice_is_a_field_error() {
    let errors = WorkDetailsInput {
        parking_option: "roof".into(),
        ..WorkDetailsInput::default()
    }
    .validate()
    .expect_err("invalid");
    assert!(errors.has("parking_option"));
    assert!(errors.has("backyard_key_management"));
    assert!(errors.to_string().contains("parking_option: 選択してください"));
}

#[test]
fn email_shapes() {
    assert!(is_email("a@example.co.jp"));
    assert!(!is_email("a@localhost"));
    assert!(!is_email("@example.com"));
    assert!(!is_email("a b@example.com"));
    assert!(!is_email("a@@example.com"));
    assert!(!is_email("a@example..com"));
}
