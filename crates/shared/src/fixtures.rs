//! Ready-made records for tests in dependent crates.

use std::collections::BTreeMap;

use crate::{
    domain::{
        ConstructionPossibility, FileSlot, ParkingOption, RequiredDocument, SubmissionMethod,
        YesNo,
    },
    record::SurveyRecord,
};

/// A record answered along the "no direct communication" path with every
/// optional field left empty.
pub fn minimal_record(store_name: &str) -> SurveyRecord {
    let photos: BTreeMap<FileSlot, String> = FileSlot::PHOTOS
        .iter()
        .map(|slot| (*slot, format!("{store_name}/{}.png", slot.label())))
        .collect();

    SurveyRecord {
        store_name: Some(store_name.to_string()),
        phone_number: Some("03-1234-5678".into()),
        needs_direct_communication: Some(YesNo::No),
        photos,
        unavailable_dates: Some("年末年始".into()),
        construction_possibility: Some(ConstructionPossibility::Possible),
        required_documents: vec![RequiredDocument::Construction],
        submission_method: Some(SubmissionMethod::Fax),
        fax_number: Some("03-1234-0000".into()),
        application_deadline: Some("作業の2週間前".into()),
        entry_procedures: Some("防災センターで受付".into()),
        loading_procedures: Some("搬入口を使用".into()),
        parking_option: Some(ParkingOption::Dedicated),
        night_time_restriction: Some(YesNo::No),
        auto_light_off: Some(YesNo::No),
        backyard_key_management: Some("店長が保管".into()),
        server_rack_key_management: Some("施錠なし".into()),
        ..SurveyRecord::default()
    }
}

/// A record answered along the "direct communication" path with documents
/// attached.
pub fn full_record(store_name: &str) -> SurveyRecord {
    let mut record = minimal_record(store_name);
    record.needs_direct_communication = Some(YesNo::Yes);
    record.manager_name = Some("山田太郎".into());
    record.manager_phone = Some("090-0000-1111".into());
    record.required_documents = vec![RequiredDocument::Construction, RequiredDocument::Fire];
    record.construction_documents.insert(
        FileSlot::ConstructionDocument,
        format!("{store_name}/工事作業申請書.pdf"),
    );
    record.facility_document = Some(format!("{store_name}/入館説明用資料.pdf"));
    record.other_considerations = Some("特になし".into());
    record
}
