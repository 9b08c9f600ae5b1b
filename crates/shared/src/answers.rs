//! Question set and display formatting of a [`SurveyRecord`].
//!
//! The spreadsheet header row and the confirmation listing both come from
//! [`QUESTIONS`]; [`answer_cells`] yields one display value per question in
//! the same order.

use std::collections::BTreeMap;

use crate::{
    domain::{FileSlot, YesNo},
    record::SurveyRecord,
};

/// Placeholder written for every absent or blank optional answer.
pub const EMPTY_CELL: &str = "-";

pub const QUESTIONS: [&str; 34] = [
    "店舗名",
    "店舗電話番号",
    "工事作業申請の対応に防災や施設管理と直接やり取りする必要があるか？",
    "施設のご担当者様のお名前",
    "施設のご担当者様の電話番号",
    "店舗外観_正面",
    "店舗外観_左",
    "店舗外観_右",
    "店舗内観_天井",
    "バックヤード全体",
    "サーバーラック内",
    "作業不可日の有無",
    "営業時間中の工事作業の可否",
    "営業時間中の工事作業の可否（その他詳細）",
    "工事するまでの要な書類",
    "申請の提出方法",
    "FAX番号",
    "メールアドレス",
    "その他提出方法詳細",
    "施設所定のイントラなどの場合の必要項目",
    "作業申請の締め切り",
    "工事書類",
    "入館時の遵守事項",
    "荷捌き上の遵守事項",
    "入館説明用資料",
    "作業員の車両駐車について",
    "作業員の車両駐車について（その他詳細）",
    "夜間の作業時間に制限があるか",
    "制限の詳細",
    "営業時間外（夜間作業）時に自動消灯されるか",
    "自動消灯の場合の解除方法",
    "バックヤードの鍵の管理について",
    "サーバーラックの鍵の管理について",
    "その他留意事項",
];

fn text(value: &Option<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => EMPTY_CELL.to_string(),
    }
}

fn label<T>(value: Option<T>, to_label: impl Fn(T) -> &'static str) -> String {
    value
        .map(|v| to_label(v).to_string())
        .unwrap_or_else(|| EMPTY_CELL.to_string())
}

fn stored(key: Option<&String>, resolve: &dyn Fn(&str) -> String) -> String {
    key.map(|key| resolve(key))
        .unwrap_or_else(|| EMPTY_CELL.to_string())
}

fn stored_map(
    entries: &BTreeMap<FileSlot, String>,
    resolve: &dyn Fn(&str) -> String,
) -> String {
    if entries.is_empty() {
        return EMPTY_CELL.to_string();
    }
    entries
        .iter()
        .map(|(slot, key)| format!("{}: {}", slot.label(), resolve(key)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats the record as one display value per entry of [`QUESTIONS`].
/// `resolve` turns a stored object key into what should be shown for it.
pub fn answer_cells(record: &SurveyRecord, resolve: &dyn Fn(&str) -> String) -> Vec<String> {
    let required_documents = if record.required_documents.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        record
            .required_documents
            .iter()
            .map(|document| document.label())
            .collect::<Vec<_>>()
            .join("、")
    };

    let cells = vec![
        text(&record.store_name),
        text(&record.phone_number),
        label(record.needs_direct_communication, YesNo::label),
        text(&record.manager_name),
        text(&record.manager_phone),
        stored(record.photos.get(&FileSlot::Front), resolve),
        stored(record.photos.get(&FileSlot::Left), resolve),
        stored(record.photos.get(&FileSlot::Right), resolve),
        stored(record.photos.get(&FileSlot::Ceiling), resolve),
        stored(record.photos.get(&FileSlot::Backyard), resolve),
        stored(record.photos.get(&FileSlot::ServerRack), resolve),
        text(&record.unavailable_dates),
        label(record.construction_possibility, |v| v.label()),
        text(&record.construction_possibility_other),
        required_documents,
        label(record.submission_method, |v| v.label()),
        text(&record.fax_number),
        text(&record.email_address),
        text(&record.other_submission_details),
        text(&record.required_items),
        text(&record.application_deadline),
        stored_map(&record.construction_documents, resolve),
        text(&record.entry_procedures),
        text(&record.loading_procedures),
        stored(record.facility_document.as_ref(), resolve),
        label(record.parking_option, |v| v.label()),
        text(&record.parking_option_other),
        label(record.night_time_restriction, |v| match v {
            YesNo::Yes => "ある",
            YesNo::No => "ない",
        }),
        text(&record.restriction_details),
        label(record.auto_light_off, |v| match v {
            YesNo::Yes => "自動消灯",
            YesNo::No => "自動消灯なし",
        }),
        text(&record.light_off_details),
        text(&record.backyard_key_management),
        text(&record.server_rack_key_management),
        text(&record.other_considerations),
    ];
    debug_assert_eq!(cells.len(), QUESTIONS.len());
    cells
}

#[cfg(test)]
#[path = "tests/answers_tests.rs"]
mod tests;
