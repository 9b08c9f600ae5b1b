//! One input type per wizard step.
//!
//! Inputs hold what was typed or chosen, as raw strings. `validate` checks
//! and normalises them into the answers the wizard stores; the steps that
//! carry files also upload them through `submit`.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::Deserialize;
use shared::domain::{
    ConstructionPossibility, FileSlot, ParkingOption, RequiredDocument, SlotKind,
    SubmissionMethod, YesNo,
};
use thiserror::Error;

use crate::{
    upload::{PendingFile, UploadClient, UploadError},
    wizard::StepId,
};

const CHOOSE: &str = "選択してください";
const PHONE_CHARS: &str = "数字とハイフンのみ入力可能です";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),
}

/// Validated output of one step, handed to [`crate::SurveyWizard::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Store(StoreAnswers),
    FacilityManager(ManagerAnswers),
    Photos(PhotoAnswers),
    Construction(ConstructionAnswers),
    FacilityAccess(FacilityAccessAnswers),
    WorkDetails(WorkDetailsAnswers),
}

impl StepResult {
    pub fn step(&self) -> StepId {
        match self {
            StepResult::Store(_) => StepId::Store,
            StepResult::FacilityManager(_) => StepId::FacilityManager,
            StepResult::Photos(_) => StepId::Photos,
            StepResult::Construction(_) => StepId::Construction,
            StepResult::FacilityAccess(_) => StepId::FacilityAccess,
            StepResult::WorkDetails(_) => StepId::WorkDetails,
        }
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    message: &str,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field, message);
    }
    value.to_string()
}

fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn is_phone(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit() || c == '-')
}

fn required_phone(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    label: &str,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field, format!("{label}を入力してください"));
    } else if !is_phone(value) {
        errors.push(field, format!("{label}は{PHONE_CHARS}"));
    }
    value.to_string()
}

pub(crate) fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

fn choice<T: FromStr>(errors: &mut ValidationErrors, field: &'static str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(field, CHOOSE);
            None
        }
    }
}

// Store

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreInput {
    pub store_name: String,
    pub phone_number: String,
    pub needs_direct_communication: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAnswers {
    pub store_name: String,
    pub phone_number: String,
    pub needs_direct_communication: YesNo,
}

impl StoreInput {
    pub fn validate(&self) -> Result<StepResult, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let store_name = required_text(
            &mut errors,
            "store_name",
            &self.store_name,
            "店舗名を入力してください",
        );
        let phone_number = required_phone(&mut errors, "phone_number", &self.phone_number, "電話番号");
        let Some(needs_direct_communication) = choice(
            &mut errors,
            "needs_direct_communication",
            &self.needs_direct_communication,
        ) else {
            return Err(errors);
        };
        errors.into_result(StepResult::Store(StoreAnswers {
            store_name,
            phone_number,
            needs_direct_communication,
        }))
    }
}

// Facility manager

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManagerInput {
    pub manager_name: String,
    pub manager_phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerAnswers {
    pub manager_name: String,
    pub manager_phone: String,
}

impl ManagerInput {
    pub fn validate(&self) -> Result<StepResult, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let manager_name = required_text(
            &mut errors,
            "manager_name",
            &self.manager_name,
            "担当者様のお名前を入力してください",
        );
        let manager_phone =
            required_phone(&mut errors, "manager_phone", &self.manager_phone, "電話番号");
        errors.into_result(StepResult::FacilityManager(ManagerAnswers {
            manager_name,
            manager_phone,
        }))
    }
}

// Photos

/// New files per photo slot. Slots already uploaded earlier in the session
/// are listed in `kept` and need no new file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotosInput {
    pub files: BTreeMap<FileSlot, PendingFile>,
    pub kept: BTreeMap<FileSlot, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoAnswers {
    pub photos: BTreeMap<FileSlot, String>,
}

impl PhotosInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for slot in self.files.keys().chain(self.kept.keys()) {
            if slot.kind() != SlotKind::Photo {
                errors.push("photos", format!("{} は写真の項目ではありません", slot.label()));
            }
        }
        for slot in FileSlot::PHOTOS {
            if !self.files.contains_key(&slot) && !self.kept.contains_key(&slot) {
                errors.push("photos", format!("{}の写真をアップロードしてください", slot.label()));
            }
        }
        errors.into_result(())
    }

    pub async fn submit(
        &self,
        owner_name: &str,
        uploads: &UploadClient,
    ) -> Result<StepResult, StepError> {
        self.validate()?;
        let mut photos = self.kept.clone();
        photos.extend(uploads.upload_all(owner_name, &self.files).await?);
        Ok(StepResult::Photos(PhotoAnswers { photos }))
    }
}

// Construction

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConstructionInput {
    pub unavailable_dates: String,
    pub construction_possibility: String,
    pub construction_possibility_other: String,
    pub required_documents: Vec<String>,
    pub submission_method: String,
    pub fax_number: String,
    pub email_address: String,
    pub other_submission_details: String,
    pub required_items: String,
    pub application_deadline: String,
    #[serde(skip)]
    pub documents: BTreeMap<FileSlot, PendingFile>,
    #[serde(skip)]
    pub kept_documents: BTreeMap<FileSlot, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionAnswers {
    pub unavailable_dates: String,
    pub construction_possibility: ConstructionPossibility,
    pub construction_possibility_other: Option<String>,
    pub required_documents: Vec<RequiredDocument>,
    pub submission_method: SubmissionMethod,
    pub fax_number: Option<String>,
    pub email_address: Option<String>,
    pub other_submission_details: Option<String>,
    pub required_items: Option<String>,
    pub application_deadline: String,
    pub construction_documents: BTreeMap<FileSlot, String>,
}

impl ConstructionInput {
    /// Checks the text answers and returns them with the kept documents
    /// that still match a selected document kind.
    pub fn validate(&self) -> Result<ConstructionAnswers, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let unavailable_dates = required_text(
            &mut errors,
            "unavailable_dates",
            &self.unavailable_dates,
            "作業不可日を入力してください",
        );

        let possibility: Option<ConstructionPossibility> = choice(
            &mut errors,
            "construction_possibility",
            &self.construction_possibility,
        );
        let construction_possibility_other = match possibility {
            Some(ConstructionPossibility::Other) => Some(required_text(
                &mut errors,
                "construction_possibility_other",
                &self.construction_possibility_other,
                "詳細を入力してください",
            )),
            _ => None,
        };

        let mut required_documents = Vec::new();
        for raw in &self.required_documents {
            match raw.parse::<RequiredDocument>() {
                Ok(document) if !required_documents.contains(&document) => {
                    required_documents.push(document)
                }
                Ok(_) => {}
                Err(_) => errors.push("required_documents", format!("不明な書類です: {raw}")),
            }
        }
        if self.required_documents.is_empty() {
            errors.push("required_documents", "少なくとも1つ選択してください");
        }

        let method: Option<SubmissionMethod> =
            choice(&mut errors, "submission_method", &self.submission_method);
        let (mut fax_number, mut email_address, mut other_submission_details) = (None, None, None);
        match method {
            Some(SubmissionMethod::Fax) => {
                fax_number = Some(required_phone(
                    &mut errors,
                    "fax_number",
                    &self.fax_number,
                    "FAX番号",
                ));
            }
            Some(SubmissionMethod::Email) => {
                let email = self.email_address.trim();
                if !is_email(email) {
                    errors.push("email_address", "有効なメールアドレスを入力してください");
                }
                email_address = Some(email.to_string());
            }
            Some(SubmissionMethod::Other) => {
                other_submission_details = Some(required_text(
                    &mut errors,
                    "other_submission_details",
                    &self.other_submission_details,
                    "提出方法の詳細を入力してください",
                ));
            }
            None => {}
        }

        let application_deadline = required_text(
            &mut errors,
            "application_deadline",
            &self.application_deadline,
            "作業申請の締め切りを入力してください",
        );

        for slot in self.documents.keys() {
            match slot.document() {
                Some(document) if required_documents.contains(&document) => {}
                Some(_) => errors.push(
                    "construction_documents",
                    format!("{}は必要な書類に選択されていません", slot.label()),
                ),
                None => errors.push(
                    "construction_documents",
                    format!("{} は工事書類の項目ではありません", slot.label()),
                ),
            }
        }
        let construction_documents = self
            .kept_documents
            .iter()
            .filter(|(slot, _)| {
                slot.document()
                    .is_some_and(|document| required_documents.contains(&document))
            })
            .map(|(slot, key)| (*slot, key.clone()))
            .collect();

        let (Some(construction_possibility), Some(submission_method)) = (possibility, method) else {
            return Err(errors);
        };
        errors.into_result(ConstructionAnswers {
            unavailable_dates,
            construction_possibility,
            construction_possibility_other,
            required_documents,
            submission_method,
            fax_number,
            email_address,
            other_submission_details,
            required_items: optional_text(&self.required_items),
            application_deadline,
            construction_documents,
        })
    }

    pub async fn submit(
        &self,
        owner_name: &str,
        uploads: &UploadClient,
    ) -> Result<StepResult, StepError> {
        let mut answers = self.validate()?;
        answers
            .construction_documents
            .extend(uploads.upload_all(owner_name, &self.documents).await?);
        Ok(StepResult::Construction(answers))
    }
}

// Facility access

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FacilityAccessInput {
    pub entry_procedures: String,
    pub loading_procedures: String,
    #[serde(skip)]
    pub entrance_guide: Option<PendingFile>,
    #[serde(skip)]
    pub kept_entrance_guide: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityAccessAnswers {
    pub entry_procedures: String,
    pub loading_procedures: String,
    pub facility_document: Option<String>,
}

impl FacilityAccessInput {
    pub fn validate(&self) -> Result<FacilityAccessAnswers, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let entry_procedures = required_text(
            &mut errors,
            "entry_procedures",
            &self.entry_procedures,
            "入館時の遵守事項を入力してください",
        );
        let loading_procedures = required_text(
            &mut errors,
            "loading_procedures",
            &self.loading_procedures,
            "荷捌き上の遵守事項を入力してください",
        );
        errors.into_result(FacilityAccessAnswers {
            entry_procedures,
            loading_procedures,
            facility_document: self.kept_entrance_guide.clone(),
        })
    }

    pub async fn submit(
        &self,
        owner_name: &str,
        uploads: &UploadClient,
    ) -> Result<StepResult, StepError> {
        let mut answers = self.validate()?;
        if let Some(file) = &self.entrance_guide {
            let key = uploads
                .upload(owner_name, FileSlot::EntranceGuide, file)
                .await?;
            answers.facility_document = Some(key);
        }
        Ok(StepResult::FacilityAccess(answers))
    }
}

// Work details

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkDetailsInput {
    pub parking_option: String,
    pub parking_option_other: String,
    pub night_time_restriction: String,
    pub restriction_details: String,
    pub auto_light_off: String,
    pub light_off_details: String,
    pub backyard_key_management: String,
    pub server_rack_key_management: String,
    pub other_considerations: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDetailsAnswers {
    pub parking_option: ParkingOption,
    pub parking_option_other: Option<String>,
    pub night_time_restriction: YesNo,
    pub restriction_details: Option<String>,
    pub auto_light_off: YesNo,
    pub light_off_details: Option<String>,
    pub backyard_key_management: String,
    pub server_rack_key_management: String,
    pub other_considerations: Option<String>,
}

impl WorkDetailsInput {
    pub fn validate(&self) -> Result<StepResult, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let parking: Option<ParkingOption> =
            choice(&mut errors, "parking_option", &self.parking_option);
        let parking_option_other = match parking {
            Some(ParkingOption::Other) => Some(required_text(
                &mut errors,
                "parking_option_other",
                &self.parking_option_other,
                "駐車についての詳細を入力してください",
            )),
            _ => None,
        };
        let night: Option<YesNo> = choice(
            &mut errors,
            "night_time_restriction",
            &self.night_time_restriction,
        );
        let light_off: Option<YesNo> = choice(&mut errors, "auto_light_off", &self.auto_light_off);
        let backyard_key_management = required_text(
            &mut errors,
            "backyard_key_management",
            &self.backyard_key_management,
            "バックヤードの鍵の管理方法を入力してください",
        );
        let server_rack_key_management = required_text(
            &mut errors,
            "server_rack_key_management",
            &self.server_rack_key_management,
            "サーバーラックの鍵の管理方法を入力してください",
        );

        let (Some(parking_option), Some(night_time_restriction), Some(auto_light_off)) =
            (parking, night, light_off)
        else {
            return Err(errors);
        };
        errors.into_result(StepResult::WorkDetails(WorkDetailsAnswers {
            parking_option,
            parking_option_other,
            night_time_restriction,
            restriction_details: optional_text(&self.restriction_details),
            auto_light_off,
            light_off_details: optional_text(&self.light_off_details),
            backyard_key_management,
            server_rack_key_management,
            other_considerations: optional_text(&self.other_considerations),
        }))
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
