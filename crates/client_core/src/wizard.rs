use std::sync::Arc;

use shared::{
    answers::{answer_cells, QUESTIONS},
    domain::{FileSlot, YesNo},
    record::{RecordError, SurveyRecord},
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    backend::SurveyBackend,
    forms::{
        ConstructionInput, FacilityAccessInput, ManagerInput, PhotosInput, StepResult, StoreInput,
        WorkDetailsInput,
    },
    upload::UploadClient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Store,
    FacilityManager,
    Photos,
    Construction,
    FacilityAccess,
    WorkDetails,
    Confirmation,
}

impl StepId {
    pub fn title(self) -> &'static str {
        match self {
            StepId::Store => "店舗情報",
            StepId::FacilityManager => "施設のご担当者様",
            StepId::Photos => "店舗写真",
            StepId::Construction => "工事申請について",
            StepId::FacilityAccess => "入館について",
            StepId::WorkDetails => "作業について",
            StepId::Confirmation => "確認",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Editing(StepId),
    Submitting,
    Success,
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("answers for {got:?} cannot be accepted while in {state:?}")]
    WrongStep { state: WizardState, got: StepId },
    #[error("the survey can only be submitted from the confirmation step, not {0:?}")]
    NotOnConfirmation(WizardState),
    #[error("the survey is incomplete: {0}")]
    Incomplete(#[from] RecordError),
    #[error("the survey was not saved: {0}")]
    Rejected(String),
    #[error("could not reach the survey server: {0}")]
    Transport(#[source] anyhow::Error),
}

/// Drives one survey session: which step is showing and what has been
/// answered so far.
pub struct SurveyWizard {
    session_id: Uuid,
    state: WizardState,
    record: SurveyRecord,
    backend: Arc<dyn SurveyBackend>,
    uploads: UploadClient,
}

impl SurveyWizard {
    pub fn new(backend: Arc<dyn SurveyBackend>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: WizardState::Editing(StepId::Store),
            record: SurveyRecord::default(),
            uploads: UploadClient::new(backend.clone()),
            backend,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn current_step(&self) -> Option<StepId> {
        match self.state {
            WizardState::Editing(step) => Some(step),
            WizardState::Submitting | WizardState::Success => None,
        }
    }

    pub fn record(&self) -> &SurveyRecord {
        &self.record
    }

    pub fn uploads(&self) -> &UploadClient {
        &self.uploads
    }

    /// Key prefix for this session's uploads; empty until the store step is
    /// answered.
    pub fn owner_name(&self) -> &str {
        self.record.owner_name().unwrap_or_default()
    }

    /// Merges a validated step into the record and moves to the next step.
    pub fn advance(&mut self, result: StepResult) -> Result<WizardState, WizardError> {
        let step = result.step();
        if self.state != WizardState::Editing(step) {
            return Err(WizardError::WrongStep {
                state: self.state,
                got: step,
            });
        }

        self.merge(result);
        let next = self.next_step(step);
        self.state = WizardState::Editing(next);
        info!(session = %self.session_id, from = ?step, to = ?next, "advanced");
        Ok(self.state)
    }

    /// Returns to the previous step on the answered path. Entered values
    /// stay in the record.
    pub fn back(&mut self) -> WizardState {
        if let WizardState::Editing(step) = self.state {
            self.state = WizardState::Editing(self.previous_step(step));
        }
        self.state
    }

    pub async fn submit(&mut self) -> Result<(), WizardError> {
        if self.state != WizardState::Editing(StepId::Confirmation) {
            return Err(WizardError::NotOnConfirmation(self.state));
        }
        self.record.check_complete()?;

        self.state = WizardState::Submitting;
        // Dropping this future mid-request lands back on Confirmation too.
        let guard = SubmittingGuard {
            state: &mut self.state,
        };
        let outcome = self.backend.submit_survey(&self.record).await;
        match outcome {
            Ok(reply) if reply.success => {
                *guard.state = WizardState::Success;
                info!(session = %self.session_id, "survey submitted");
                Ok(())
            }
            Ok(reply) => {
                let message = reply.error.unwrap_or_else(|| "unknown error".to_string());
                warn!(session = %self.session_id, error = %message, "survey rejected");
                Err(WizardError::Rejected(message))
            }
            Err(error) => {
                warn!(session = %self.session_id, %error, "survey submission failed");
                Err(WizardError::Transport(error))
            }
        }
    }

    pub fn reset(&mut self) {
        self.record = SurveyRecord::default();
        self.state = WizardState::Editing(StepId::Store);
        self.session_id = Uuid::new_v4();
    }

    fn merge(&mut self, result: StepResult) {
        let record = &mut self.record;
        match result {
            StepResult::Store(answers) => {
                if record.owner_name().is_some_and(|owner| owner != answers.store_name) {
                    // Stored keys live under the old name.
                    record.photos.clear();
                    record.construction_documents.clear();
                    record.facility_document = None;
                }
                record.store_name = Some(answers.store_name);
                record.phone_number = Some(answers.phone_number);
                record.needs_direct_communication = Some(answers.needs_direct_communication);
                if answers.needs_direct_communication == YesNo::No {
                    record.clear_manager();
                }
            }
            StepResult::FacilityManager(answers) => {
                record.manager_name = Some(answers.manager_name);
                record.manager_phone = Some(answers.manager_phone);
            }
            StepResult::Photos(answers) => record.photos = answers.photos,
            StepResult::Construction(answers) => {
                record.unavailable_dates = Some(answers.unavailable_dates);
                record.construction_possibility = Some(answers.construction_possibility);
                record.construction_possibility_other = answers.construction_possibility_other;
                record.required_documents = answers.required_documents;
                record.submission_method = Some(answers.submission_method);
                record.fax_number = answers.fax_number;
                record.email_address = answers.email_address;
                record.other_submission_details = answers.other_submission_details;
                record.required_items = answers.required_items;
                record.application_deadline = Some(answers.application_deadline);
                record.construction_documents = answers.construction_documents;
            }
            StepResult::FacilityAccess(answers) => {
                record.entry_procedures = Some(answers.entry_procedures);
                record.loading_procedures = Some(answers.loading_procedures);
                record.facility_document = answers.facility_document;
            }
            StepResult::WorkDetails(answers) => {
                record.parking_option = Some(answers.parking_option);
                record.parking_option_other = answers.parking_option_other;
                record.night_time_restriction = Some(answers.night_time_restriction);
                record.restriction_details = answers.restriction_details;
                record.auto_light_off = Some(answers.auto_light_off);
                record.light_off_details = answers.light_off_details;
                record.backyard_key_management = Some(answers.backyard_key_management);
                record.server_rack_key_management = Some(answers.server_rack_key_management);
                record.other_considerations = answers.other_considerations;
            }
        }
    }

    fn next_step(&self, from: StepId) -> StepId {
        match from {
            StepId::Store if self.record.direct_communication() => StepId::FacilityManager,
            StepId::Store | StepId::FacilityManager => StepId::Photos,
            StepId::Photos => StepId::Construction,
            StepId::Construction => StepId::FacilityAccess,
            StepId::FacilityAccess => StepId::WorkDetails,
            StepId::WorkDetails | StepId::Confirmation => StepId::Confirmation,
        }
    }

    fn previous_step(&self, from: StepId) -> StepId {
        match from {
            StepId::Store | StepId::FacilityManager => StepId::Store,
            StepId::Photos if self.record.direct_communication() => StepId::FacilityManager,
            StepId::Photos => StepId::Store,
            StepId::Construction => StepId::Photos,
            StepId::FacilityAccess => StepId::Construction,
            StepId::WorkDetails => StepId::FacilityAccess,
            StepId::Confirmation => StepId::WorkDetails,
        }
    }

    pub fn prefill_store(&self) -> StoreInput {
        let record = &self.record;
        StoreInput {
            store_name: record.store_name.clone().unwrap_or_default(),
            phone_number: record.phone_number.clone().unwrap_or_default(),
            needs_direct_communication: id_or_empty(record.needs_direct_communication.map(|v| v.id())),
        }
    }

    pub fn prefill_manager(&self) -> ManagerInput {
        ManagerInput {
            manager_name: self.record.manager_name.clone().unwrap_or_default(),
            manager_phone: self.record.manager_phone.clone().unwrap_or_default(),
        }
    }

    pub fn prefill_photos(&self) -> PhotosInput {
        PhotosInput {
            files: Default::default(),
            kept: self.record.photos.clone(),
        }
    }

    pub fn prefill_construction(&self) -> ConstructionInput {
        let record = &self.record;
        ConstructionInput {
            unavailable_dates: record.unavailable_dates.clone().unwrap_or_default(),
            construction_possibility: id_or_empty(record.construction_possibility.map(|v| v.id())),
            construction_possibility_other: record
                .construction_possibility_other
                .clone()
                .unwrap_or_default(),
            required_documents: record
                .required_documents
                .iter()
                .map(|document| document.id().to_string())
                .collect(),
            submission_method: id_or_empty(record.submission_method.map(|v| v.id())),
            fax_number: record.fax_number.clone().unwrap_or_default(),
            email_address: record.email_address.clone().unwrap_or_default(),
            other_submission_details: record.other_submission_details.clone().unwrap_or_default(),
            required_items: record.required_items.clone().unwrap_or_default(),
            application_deadline: record.application_deadline.clone().unwrap_or_default(),
            documents: Default::default(),
            kept_documents: record.construction_documents.clone(),
        }
    }

    pub fn prefill_facility_access(&self) -> FacilityAccessInput {
        FacilityAccessInput {
            entry_procedures: self.record.entry_procedures.clone().unwrap_or_default(),
            loading_procedures: self.record.loading_procedures.clone().unwrap_or_default(),
            entrance_guide: None,
            kept_entrance_guide: self.record.facility_document.clone(),
        }
    }

    pub fn prefill_work_details(&self) -> WorkDetailsInput {
        let record = &self.record;
        WorkDetailsInput {
            parking_option: id_or_empty(record.parking_option.map(|v| v.id())),
            parking_option_other: record.parking_option_other.clone().unwrap_or_default(),
            night_time_restriction: id_or_empty(record.night_time_restriction.map(|v| v.id())),
            restriction_details: record.restriction_details.clone().unwrap_or_default(),
            auto_light_off: id_or_empty(record.auto_light_off.map(|v| v.id())),
            light_off_details: record.light_off_details.clone().unwrap_or_default(),
            backyard_key_management: record.backyard_key_management.clone().unwrap_or_default(),
            server_rack_key_management: record
                .server_rack_key_management
                .clone()
                .unwrap_or_default(),
            other_considerations: record.other_considerations.clone().unwrap_or_default(),
        }
    }

    /// The confirmation listing: every question with its display value.
    /// Files show the name they were stored under.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let cells = answer_cells(&self.record, &|key| {
            key.rsplit('/').next().unwrap_or(key).to_string()
        });
        QUESTIONS.iter().copied().zip(cells).collect()
    }

    /// Slots that already hold an uploaded file.
    pub fn uploaded_slots(&self) -> Vec<FileSlot> {
        self.record.stored_keys().into_iter().map(|(slot, _)| slot).collect()
    }
}

/// Returns a wizard left in `Submitting` to the confirmation step.
struct SubmittingGuard<'a> {
    state: &'a mut WizardState,
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        if *self.state == WizardState::Submitting {
            *self.state = WizardState::Editing(StepId::Confirmation);
        }
    }
}

fn id_or_empty(id: Option<&'static str>) -> String {
    id.unwrap_or_default().to_string()
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
