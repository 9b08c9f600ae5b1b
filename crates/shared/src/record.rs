use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ConstructionPossibility, FileSlot, ParkingOption, RequiredDocument, SubmissionMethod, YesNo,
};

/// The answers collected across every step of one survey session. Storage
/// fields hold object keys, never URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_direct_communication: Option<YesNo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_phone: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub photos: BTreeMap<FileSlot, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_dates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction_possibility: Option<ConstructionPossibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction_possibility_other: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_documents: Vec<RequiredDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_method: Option<SubmissionMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_submission_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_items: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub construction_documents: BTreeMap<FileSlot, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_procedures: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_procedures: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_document: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_option: Option<ParkingOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_option_other: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night_time_restriction: Option<YesNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_light_off: Option<YesNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_off_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backyard_key_management: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_rack_key_management: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_considerations: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing required fields: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("fields outside the answered path: {}", .0.join(", "))]
    Unexpected(Vec<&'static str>),
    #[error("slot {slot} is not valid for field {field}")]
    MisplacedSlot { field: &'static str, slot: FileSlot },
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl SurveyRecord {
    /// The key prefix every stored object of this survey lives under.
    pub fn owner_name(&self) -> Option<&str> {
        self.store_name.as_deref().filter(|name| !name.trim().is_empty())
    }

    pub fn direct_communication(&self) -> bool {
        self.needs_direct_communication == Some(YesNo::Yes)
    }

    /// Every stored object key together with its slot.
    pub fn stored_keys(&self) -> Vec<(FileSlot, &str)> {
        let mut keys: Vec<(FileSlot, &str)> = self
            .photos
            .iter()
            .chain(self.construction_documents.iter())
            .map(|(slot, key)| (*slot, key.as_str()))
            .collect();
        if let Some(key) = self.facility_document.as_deref() {
            keys.push((FileSlot::EntranceGuide, key));
        }
        keys
    }

    pub fn clear_manager(&mut self) {
        self.manager_name = None;
        self.manager_phone = None;
    }

    /// Checks the record holds every field the answered path requires and
    /// nothing from a branch that was not taken.
    pub fn check_complete(&self) -> Result<(), RecordError> {
        let mut missing = Vec::new();
        let mut require = |name: &'static str, present: bool| {
            if !present {
                missing.push(name);
            }
        };

        require("store_name", filled(&self.store_name));
        require("phone_number", filled(&self.phone_number));
        require(
            "needs_direct_communication",
            self.needs_direct_communication.is_some(),
        );
        if self.direct_communication() {
            require("manager_name", filled(&self.manager_name));
            require("manager_phone", filled(&self.manager_phone));
        }

        for slot in FileSlot::PHOTOS {
            if !self.photos.contains_key(&slot) {
                require("photos", false);
                break;
            }
        }

        require("unavailable_dates", filled(&self.unavailable_dates));
        require(
            "construction_possibility",
            self.construction_possibility.is_some(),
        );
        if self.construction_possibility == Some(ConstructionPossibility::Other) {
            require(
                "construction_possibility_other",
                filled(&self.construction_possibility_other),
            );
        }
        require("required_documents", !self.required_documents.is_empty());
        require("submission_method", self.submission_method.is_some());
        match self.submission_method {
            Some(SubmissionMethod::Fax) => require("fax_number", filled(&self.fax_number)),
            Some(SubmissionMethod::Email) => {
                require("email_address", filled(&self.email_address))
            }
            Some(SubmissionMethod::Other) => require(
                "other_submission_details",
                filled(&self.other_submission_details),
            ),
            None => {}
        }
        require("application_deadline", filled(&self.application_deadline));

        require("entry_procedures", filled(&self.entry_procedures));
        require("loading_procedures", filled(&self.loading_procedures));

        require("parking_option", self.parking_option.is_some());
        if self.parking_option == Some(ParkingOption::Other) {
            require("parking_option_other", filled(&self.parking_option_other));
        }
        require(
            "night_time_restriction",
            self.night_time_restriction.is_some(),
        );
        require("auto_light_off", self.auto_light_off.is_some());
        require(
            "backyard_key_management",
            filled(&self.backyard_key_management),
        );
        require(
            "server_rack_key_management",
            filled(&self.server_rack_key_management),
        );

        if !missing.is_empty() {
            return Err(RecordError::Missing(missing));
        }

        if !self.direct_communication() {
            let mut unexpected = Vec::new();
            if self.manager_name.is_some() {
                unexpected.push("manager_name");
            }
            if self.manager_phone.is_some() {
                unexpected.push("manager_phone");
            }
            if !unexpected.is_empty() {
                return Err(RecordError::Unexpected(unexpected));
            }
        }

        self.check_slots()
    }

    fn check_slots(&self) -> Result<(), RecordError> {
        if let Some(slot) = self
            .photos
            .keys()
            .find(|slot| slot.kind() != crate::domain::SlotKind::Photo)
        {
            return Err(RecordError::MisplacedSlot {
                field: "photos",
                slot: *slot,
            });
        }
        if let Some(slot) = self
            .construction_documents
            .keys()
            .find(|slot| slot.kind() != crate::domain::SlotKind::ConstructionDocument)
        {
            return Err(RecordError::MisplacedSlot {
                field: "construction_documents",
                slot: *slot,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod tests;
