//! The answers file: one TOML table per survey step, with file slots
//! pointing at paths relative to the file itself.
//!
//! ```toml
//! [store]
//! store_name = "ACME 渋谷店"
//! phone_number = "03-1234-5678"
//! needs_direct_communication = "no"
//!
//! [photos]
//! front = "photos/front.jpg"
//!
//! [construction.files]
//! construction-document = "docs/application.pdf"
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use client_core::{
    forms::{
        ConstructionInput, FacilityAccessInput, ManagerInput, PhotosInput, StoreInput,
        WorkDetailsInput,
    },
    PendingFile,
};
use serde::Deserialize;
use shared::domain::FileSlot;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnswersFile {
    store: StoreInput,
    facility_manager: ManagerInput,
    photos: BTreeMap<String, PathBuf>,
    construction: ConstructionSection,
    facility_access: FacilityAccessSection,
    work_details: WorkDetailsInput,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConstructionSection {
    #[serde(flatten)]
    input: ConstructionInput,
    files: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FacilityAccessSection {
    #[serde(flatten)]
    input: FacilityAccessInput,
    entrance_guide_file: Option<PathBuf>,
}

/// Every step's input with its files already read into memory.
#[derive(Debug)]
pub struct Answers {
    pub store: StoreInput,
    pub facility_manager: ManagerInput,
    pub photos: PhotosInput,
    pub construction: ConstructionInput,
    pub facility_access: FacilityAccessInput,
    pub work_details: WorkDetailsInput,
}

pub async fn load_answers(path: &Path) -> Result<Answers> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read answers file {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_answers(&raw, base).await
}

pub async fn parse_answers(raw: &str, base: &Path) -> Result<Answers> {
    let file: AnswersFile = toml::from_str(raw).context("invalid answers file")?;

    let photos = PhotosInput {
        files: read_slots(base, &file.photos).await?,
        kept: BTreeMap::new(),
    };

    let mut construction = file.construction.input;
    construction.documents = read_slots(base, &file.construction.files).await?;

    let mut facility_access = file.facility_access.input;
    if let Some(relative) = &file.facility_access.entrance_guide_file {
        facility_access.entrance_guide = Some(PendingFile::from_path(&base.join(relative)).await?);
    }

    Ok(Answers {
        store: file.store,
        facility_manager: file.facility_manager,
        photos,
        construction,
        facility_access,
        work_details: file.work_details,
    })
}

async fn read_slots(
    base: &Path,
    entries: &BTreeMap<String, PathBuf>,
) -> Result<BTreeMap<FileSlot, PendingFile>> {
    let mut files = BTreeMap::new();
    for (id, relative) in entries {
        let slot: FileSlot = id.parse()?;
        let file = PendingFile::from_path(&base.join(relative)).await?;
        files.insert(slot, file);
    }
    Ok(files)
}

#[cfg(test)]
#[path = "tests/answers_tests.rs"]
mod tests;
