use shared::domain::{FileSlot, SlotKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("owner name is empty after removing path-unsafe characters")]
    EmptyOwner,
    #[error("unsupported content type {content_type:?} for slot {slot}")]
    UnsupportedContentType {
        slot: FileSlot,
        content_type: String,
    },
}

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", ".png"),
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/pjpeg", ".jpg"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/heic", ".heic"),
    ("image/heif", ".heif"),
];

const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("application/pdf", ".pdf"),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("application/vnd.ms-excel", ".xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
];

/// Strips characters that would break out of the owner's key prefix.
pub fn sanitize_owner_name(raw: &str) -> Result<String, KeyError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '#' | '%' | '*' | ':' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.' || c == '_') {
        return Err(KeyError::EmptyOwner);
    }
    Ok(cleaned)
}

/// Extension stored for `content_type` in `slot`. Photo slots accept images
/// only; document slots also accept PDF and office formats.
pub fn extension_for(slot: FileSlot, content_type: &str) -> Result<&'static str, KeyError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let documents_allowed = slot.kind() != SlotKind::Photo;

    IMAGE_TYPES
        .iter()
        .chain(DOCUMENT_TYPES.iter().filter(|_| documents_allowed))
        .find(|(mime, _)| *mime == essence)
        .map(|(_, extension)| *extension)
        .ok_or_else(|| KeyError::UnsupportedContentType {
            slot,
            content_type: content_type.to_string(),
        })
}

/// `<owner>/<slot label><extension>`
pub fn object_key(owner_name: &str, slot: FileSlot, content_type: &str) -> Result<String, KeyError> {
    let owner = sanitize_owner_name(owner_name)?;
    let extension = extension_for(slot, content_type)?;
    Ok(format!("{owner}/{}{extension}", slot.label()))
}

/// Whether `key` is a key [`object_key`] could have produced for this owner
/// and slot.
pub fn key_matches_slot(key: &str, owner_name: &str, slot: FileSlot) -> bool {
    let Ok(owner) = sanitize_owner_name(owner_name) else {
        return false;
    };
    let Some(extension) = key
        .strip_prefix(owner.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|rest| rest.strip_prefix(slot.label()))
    else {
        return false;
    };
    IMAGE_TYPES
        .iter()
        .chain(DOCUMENT_TYPES.iter().filter(|_| slot.kind() != SlotKind::Photo))
        .any(|(_, known)| *known == extension)
}
