use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of answer values. Each variant carries its wire id
/// and the label shown on the confirmation page and in the spreadsheet.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $id:literal => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $id)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn id(self) -> &'static str {
                match self {
                    $($name::$variant => $id,)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw.trim() {
                    $($id => Ok($name::$variant),)+
                    other => Err(UnknownValue {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.id())
            }
        }
    };
}

labelled_enum!(YesNo {
    Yes = "yes" => "はい",
    No = "no" => "いいえ",
});

labelled_enum!(ConstructionPossibility {
    Possible = "possible" => "作業可能",
    Impossible = "impossible" => "作業不可",
    Partially = "partially" => "条件つきで可能",
    Other = "other" => "その他",
});

labelled_enum!(SubmissionMethod {
    Fax = "fax" => "FAX",
    Email = "email" => "メール",
    Other = "other" => "その他",
});

labelled_enum!(ParkingOption {
    Dedicated = "dedicated" => "作業用駐車場あり",
    CustomerFree = "customer_free" => "お客様用駐車場に駐車可能",
    CustomerPaid = "customer_paid" => "お客様用駐車場に駐車可能（有料）",
    Nearby = "nearby" => "駐車なし、近隣の駐車場に停める必要があり",
    Street = "street" => "路面上に駐車可能",
    Other = "other" => "その他",
});

labelled_enum!(RequiredDocument {
    Construction = "construction" => "工事作業申請書",
    Fire = "fire" => "消防作業申請書",
    Facility = "facility" => "設備管理申請書",
    Other = "other" => "その他書類",
});

labelled_enum!(
    /// A fixed attachment point of the survey. The label doubles as the file
    /// stem of the stored object.
    FileSlot {
        Front = "front" => "店舗外観_正面",
        Left = "left" => "店舗外観_左",
        Right = "right" => "店舗外観_右",
        Ceiling = "ceiling" => "店舗内観_天井",
        Backyard = "backyard" => "バックヤード全体",
        ServerRack = "server" => "サーバーラック内",
        ConstructionDocument = "construction-document" => "工事作業申請書",
        FireDocument = "fire-document" => "消防作業申請書",
        FacilityDocument = "facility-document" => "設備管理申請書",
        OtherDocument = "other-document" => "その他書類",
        EntranceGuide = "entrance-guide" => "入館説明用資料",
    }
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Photo,
    ConstructionDocument,
    FacilityDocument,
}

impl FileSlot {
    pub const PHOTOS: [FileSlot; 6] = [
        FileSlot::Front,
        FileSlot::Left,
        FileSlot::Right,
        FileSlot::Ceiling,
        FileSlot::Backyard,
        FileSlot::ServerRack,
    ];

    pub fn kind(self) -> SlotKind {
        match self {
            FileSlot::Front
            | FileSlot::Left
            | FileSlot::Right
            | FileSlot::Ceiling
            | FileSlot::Backyard
            | FileSlot::ServerRack => SlotKind::Photo,
            FileSlot::ConstructionDocument
            | FileSlot::FireDocument
            | FileSlot::FacilityDocument
            | FileSlot::OtherDocument => SlotKind::ConstructionDocument,
            FileSlot::EntranceGuide => SlotKind::FacilityDocument,
        }
    }

    /// Maximum accepted upload size for the slot.
    pub fn max_bytes(self) -> u64 {
        match self.kind() {
            SlotKind::Photo => 50 * 1024 * 1024,
            SlotKind::ConstructionDocument | SlotKind::FacilityDocument => 10 * 1024 * 1024,
        }
    }

    pub fn for_document(document: RequiredDocument) -> FileSlot {
        match document {
            RequiredDocument::Construction => FileSlot::ConstructionDocument,
            RequiredDocument::Fire => FileSlot::FireDocument,
            RequiredDocument::Facility => FileSlot::FacilityDocument,
            RequiredDocument::Other => FileSlot::OtherDocument,
        }
    }

    pub fn document(self) -> Option<RequiredDocument> {
        match self {
            FileSlot::ConstructionDocument => Some(RequiredDocument::Construction),
            FileSlot::FireDocument => Some(RequiredDocument::Fire),
            FileSlot::FacilityDocument => Some(RequiredDocument::Facility),
            FileSlot::OtherDocument => Some(RequiredDocument::Other),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_ids_round_trip_through_serde() {
        let json = serde_json::to_string(&FileSlot::ConstructionDocument).expect("json");
        assert_eq!(json, "\"construction-document\"");
        let parsed: FileSlot = serde_json::from_str("\"server\"").expect("slot");
        assert_eq!(parsed, FileSlot::ServerRack);
    }

    #[test]
    fn unknown_slot_is_rejected() {
        assert!(serde_json::from_str::<FileSlot>("\"facility_document\"").is_err());
        let err = "roof".parse::<FileSlot>().expect_err("unknown slot");
        assert_eq!(err.kind, "FileSlot");
    }

    #[test]
    fn document_slots_map_back_to_their_document() {
        for document in RequiredDocument::ALL {
            assert_eq!(FileSlot::for_document(*document).document(), Some(*document));
        }
        assert_eq!(FileSlot::Front.document(), None);
    }
}
