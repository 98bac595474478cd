use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(PatientId);
id_newtype!(ChildId);

/// Encounter identifiers are issued upstream and treated as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncounterId(String);

impl EncounterId {
    /// Trims the raw search input; returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Doctor,
    Nurse,
    Finance,
    Admin,
}

impl std::str::FromStr for StaffRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "doctor" => Ok(Self::Doctor),
            "nurse" => Ok(Self::Nurse),
            "finance" => Ok(Self::Finance),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown staff role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildKind {
    VitalSign,
    ClinicalNote,
    Prescription,
    LabOrder,
    ImagingOrder,
}

impl ChildKind {
    pub const ALL: [ChildKind; 5] = [
        ChildKind::VitalSign,
        ChildKind::ClinicalNote,
        ChildKind::Prescription,
        ChildKind::LabOrder,
        ChildKind::ImagingOrder,
    ];

    /// URL segment used by the records API.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::VitalSign => "vital-signs",
            Self::ClinicalNote => "clinical-notes",
            Self::Prescription => "prescriptions",
            Self::LabOrder => "lab-orders",
            Self::ImagingOrder => "imaging-orders",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.path_segment() == segment)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VitalSign => "vital sign",
            Self::ClinicalNote => "clinical note",
            Self::Prescription => "prescription",
            Self::LabOrder => "lab order",
            Self::ImagingOrder => "imaging order",
        }
    }

    /// Status a freshly created (or replacement) version starts in.
    pub fn initial_status(self) -> ChildStatus {
        match self {
            Self::VitalSign | Self::ClinicalNote => ChildStatus::Draft,
            Self::Prescription | Self::LabOrder | Self::ImagingOrder => ChildStatus::Pending,
        }
    }

    /// Terminal status reached by dispensing or completing a signed record.
    pub fn fulfilment_status(self) -> Option<ChildStatus> {
        match self {
            Self::Prescription => Some(ChildStatus::Dispensed),
            Self::LabOrder | Self::ImagingOrder => Some(ChildStatus::Completed),
            Self::VitalSign | Self::ClinicalNote => None,
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ChildKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "vital-sign" | "vital-signs" | "vitals" => Ok(Self::VitalSign),
            "clinical-note" | "clinical-notes" | "note" | "notes" => Ok(Self::ClinicalNote),
            "prescription" | "prescriptions" => Ok(Self::Prescription),
            "lab-order" | "lab-orders" | "lab" => Ok(Self::LabOrder),
            "imaging-order" | "imaging-orders" | "imaging" => Ok(Self::ImagingOrder),
            other => Err(format!("unknown record kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildStatus {
    Draft,
    Pending,
    Signed,
    Superseded,
    Dispensed,
    Completed,
    Cancelled,
}

impl ChildStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Superseded | Self::Dispensed | Self::Completed | Self::Cancelled
        )
    }

    pub fn can_sign(self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }

    pub fn can_replace(self) -> bool {
        self == Self::Signed
    }

    pub fn can_fulfil(self, kind: ChildKind) -> bool {
        self == Self::Signed && kind.fulfilment_status().is_some()
    }

    pub fn can_cancel(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Signed => "SIGNED",
            Self::Superseded => "SUPERSEDED",
            Self::Dispensed => "DISPENSED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
