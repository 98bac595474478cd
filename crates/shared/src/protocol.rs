use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChildId, ChildKind, ChildStatus, EncounterId, EncounterStatus, PatientId, UserId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub patient_id: PatientId,
    pub full_name: String,
}

/// Parent record every child collection is scoped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub encounter_id: EncounterId,
    pub patient: PatientSummary,
    pub status: EncounterStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_doctor: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Progress,
    Soap,
    Admission,
    Discharge,
    Consultation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    #[default]
    Routine,
    Urgent,
    Stat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagingModality {
    XRay,
    Ct,
    Mri,
    Ultrasound,
}

// Payload structs are `non_exhaustive` so that other crates can only obtain
// them through `ChildDraft::validate` (or by deserializing a server response).

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct VitalSignPayload {
    pub temperature_c: f64,
    pub heart_rate_bpm: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic_mmhg: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic_mmhg: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ClinicalNotePayload {
    pub note_type: NoteType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PrescriptionItem {
    pub medicine_id: i64,
    pub dosage: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PrescriptionPayload {
    pub items: Vec<PrescriptionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LabOrderPayload {
    pub test_ids: Vec<i64>,
    #[serde(default)]
    pub priority: OrderPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ImagingOrderPayload {
    pub modality: ImagingModality,
    pub body_part: String,
    #[serde(default)]
    pub priority: OrderPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_indication: Option<String>,
}

/// Validated create/replace body, tagged by kind on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildPayload {
    VitalSign(VitalSignPayload),
    ClinicalNote(ClinicalNotePayload),
    Prescription(PrescriptionPayload),
    LabOrder(LabOrderPayload),
    ImagingOrder(ImagingOrderPayload),
}

impl ChildPayload {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::VitalSign(_) => ChildKind::VitalSign,
            Self::ClinicalNote(_) => ChildKind::ClinicalNote,
            Self::Prescription(_) => ChildKind::Prescription,
            Self::LabOrder(_) => ChildKind::LabOrder,
            Self::ImagingOrder(_) => ChildKind::ImagingOrder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSignBody {
    #[serde(flatten)]
    pub reading: VitalSignPayload,
    /// Computed by the server from weight and height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionBody {
    #[serde(flatten)]
    pub prescription: PrescriptionPayload,
    /// Computed by the server from the medicine catalogue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
}

/// Server-side view of a child record's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildBody {
    VitalSign(VitalSignBody),
    ClinicalNote(ClinicalNotePayload),
    Prescription(PrescriptionBody),
    LabOrder(LabOrderPayload),
    ImagingOrder(ImagingOrderPayload),
}

impl ChildBody {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::VitalSign(_) => ChildKind::VitalSign,
            Self::ClinicalNote(_) => ChildKind::ClinicalNote,
            Self::Prescription(_) => ChildKind::Prescription,
            Self::LabOrder(_) => ChildKind::LabOrder,
            Self::ImagingOrder(_) => ChildKind::ImagingOrder,
        }
    }

    /// Body as submitted, before any server-derived fields are filled in.
    pub fn from_payload(payload: ChildPayload) -> Self {
        match payload {
            ChildPayload::VitalSign(reading) => {
                Self::VitalSign(VitalSignBody { reading, bmi: None })
            }
            ChildPayload::ClinicalNote(note) => Self::ClinicalNote(note),
            ChildPayload::Prescription(prescription) => Self::Prescription(PrescriptionBody {
                prescription,
                total_cost: None,
            }),
            ChildPayload::LabOrder(order) => Self::LabOrder(order),
            ChildPayload::ImagingOrder(order) => Self::ImagingOrder(order),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub child_id: ChildId,
    pub encounter_id: EncounterId,
    pub status: ChildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<ChildId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<ChildId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub body: ChildBody,
}

impl ChildRecord {
    pub fn kind(&self) -> ChildKind {
        self.body.kind()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    pub signed_by: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceRequest {
    pub reason: String,
    pub requested_by: UserId,
    pub payload: ChildPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfilRequest {
    pub performed_by: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
    pub performed_by: UserId,
}
