//! Form-side drafts for child records.
//!
//! A draft mirrors what an operator has typed so far, so every field is
//! optional. [`ChildDraft::validate`] is the only way to turn one into a
//! [`ChildPayload`] outside this crate.

use thiserror::Error;

use crate::{
    domain::ChildKind,
    protocol::{
        ChildPayload, ClinicalNotePayload, ImagingModality, ImagingOrderPayload, LabOrderPayload,
        NoteType, OrderPriority, PrescriptionItem, PrescriptionPayload, VitalSignPayload,
    },
};

const MIN_TEMPERATURE_C: f64 = 25.0;
const MAX_TEMPERATURE_C: f64 = 45.0;
const MAX_HEART_RATE_BPM: u16 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("{kind} requires {field}")]
    MissingField {
        kind: ChildKind,
        field: &'static str,
    },
    #[error("{kind} field {field} is out of range: {detail}")]
    OutOfRange {
        kind: ChildKind,
        field: &'static str,
        detail: String,
    },
    #[error("prescription item {index} requires {field}")]
    InvalidItem { index: usize, field: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VitalSignDraft {
    pub temperature_c: Option<f64>,
    pub heart_rate_bpm: Option<u16>,
    pub systolic_mmhg: Option<u16>,
    pub diastolic_mmhg: Option<u16>,
    pub respiratory_rate: Option<u16>,
    pub oxygen_saturation: Option<u8>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClinicalNoteDraft {
    pub note_type: Option<NoteType>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrescriptionItemDraft {
    pub medicine_id: Option<i64>,
    pub dosage: Option<String>,
    pub quantity: Option<u32>,
    pub frequency: Option<String>,
    pub duration_days: Option<u32>,
    pub instructions: Option<String>,
}

impl PrescriptionItemDraft {
    pub fn new(medicine_id: i64, dosage: impl Into<String>, quantity: u32) -> Self {
        Self {
            medicine_id: Some(medicine_id),
            dosage: Some(dosage.into()),
            quantity: Some(quantity),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrescriptionDraft {
    pub items: Vec<PrescriptionItemDraft>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabOrderDraft {
    pub test_ids: Vec<i64>,
    pub priority: Option<OrderPriority>,
    pub clinical_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagingOrderDraft {
    pub modality: Option<ImagingModality>,
    pub body_part: Option<String>,
    pub priority: Option<OrderPriority>,
    pub clinical_indication: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChildDraft {
    VitalSign(VitalSignDraft),
    ClinicalNote(ClinicalNoteDraft),
    Prescription(PrescriptionDraft),
    LabOrder(LabOrderDraft),
    ImagingOrder(ImagingOrderDraft),
}

impl ChildDraft {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::VitalSign(_) => ChildKind::VitalSign,
            Self::ClinicalNote(_) => ChildKind::ClinicalNote,
            Self::Prescription(_) => ChildKind::Prescription,
            Self::LabOrder(_) => ChildKind::LabOrder,
            Self::ImagingOrder(_) => ChildKind::ImagingOrder,
        }
    }

    pub fn validate(&self) -> Result<ChildPayload, DraftError> {
        match self {
            Self::VitalSign(draft) => validate_vital_sign(draft).map(ChildPayload::VitalSign),
            Self::ClinicalNote(draft) => validate_note(draft).map(ChildPayload::ClinicalNote),
            Self::Prescription(draft) => {
                validate_prescription(draft).map(ChildPayload::Prescription)
            }
            Self::LabOrder(draft) => validate_lab_order(draft).map(ChildPayload::LabOrder),
            Self::ImagingOrder(draft) => validate_imaging(draft).map(ChildPayload::ImagingOrder),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_vital_sign(draft: &VitalSignDraft) -> Result<VitalSignPayload, DraftError> {
    let kind = ChildKind::VitalSign;
    let temperature_c = draft.temperature_c.ok_or(DraftError::MissingField {
        kind,
        field: "temperature_c",
    })?;
    let heart_rate_bpm = draft.heart_rate_bpm.ok_or(DraftError::MissingField {
        kind,
        field: "heart_rate_bpm",
    })?;

    if !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&temperature_c) {
        return Err(DraftError::OutOfRange {
            kind,
            field: "temperature_c",
            detail: format!("{temperature_c} not within {MIN_TEMPERATURE_C}..={MAX_TEMPERATURE_C}"),
        });
    }
    if heart_rate_bpm == 0 || heart_rate_bpm > MAX_HEART_RATE_BPM {
        return Err(DraftError::OutOfRange {
            kind,
            field: "heart_rate_bpm",
            detail: format!("{heart_rate_bpm} not within 1..={MAX_HEART_RATE_BPM}"),
        });
    }
    match (draft.systolic_mmhg, draft.diastolic_mmhg) {
        (Some(_), None) => {
            return Err(DraftError::MissingField {
                kind,
                field: "diastolic_mmhg",
            })
        }
        (None, Some(_)) => {
            return Err(DraftError::MissingField {
                kind,
                field: "systolic_mmhg",
            })
        }
        _ => {}
    }
    if let Some(saturation) = draft.oxygen_saturation {
        if saturation > 100 {
            return Err(DraftError::OutOfRange {
                kind,
                field: "oxygen_saturation",
                detail: format!("{saturation} exceeds 100"),
            });
        }
    }

    Ok(VitalSignPayload {
        temperature_c,
        heart_rate_bpm,
        systolic_mmhg: draft.systolic_mmhg,
        diastolic_mmhg: draft.diastolic_mmhg,
        respiratory_rate: draft.respiratory_rate,
        oxygen_saturation: draft.oxygen_saturation,
        weight_kg: draft.weight_kg,
        height_cm: draft.height_cm,
    })
}

fn validate_note(draft: &ClinicalNoteDraft) -> Result<ClinicalNotePayload, DraftError> {
    let content = non_blank(&draft.content).ok_or(DraftError::MissingField {
        kind: ChildKind::ClinicalNote,
        field: "content",
    })?;
    Ok(ClinicalNotePayload {
        note_type: draft.note_type.unwrap_or(NoteType::Progress),
        title: non_blank(&draft.title),
        content,
    })
}

fn validate_prescription(draft: &PrescriptionDraft) -> Result<PrescriptionPayload, DraftError> {
    if draft.items.is_empty() {
        return Err(DraftError::MissingField {
            kind: ChildKind::Prescription,
            field: "at least one item",
        });
    }

    let mut items = Vec::with_capacity(draft.items.len());
    for (index, item) in draft.items.iter().enumerate() {
        let medicine_id = item.medicine_id.ok_or(DraftError::InvalidItem {
            index,
            field: "medicine_id",
        })?;
        let dosage = non_blank(&item.dosage).ok_or(DraftError::InvalidItem {
            index,
            field: "dosage",
        })?;
        let quantity = item
            .quantity
            .filter(|q| *q > 0)
            .ok_or(DraftError::InvalidItem {
                index,
                field: "a positive quantity",
            })?;
        items.push(PrescriptionItem {
            medicine_id,
            dosage,
            quantity,
            frequency: non_blank(&item.frequency),
            duration_days: item.duration_days,
            instructions: non_blank(&item.instructions),
        });
    }

    Ok(PrescriptionPayload {
        items,
        notes: non_blank(&draft.notes),
    })
}

fn validate_lab_order(draft: &LabOrderDraft) -> Result<LabOrderPayload, DraftError> {
    if draft.test_ids.is_empty() {
        return Err(DraftError::MissingField {
            kind: ChildKind::LabOrder,
            field: "at least one test",
        });
    }
    Ok(LabOrderPayload {
        test_ids: draft.test_ids.clone(),
        priority: draft.priority.unwrap_or_default(),
        clinical_notes: non_blank(&draft.clinical_notes),
    })
}

fn validate_imaging(draft: &ImagingOrderDraft) -> Result<ImagingOrderPayload, DraftError> {
    let kind = ChildKind::ImagingOrder;
    let modality = draft.modality.ok_or(DraftError::MissingField {
        kind,
        field: "modality",
    })?;
    let body_part = non_blank(&draft.body_part).ok_or(DraftError::MissingField {
        kind,
        field: "body_part",
    })?;
    Ok(ImagingOrderPayload {
        modality,
        body_part,
        priority: draft.priority.unwrap_or_default(),
        clinical_indication: non_blank(&draft.clinical_indication),
    })
}
