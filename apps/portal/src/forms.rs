//! Command-line forms for each record kind.

use clap::{Args, Subcommand};
use shared::{
    domain::ChildKind,
    draft::{
        ChildDraft, ClinicalNoteDraft, ImagingOrderDraft, LabOrderDraft, PrescriptionDraft,
        PrescriptionItemDraft, VitalSignDraft,
    },
    protocol::{ImagingModality, NoteType, OrderPriority},
};

#[derive(Subcommand, Debug)]
pub enum Form {
    /// One `--item medicine:dosage:quantity` per medicine.
    Prescription(PrescriptionArgs),
    Vitals(VitalsArgs),
    Note(NoteArgs),
    LabOrder(LabOrderArgs),
    Imaging(ImagingArgs),
}

#[derive(Args, Debug)]
pub struct PrescriptionArgs {
    #[arg(long = "item", value_parser = parse_item)]
    items: Vec<PrescriptionItemDraft>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct VitalsArgs {
    #[arg(long = "temp")]
    temperature_c: Option<f64>,
    #[arg(long = "pulse")]
    heart_rate_bpm: Option<u16>,
    /// Blood pressure as `systolic/diastolic`.
    #[arg(long = "bp", value_parser = parse_blood_pressure)]
    blood_pressure: Option<(u16, u16)>,
    #[arg(long = "resp")]
    respiratory_rate: Option<u16>,
    #[arg(long = "spo2")]
    oxygen_saturation: Option<u8>,
    #[arg(long = "weight")]
    weight_kg: Option<f64>,
    #[arg(long = "height")]
    height_cm: Option<f64>,
}

#[derive(Args, Debug)]
pub struct NoteArgs {
    #[arg(long = "type", value_parser = parse_note_type)]
    note_type: Option<NoteType>,
    #[arg(long)]
    title: Option<String>,
    content: String,
}

#[derive(Args, Debug)]
pub struct LabOrderArgs {
    #[arg(long = "test")]
    test_ids: Vec<i64>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<OrderPriority>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct ImagingArgs {
    #[arg(long, value_parser = parse_modality)]
    modality: Option<ImagingModality>,
    #[arg(long = "body-part")]
    body_part: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<OrderPriority>,
    #[arg(long)]
    indication: Option<String>,
}

impl Form {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::Prescription(_) => ChildKind::Prescription,
            Self::Vitals(_) => ChildKind::VitalSign,
            Self::Note(_) => ChildKind::ClinicalNote,
            Self::LabOrder(_) => ChildKind::LabOrder,
            Self::Imaging(_) => ChildKind::ImagingOrder,
        }
    }

    pub fn to_draft(&self) -> ChildDraft {
        match self {
            Self::Prescription(args) => ChildDraft::Prescription(PrescriptionDraft {
                items: args.items.clone(),
                notes: args.notes.clone(),
            }),
            Self::Vitals(args) => ChildDraft::VitalSign(VitalSignDraft {
                temperature_c: args.temperature_c,
                heart_rate_bpm: args.heart_rate_bpm,
                systolic_mmhg: args.blood_pressure.map(|(systolic, _)| systolic),
                diastolic_mmhg: args.blood_pressure.map(|(_, diastolic)| diastolic),
                respiratory_rate: args.respiratory_rate,
                oxygen_saturation: args.oxygen_saturation,
                weight_kg: args.weight_kg,
                height_cm: args.height_cm,
            }),
            Self::Note(args) => ChildDraft::ClinicalNote(ClinicalNoteDraft {
                note_type: args.note_type,
                title: args.title.clone(),
                content: Some(args.content.clone()),
            }),
            Self::LabOrder(args) => ChildDraft::LabOrder(LabOrderDraft {
                test_ids: args.test_ids.clone(),
                priority: args.priority,
                clinical_notes: args.notes.clone(),
            }),
            Self::Imaging(args) => ChildDraft::ImagingOrder(ImagingOrderDraft {
                modality: args.modality,
                body_part: args.body_part.clone(),
                priority: args.priority,
                clinical_indication: args.indication.clone(),
            }),
        }
    }
}

fn parse_item(raw: &str) -> Result<PrescriptionItemDraft, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(medicine), Some(dosage), Some(quantity)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected medicine:dosage:quantity, got '{raw}'"));
    };
    let medicine_id = medicine
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("medicine id '{medicine}' is not an integer"))?;
    let quantity = quantity
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("quantity '{quantity}' is not a whole number"))?;
    Ok(PrescriptionItemDraft::new(medicine_id, dosage, quantity))
}

fn parse_blood_pressure(raw: &str) -> Result<(u16, u16), String> {
    let (systolic, diastolic) = raw
        .split_once('/')
        .ok_or_else(|| format!("expected systolic/diastolic, got '{raw}'"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<u16>()
            .map_err(|_| format!("'{value}' is not a pressure in mmHg"))
    };
    Ok((parse(systolic)?, parse(diastolic)?))
}

fn parse_note_type(raw: &str) -> Result<NoteType, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "progress" => Ok(NoteType::Progress),
        "soap" => Ok(NoteType::Soap),
        "admission" => Ok(NoteType::Admission),
        "discharge" => Ok(NoteType::Discharge),
        "consultation" => Ok(NoteType::Consultation),
        other => Err(format!("unknown note type '{other}'")),
    }
}

fn parse_priority(raw: &str) -> Result<OrderPriority, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "routine" => Ok(OrderPriority::Routine),
        "urgent" => Ok(OrderPriority::Urgent),
        "stat" => Ok(OrderPriority::Stat),
        other => Err(format!("unknown priority '{other}'")),
    }
}

fn parse_modality(raw: &str) -> Result<ImagingModality, String> {
    match raw.trim().to_ascii_lowercase().replace('-', "").as_str() {
        "xray" => Ok(ImagingModality::XRay),
        "ct" => Ok(ImagingModality::Ct),
        "mri" => Ok(ImagingModality::Mri),
        "ultrasound" => Ok(ImagingModality::Ultrasound),
        other => Err(format!("unknown imaging modality '{other}'")),
    }
}
