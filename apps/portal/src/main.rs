use std::{future::Future, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, load_settings_from, normalize_server_url},
    view::{OperatorMessage, PendingAction, WorkflowScreen},
    HttpRecordBackend, RecordWorkflowController, WorkflowResult,
};
use shared::{
    domain::{ChildId, ChildKind, EncounterId},
    protocol::{ChildBody, ChildRecord, Encounter},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod forms;

use forms::Form;

type Controller = RecordWorkflowController<HttpRecordBackend>;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Encounter records for ward staff")]
struct Cli {
    /// Settings file; `portal.toml` in the working directory when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Show {
        encounter_id: String,
    },
    /// Encounters assigned to the configured operator.
    Assigned,
    List {
        encounter_id: String,
        kind: ChildKind,
    },
    Create {
        encounter_id: String,
        #[command(subcommand)]
        form: Form,
    },
    Sign {
        kind: ChildKind,
        child_id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Supersedes a signed record with a corrected version.
    Replace {
        child_id: i64,
        #[arg(long)]
        reason: String,
        #[command(subcommand)]
        form: Form,
    },
    /// Dispenses a prescription or completes an order.
    Fulfil {
        kind: ChildKind,
        child_id: i64,
        #[arg(long)]
        yes: bool,
    },
    Cancel {
        kind: ChildKind,
        child_id: i64,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        yes: bool,
    },
    /// Replacement history of a record, oldest first.
    Chain {
        kind: ChildKind,
        child_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path, |key| std::env::var(key).ok())?,
        None => load_settings()?,
    };
    if let Some(server_url) = &cli.server_url {
        settings.server_url = normalize_server_url(server_url)?;
    }
    info!(
        server_url = %settings.server_url,
        operator = %settings.operator.display_name,
        role = ?settings.operator.role,
        "portal starting"
    );

    let backend = HttpRecordBackend::new(&settings.server_url)?;
    let mut controller = RecordWorkflowController::new(backend, settings.operator);
    let mut screen = WorkflowScreen::new();
    run(cli.command, &mut controller, &mut screen).await
}

/// `RUST_LOG` directives, or `info` when they are absent or do not parse.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn run(
    command: Command,
    controller: &mut Controller,
    screen: &mut WorkflowScreen,
) -> Result<()> {
    match command {
        Command::Show { encounter_id } => {
            let encounter = attempt(screen, controller.resolve_parent(&encounter_id)).await?;
            print_encounter(encounter);
        }
        Command::Assigned => {
            let encounters = attempt(screen, controller.assigned_parents()).await?;
            if encounters.is_empty() {
                println!("no encounters assigned to {}", controller.operator().display_name);
            }
            for encounter in &encounters {
                print_encounter(encounter);
            }
        }
        Command::List { encounter_id, kind } => {
            let parent_id = resolve(screen, controller, &encounter_id).await?;
            screen.open_list(kind)?;
            let records = attempt(screen, controller.list_children(&parent_id, kind)).await?;
            if records.is_empty() {
                println!("no {kind} records for encounter {parent_id}");
            }
            for record in records {
                print_record(record);
            }
        }
        Command::Create { encounter_id, form } => {
            let parent_id = resolve(screen, controller, &encounter_id).await?;
            screen.begin_create(form.kind())?;
            let draft = form.to_draft();
            let created = attempt(screen, controller.create_child(&parent_id, &draft)).await?;
            screen.dismiss();
            print_record(&created);
        }
        Command::Sign {
            kind,
            child_id,
            yes,
        } => {
            let action = PendingAction::Sign {
                kind,
                child_id: ChildId(child_id),
            };
            confirm_and_execute(screen, controller, action, yes).await?;
        }
        Command::Replace {
            child_id,
            reason,
            form,
        } => {
            let (kind, child_id) = (form.kind(), ChildId(child_id));
            screen.begin_edit(kind, child_id)?;
            let draft = form.to_draft();
            let replacement = attempt(
                screen,
                controller.replace_child(child_id, kind, &reason, &draft),
            )
            .await?;
            screen.dismiss();
            println!("{kind} {child_id} superseded by {}", replacement.child_id);
            print_record(&replacement);
        }
        Command::Fulfil {
            kind,
            child_id,
            yes,
        } => {
            let action = PendingAction::Fulfil {
                kind,
                child_id: ChildId(child_id),
            };
            confirm_and_execute(screen, controller, action, yes).await?;
        }
        Command::Cancel {
            kind,
            child_id,
            reason,
            yes,
        } => {
            let action = PendingAction::Cancel {
                kind,
                child_id: ChildId(child_id),
                reason,
            };
            confirm_and_execute(screen, controller, action, yes).await?;
        }
        Command::Chain { kind, child_id } => {
            let child_id = ChildId(child_id);
            let chain = attempt(screen, controller.replacement_chain(child_id, kind)).await?;
            if chain.is_empty() {
                println!("{kind} {child_id} has never been replaced");
            }
            for version in chain.versions() {
                print_record(version);
            }
        }
    }
    Ok(())
}

/// Runs `action` through the screen and turns the operator message into an
/// error for the process exit status.
async fn attempt<T, F>(screen: &mut WorkflowScreen, action: F) -> Result<T>
where
    F: Future<Output = WorkflowResult<T>>,
{
    match screen.run(action).await {
        Some(value) => Ok(value),
        None => Err(action_failure(screen.last_message())),
    }
}

/// The message text already starts with its category.
fn action_failure(message: Option<&OperatorMessage>) -> anyhow::Error {
    match message {
        Some(message) => anyhow!("{}", message.text),
        None => anyhow!("action failed"),
    }
}

async fn resolve(
    screen: &mut WorkflowScreen,
    controller: &mut Controller,
    raw_id: &str,
) -> Result<EncounterId> {
    let encounter = attempt(screen, controller.resolve_parent(raw_id)).await?;
    Ok(encounter.encounter_id.clone())
}

async fn confirm_and_execute(
    screen: &mut WorkflowScreen,
    controller: &mut Controller,
    action: PendingAction,
    assume_yes: bool,
) -> Result<()> {
    let prompt = action.prompt();
    screen.request_confirmation(action)?;
    if !assume_yes && !ask(&prompt).await? {
        screen.dismiss();
        println!("nothing changed");
        return Ok(());
    }
    let Some(action) = screen.confirm() else {
        return Err(anyhow!("no action awaiting confirmation"));
    };

    let record = match action {
        PendingAction::Sign { kind, child_id } => {
            attempt(screen, controller.sign_child(child_id, kind)).await?
        }
        PendingAction::Fulfil { kind, child_id } => {
            attempt(screen, controller.fulfil_child(child_id, kind)).await?
        }
        PendingAction::Cancel {
            kind,
            child_id,
            reason,
        } => attempt(screen, controller.cancel_child(child_id, kind, &reason)).await?,
    };
    print_record(&record);
    Ok(())
}

async fn ask(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{prompt} [y/N] ").as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_encounter(encounter: &Encounter) {
    let doctor = encounter
        .assigned_doctor
        .map(|doctor| doctor.to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "{}\t{}\t{:?}\tdoctor={doctor}",
        encounter.encounter_id, encounter.patient.full_name, encounter.status
    );
}

fn print_record(record: &ChildRecord) {
    let mut line = format!(
        "{}\t{}\t{}\t{}",
        record.child_id,
        record.kind(),
        record.status,
        summarize(&record.body)
    );
    if let Some(previous) = record.replaces {
        line.push_str(&format!("\treplaces={previous}"));
    }
    if let Some(reason) = &record.replacement_reason {
        line.push_str(&format!("\treason={reason}"));
    }
    if let Some(signer) = record.signed_by {
        line.push_str(&format!("\tsigned_by={signer}"));
    }
    println!("{line}");
}

fn summarize(body: &ChildBody) -> String {
    match body {
        ChildBody::VitalSign(vitals) => {
            let reading = &vitals.reading;
            let mut text = format!("{:.1}C {}bpm", reading.temperature_c, reading.heart_rate_bpm);
            if let (Some(systolic), Some(diastolic)) =
                (reading.systolic_mmhg, reading.diastolic_mmhg)
            {
                text.push_str(&format!(" {systolic}/{diastolic}mmHg"));
            }
            if let Some(bmi) = vitals.bmi {
                text.push_str(&format!(" bmi={bmi:.1}"));
            }
            text
        }
        ChildBody::ClinicalNote(note) => note.title.clone().unwrap_or_else(|| {
            let first_line = note.content.lines().next().unwrap_or_default();
            first_line.chars().take(60).collect()
        }),
        ChildBody::Prescription(prescription) => {
            let items: Vec<String> = prescription
                .prescription
                .items
                .iter()
                .map(|item| format!("#{} {} x{}", item.medicine_id, item.dosage, item.quantity))
                .collect();
            match prescription.total_cost {
                Some(cost) => format!("{} total={cost:.2}", items.join(", ")),
                None => items.join(", "),
            }
        }
        ChildBody::LabOrder(order) => format!("tests {:?} {:?}", order.test_ids, order.priority),
        ChildBody::ImagingOrder(order) => format!("{:?} {}", order.modality, order.body_part),
    }
}
