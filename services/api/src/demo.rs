use crate::infra::{
    parse_date, InMemoryApplicationStore, InMemoryIdentity, InMemoryInviteStore,
    InMemoryOpportunityStore,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use talent_intake::access::AdminPolicy;
use talent_intake::error::AppError;
use talent_intake::identity::{Identity, IdentityAdmin, IdentityProvider};
use talent_intake::workflows::intake::{
    ApplicationFormData, ApplicationStatus, IntakeService, Step, SubmissionAdapter,
    SubmissionStatus,
};
use talent_intake::workflows::invites::InviteService;
use talent_intake::workflows::opportunities::{OpportunityForm, OpportunityService, WorkModel};
use talent_intake::workflows::review::export::load_records_from_path;
use talent_intake::workflows::review::{
    write_csv, ReviewBoard, ReviewQuery, ReviewService, StatusFilter,
};

const DEMO_ADMIN: &str = "rh@gigacandanga.example";
const DEMO_PASSWORD: &str = "demo-senha";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Candidate name entered on the personal data step
    #[arg(long, default_value = "Ana Souza")]
    pub(crate) name: String,
    /// Candidate e-mail, also used to sign up
    #[arg(long, default_value = "ana.souza@example.org")]
    pub(crate) email: String,
    /// Fill the experience details step as well
    #[arg(long)]
    pub(crate) with_experience: bool,
    /// Reporting date used for opportunity windows and the export file name (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// JSON array of stored applications
    pub(crate) input: PathBuf,
    /// Status tab to export: all, pending, reviewing, approved or rejected
    #[arg(long, default_value = "all")]
    pub(crate) status: StatusFilter,
    /// Case-insensitive search over name, e-mail and course
    #[arg(long, default_value = "")]
    pub(crate) search: String,
    /// Write to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let records = load_records_from_path(&args.input)?;
    let board = ReviewBoard::new(records);
    let visible = board.filtered(args.status, &args.search);

    match args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(&path)?);
            write_csv(visible.iter().copied(), &mut writer)?;
            writer.flush()?;
            eprintln!(
                "{} of {} applications written to {}",
                visible.len(),
                board.records().len(),
                path.display()
            );
        }
        None => {
            let stdout = io::stdout();
            write_csv(visible.iter().copied(), stdout.lock())?;
        }
    }
    Ok(())
}

fn candidate_form(args: &DemoArgs) -> ApplicationFormData {
    let form = ApplicationFormData {
        full_name: args.name.clone(),
        birth_date: "2002-05-14".to_string(),
        email: args.email.clone(),
        whatsapp: "(61) 99999-0000".to_string(),
        city: "Brasília".to_string(),
        institution: "Universidade de Brasília".to_string(),
        course: "Engenharia de Redes".to_string(),
        current_period: "5º".to_string(),
        study_shift: "Noturno".to_string(),
        graduation_month: Some(12),
        graduation_year: Some(2027),
        interest_areas: vec!["Redes e Infraestrutura".to_string()],
        motivation: "Quero aprender com projetos reais de conectividade.".to_string(),
        contributions: "Organização, curiosidade e vontade de aprender.".to_string(),
        has_experience: args.with_experience,
        how_did_you_hear: "LinkedIn".to_string(),
        lgpd_consent: true,
        ..ApplicationFormData::default()
    };
    if !args.with_experience {
        return form;
    }
    ApplicationFormData {
        experience_type: Some("Projeto acadêmico".to_string()),
        experience_org: Some("Laboratório de Redes".to_string()),
        experience_period: Some("2024".to_string()),
        experience_activities: Some("Montagem de laboratório e documentação".to_string()),
        experience_learnings: Some("Trabalho em equipe e registro técnico".to_string()),
        ..form
    }
}

fn as_patch(form: &ApplicationFormData) -> Map<String, Value> {
    match serde_json::to_value(form) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let policy = Arc::new(AdminPolicy::from_emails([DEMO_ADMIN]));
    let identity = InMemoryIdentity::default().with_confirmed_account(DEMO_ADMIN, DEMO_PASSWORD);
    let applications = Arc::new(InMemoryApplicationStore::default());

    let opportunities = Arc::new(OpportunityService::new(
        Arc::new(InMemoryOpportunityStore::default()),
        Arc::clone(&applications),
        Arc::clone(&policy),
    ));
    let intake = IntakeService::new(
        SubmissionAdapter::new(Arc::clone(&applications), Arc::clone(&policy)),
        Arc::clone(&opportunities),
    );
    let review = ReviewService::new(Arc::clone(&applications), Arc::clone(&policy));
    let users: Arc<dyn IdentityAdmin> = Arc::new(identity.clone());
    let invites = InviteService::new(
        Arc::new(InMemoryInviteStore::default()),
        users,
        Arc::clone(&policy),
    );

    println!("Banco de Talentos demo");

    let admin = match identity.sign_in(DEMO_ADMIN, DEMO_PASSWORD).await {
        Ok(session) => session.identity,
        Err(err) => {
            println!("  Admin sign-in failed: {err}");
            return Ok(());
        }
    };

    let opening = OpportunityForm {
        title: "Estágio em Redes e Infraestrutura".to_string(),
        location: "Brasília - DF".to_string(),
        work_model: WorkModel::Hibrido,
        weekly_hours: 30,
        monthly_stipend: Some(1200),
        interest_areas: vec!["Redes e Infraestrutura".to_string()],
        is_active: true,
        max_applications: Some(20),
        ..OpportunityForm::default()
    };
    let opportunity = match opportunities.create(Some(&admin), opening).await {
        Ok(created) => created,
        Err(err) => {
            println!("  Opportunity not created: {err}");
            return Ok(());
        }
    };
    println!(
        "Opportunity published: {} ({}, {}h/week)",
        opportunity.title,
        opportunity.work_model.label(),
        opportunity.weekly_hours
    );

    let Some(candidate) = register_candidate(&identity, &invites, &admin, &args.email).await else {
        return Ok(());
    };
    println!("Candidate signed in: {}", candidate.email);

    println!("\nWizard");
    let session = match intake.open_session(Some(&candidate)).await {
        Ok(view) => view,
        Err(err) => {
            println!("  Session not opened: {err}");
            return Ok(());
        }
    };
    let id = session.session_id.clone();
    println!("  {} (edit mode: {})", session.current_step, session.edit_mode);

    if let Err(err) = intake
        .select_opportunity(&id, Some(&candidate), Some(opportunity.id.clone()), today)
        .await
    {
        println!("  Opportunity not selectable: {err}");
        return Ok(());
    }
    if let Err(err) = intake.patch(&id, Some(&candidate), &as_patch(&candidate_form(&args))) {
        println!("  Answers rejected: {err}");
        return Ok(());
    }

    loop {
        match intake.advance(&id, Some(&candidate)).await {
            Ok(view) => {
                println!(
                    "  -> {} ({}/{})",
                    view.current_step, view.progress.position, view.progress.total
                );
                if view.current_step == Step::Sucesso {
                    if view.status != SubmissionStatus::Succeeded {
                        println!("  Unexpected status: {:?}", view.status);
                    }
                    break;
                }
            }
            Err(err) => {
                println!("  Advance blocked: {err}");
                return Ok(());
            }
        }
    }
    if let Err(err) = intake.close(&id, Some(&candidate)) {
        println!("  Session not closed: {err}");
    }

    println!("\nReview board");
    let listing = match review.list(Some(&admin), &ReviewQuery::default()).await {
        Ok(listing) => listing,
        Err(err) => {
            println!("  Board unavailable: {err}");
            return Ok(());
        }
    };
    println!(
        "  all: {} | pending: {} | reviewing: {} | approved: {} | rejected: {}",
        listing.counts.all,
        listing.counts.pending,
        listing.counts.reviewing,
        listing.counts.approved,
        listing.counts.rejected
    );
    if let Some(submitted) = listing.applications.first() {
        match review
            .update_status(Some(&admin), &submitted.id, ApplicationStatus::Reviewing)
            .await
        {
            Ok(updated) => println!(
                "  {} moved to {}",
                updated.payload.full_name,
                updated.status.label()
            ),
            Err(err) => println!("  Status change failed: {err}"),
        }
    }

    match review
        .export(Some(&admin), &ReviewQuery::default(), today)
        .await
    {
        Ok(export) => println!("\n{}\n{}", export.file_name, export.body),
        Err(err) => println!("  Export unavailable: {err}"),
    }
    Ok(())
}

/// Sign the candidate up, have the admin confirm the account, then sign in.
async fn register_candidate(
    identity: &InMemoryIdentity,
    invites: &InviteService<InMemoryInviteStore>,
    admin: &Identity,
    email: &str,
) -> Option<Identity> {
    if let Err(err) = identity.sign_up(email, DEMO_PASSWORD).await {
        println!("  Sign-up failed: {}", err.user_message());
        return None;
    }
    match invites.confirm_user(Some(admin), email, None).await {
        Ok(outcome) => println!("Admin confirmation: {}", outcome.message),
        Err(err) => {
            println!("  Confirmation failed: {err}");
            return None;
        }
    }
    match identity.sign_in(email, DEMO_PASSWORD).await {
        Ok(session) => Some(session.identity),
        Err(err) => {
            println!("  Sign-in failed: {}", err.user_message());
            None
        }
    }
}
