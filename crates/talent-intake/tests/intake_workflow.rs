use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Map, Value};
use talent_intake::access::AdminPolicy;
use talent_intake::error::RepositoryError;
use talent_intake::identity::{Identity, IdentityId};
use talent_intake::workflows::intake::{
    ApplicationId, ApplicationPayload, ApplicationRecord, ApplicationStatus,
    ApplicationStore, IntakeService, SessionId, Step, SubmissionAdapter, SubmissionStatus,
};
use talent_intake::workflows::opportunities::{
    Opportunity, OpportunityForm, OpportunityId, OpportunityService, OpportunityStore,
};
use talent_intake::workflows::review::{ReviewQuery, ReviewService, StatusFilter};

#[derive(Default)]
struct Applications {
    rows: Mutex<Vec<ApplicationRecord>>,
}

impl Applications {
    fn rows(&self) -> Vec<ApplicationRecord> {
        self.rows.lock().expect("rows").clone()
    }
}

#[async_trait]
impl ApplicationStore for Applications {
    async fn insert(
        &self,
        payload: ApplicationPayload,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut rows = self.rows.lock().expect("rows");
        let created_at = Utc
            .with_ymd_and_hms(2025, 4, 1, 9, 0, 0)
            .single()
            .expect("timestamp")
            + chrono::Duration::minutes(rows.len() as i64);
        let record = ApplicationRecord {
            id: ApplicationId(format!("app-{}", rows.len() + 1)),
            payload,
            status: ApplicationStatus::Pending,
            created_at,
            updated_at: created_at,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &ApplicationId,
        payload: ApplicationPayload,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut rows = self.rows.lock().expect("rows");
        let row = rows
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.payload = payload;
        Ok(row.clone())
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self.rows().into_iter().find(|row| &row.id == id))
    }

    async fn latest_for_owner(
        &self,
        owner: &IdentityId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self
            .rows()
            .into_iter()
            .filter(|row| row.owner() == Some(owner))
            .max_by_key(|row| row.created_at))
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let mut rows = self.rows();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn set_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut rows = self.rows.lock().expect("rows");
        let row = rows
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.status = status;
        Ok(row.clone())
    }

    async fn count_for_opportunity(&self, id: &OpportunityId) -> Result<usize, RepositoryError> {
        Ok(self
            .rows()
            .iter()
            .filter(|row| row.payload.opportunity_id.as_ref() == Some(id))
            .count())
    }
}

/// Nothing published; the wizard runs as a general application.
struct NoOpportunities;

#[async_trait]
impl OpportunityStore for NoOpportunities {
    async fn list(&self) -> Result<Vec<Opportunity>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn fetch(&self, _id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError> {
        Ok(None)
    }

    async fn insert(
        &self,
        _form: &OpportunityForm,
        _created_by: Option<IdentityId>,
    ) -> Result<Opportunity, RepositoryError> {
        Err(RepositoryError::Forbidden)
    }

    async fn update(
        &self,
        _id: &OpportunityId,
        _form: &OpportunityForm,
    ) -> Result<Opportunity, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    async fn set_active(
        &self,
        _id: &OpportunityId,
        _active: bool,
    ) -> Result<Opportunity, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    async fn delete(&self, _id: &OpportunityId) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }
}

const ADMIN: &str = "rh@example.org";

fn identity(id: &str, email: &str) -> Identity {
    Identity {
        id: IdentityId(id.to_string()),
        email: email.to_string(),
        email_confirmed_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).single(),
    }
}

fn answers() -> Map<String, Value> {
    let form = json!({
        "full_name": "Bruno Lima",
        "birth_date": "2001-08-20",
        "email": "bruno@example.org",
        "whatsapp": "(61) 98888-1111",
        "city": "Taguatinga",
        "institution": "IFB",
        "course": "Análise e Desenvolvimento de Sistemas",
        "current_period": "3º",
        "study_shift": "Vespertino",
        "graduation_month": 6,
        "graduation_year": 2027,
        "interest_areas": ["Desenvolvimento de Software"],
        "motivation": "Gosto de construir sistemas úteis para pessoas.",
        "contributions": "Disciplina e facilidade com código.",
        "has_experience": false,
        "how_did_you_hear": "Indicação",
        "lgpd_consent": true
    });
    match form {
        Value::Object(map) => map,
        _ => unreachable!("literal object"),
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date")
}

type Service = IntakeService<Applications, NoOpportunities>;

fn wire() -> (Arc<Applications>, Service, ReviewService<Applications>) {
    let policy = Arc::new(AdminPolicy::from_emails([ADMIN]));
    let applications = Arc::new(Applications::default());
    let opportunities = Arc::new(OpportunityService::new(
        Arc::new(NoOpportunities),
        Arc::clone(&applications),
        Arc::clone(&policy),
    ));
    let intake = IntakeService::new(
        SubmissionAdapter::new(Arc::clone(&applications), Arc::clone(&policy)),
        opportunities,
    );
    let review = ReviewService::new(Arc::clone(&applications), policy);
    (applications, intake, review)
}

async fn run_to_end(service: &Service, id: &SessionId, caller: &Identity) -> Vec<Step> {
    let mut visited = Vec::new();
    loop {
        let view = service.advance(id, Some(caller)).await.expect("advance");
        visited.push(view.current_step);
        if view.current_step == Step::Sucesso {
            assert_eq!(view.status, SubmissionStatus::Succeeded);
            return visited;
        }
    }
}

#[tokio::test]
async fn returning_candidate_edits_their_single_row() {
    let (applications, intake, review) = wire();
    let bruno = identity("user-bruno", "bruno@example.org");

    let first = intake.open_session(Some(&bruno)).await.expect("open");
    assert!(!first.edit_mode);
    intake
        .select_opportunity(&first.session_id, Some(&bruno), None, today())
        .await
        .expect("start");
    intake
        .patch(&first.session_id, Some(&bruno), &answers())
        .expect("answers");
    let visited = run_to_end(&intake, &first.session_id, &bruno).await;
    assert!(!visited.contains(&Step::Detalhes));
    intake
        .close(&first.session_id, Some(&bruno))
        .expect("close");

    let second = intake.open_session(Some(&bruno)).await.expect("reopen");
    assert!(second.edit_mode);
    assert_eq!(second.current_step, Step::Welcome);
    assert_eq!(second.form_data.city, "Taguatinga");
    intake
        .select_opportunity(&second.session_id, Some(&bruno), None, today())
        .await
        .expect("start edit");
    let mut change = Map::new();
    change.insert("city".to_string(), json!("Ceilândia"));
    intake
        .patch(&second.session_id, Some(&bruno), &change)
        .expect("edit city");
    run_to_end(&intake, &second.session_id, &bruno).await;

    let rows = applications.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].payload.city, "Ceilândia");
    assert_eq!(rows[0].owner(), Some(&bruno.id));

    let admin = identity("admin-1", ADMIN);
    let query = ReviewQuery {
        status: StatusFilter::Only(ApplicationStatus::Pending),
        search: "ADS".to_string(),
    };
    let listing = review.list(Some(&admin), &query).await.expect("listing");
    assert!(listing.applications.is_empty());
    assert_eq!(listing.counts.pending, 1);

    let query = ReviewQuery {
        status: StatusFilter::Only(ApplicationStatus::Pending),
        search: "sistemas".to_string(),
    };
    let export = review.export(Some(&admin), &query, today()).await.expect("export");
    assert_eq!(export.file_name, "candidaturas_2025-04-01.csv");
    let lines: Vec<&str> = export.body.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("\"Bruno Lima\",\"bruno@example.org\""));
    assert!(lines[1].contains("\"Ceilândia\""));
}

#[tokio::test]
async fn reported_experience_adds_the_details_step() {
    let (applications, intake, _) = wire();
    let carla = identity("user-carla", "carla@example.org");

    let view = intake.open_session(Some(&carla)).await.expect("open");
    intake
        .select_opportunity(&view.session_id, Some(&carla), None, today())
        .await
        .expect("start");
    let mut fields = answers();
    fields.insert("has_experience".to_string(), json!(true));
    fields.insert("experience_type".to_string(), json!("Outro"));
    fields.insert("experience_type_other".to_string(), json!("Monitoria"));
    fields.insert("experience_org".to_string(), json!("IFB"));
    fields.insert("experience_period".to_string(), json!("2024"));
    fields.insert(
        "experience_activities".to_string(),
        json!("Apoio a alunos em laboratório"),
    );
    fields.insert(
        "experience_learnings".to_string(),
        json!("Explicar conceitos com paciência"),
    );
    intake
        .patch(&view.session_id, Some(&carla), &fields)
        .expect("answers");

    let visited = run_to_end(&intake, &view.session_id, &carla).await;
    assert_eq!(
        visited,
        vec![
            Step::Formacao,
            Step::Areas,
            Step::Experiencias,
            Step::Detalhes,
            Step::Complementares,
            Step::Sucesso,
        ]
    );
    let rows = applications.rows();
    assert_eq!(rows[0].payload.experience_type.as_deref(), Some("Monitoria"));
}
