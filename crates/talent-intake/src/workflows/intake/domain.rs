use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{FieldSource, FieldValue};
use crate::identity::IdentityId;
use crate::workflows::opportunities::OpportunityId;

/// Identifier wrapper for persisted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text escape offered by the experience-type and referral selects.
pub const OTHER_OPTION: &str = "Outro";

pub const INTEREST_AREA_OPTIONS: [&str; 7] = [
    "Tecnologia da Informação / Suporte Técnico",
    "Redes e Infraestrutura",
    "Desenvolvimento de Software",
    "Administração / Gestão",
    "Comunicação / Marketing",
    "Recursos Humanos",
    "Projetos / Inovação",
];

pub const PERIOD_OPTIONS: [&str; 9] = [
    "1º",
    "2º",
    "3º",
    "4º",
    "5º",
    "6º",
    "7º",
    "8º ou mais",
    "Já me formei",
];

pub const SHIFT_OPTIONS: [&str; 4] = ["Matutino", "Vespertino", "Noturno", "Integral"];

pub const EXPERIENCE_TYPE_OPTIONS: [&str; 5] = [
    "Estágio anterior",
    "Emprego anterior",
    "Projeto acadêmico",
    "Trabalho voluntário",
    "Freelancer / autônomo",
];

pub const HOW_DID_YOU_HEAR_OPTIONS: [&str; 4] =
    ["Indicação", "LinkedIn", "Site da GigaCandanga", "Eventos"];

/// Values entered across the wizard steps, keyed exactly like the form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationFormData {
    // dados
    pub full_name: String,
    pub birth_date: String,
    pub email: String,
    pub whatsapp: String,
    pub city: String,

    // formacao
    pub institution: String,
    pub course: String,
    pub current_period: String,
    pub study_shift: String,
    pub graduation_month: Option<i32>,
    pub graduation_year: Option<i32>,

    // areas
    pub interest_areas: Vec<String>,
    pub interest_other: Option<String>,
    pub motivation: String,
    pub contributions: String,

    // experiencias
    pub tools: Option<String>,
    pub has_experience: bool,

    // detalhes
    pub experience_type: Option<String>,
    pub experience_type_other: Option<String>,
    pub experience_org: Option<String>,
    pub experience_period: Option<String>,
    pub experience_activities: Option<String>,
    pub experience_learnings: Option<String>,

    // complementares
    pub extra_info: Option<String>,
    pub how_did_you_hear: String,
    pub how_did_you_hear_other: Option<String>,
    pub cv_url: Option<String>,
    pub lgpd_consent: bool,
}

fn optional_text(value: &Option<String>) -> FieldValue<'_> {
    match value {
        Some(text) => FieldValue::Text(text),
        None => FieldValue::Missing,
    }
}

impl FieldSource for ApplicationFormData {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "full_name" => FieldValue::Text(&self.full_name),
            "birth_date" => FieldValue::Text(&self.birth_date),
            "email" => FieldValue::Text(&self.email),
            "whatsapp" => FieldValue::Text(&self.whatsapp),
            "city" => FieldValue::Text(&self.city),
            "institution" => FieldValue::Text(&self.institution),
            "course" => FieldValue::Text(&self.course),
            "current_period" => FieldValue::Text(&self.current_period),
            "study_shift" => FieldValue::Text(&self.study_shift),
            "graduation_month" => self
                .graduation_month
                .map_or(FieldValue::Missing, |month| FieldValue::Number(month.into())),
            "graduation_year" => self
                .graduation_year
                .map_or(FieldValue::Missing, |year| FieldValue::Number(year.into())),
            "interest_areas" => FieldValue::List(&self.interest_areas),
            "interest_other" => optional_text(&self.interest_other),
            "motivation" => FieldValue::Text(&self.motivation),
            "contributions" => FieldValue::Text(&self.contributions),
            "tools" => optional_text(&self.tools),
            "has_experience" => FieldValue::Flag(self.has_experience),
            "experience_type" => optional_text(&self.experience_type),
            "experience_type_other" => optional_text(&self.experience_type_other),
            "experience_org" => optional_text(&self.experience_org),
            "experience_period" => optional_text(&self.experience_period),
            "experience_activities" => optional_text(&self.experience_activities),
            "experience_learnings" => optional_text(&self.experience_learnings),
            "extra_info" => optional_text(&self.extra_info),
            "how_did_you_hear" => FieldValue::Text(&self.how_did_you_hear),
            "how_did_you_hear_other" => optional_text(&self.how_did_you_hear_other),
            "cv_url" => optional_text(&self.cv_url),
            "lgpd_consent" => FieldValue::Flag(self.lgpd_consent),
            _ => FieldValue::Missing,
        }
    }
}

/// Review status tracked on each persisted application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewing,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Pending, Self::Reviewing, Self::Approved, Self::Rejected]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewing => "reviewing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Label shown on the dashboard and in exports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::Reviewing => "Em análise",
            Self::Approved => "Aprovado",
            Self::Rejected => "Rejeitado",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// Row shape written to the `applications` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationPayload {
    pub full_name: String,
    pub birth_date: String,
    pub email: String,
    pub whatsapp: String,
    pub city: String,
    pub institution: String,
    pub course: String,
    pub current_period: String,
    pub study_shift: String,
    pub graduation_month: Option<i32>,
    pub graduation_year: Option<i32>,
    pub interest_areas: Vec<String>,
    pub interest_other: Option<String>,
    pub motivation: String,
    pub contributions: String,
    pub tools: Option<String>,
    pub has_experience: bool,
    pub experience_type: Option<String>,
    pub experience_org: Option<String>,
    pub experience_period: Option<String>,
    pub experience_activities: Option<String>,
    pub experience_learnings: Option<String>,
    pub extra_info: Option<String>,
    pub how_did_you_hear: String,
    pub how_did_you_hear_other: Option<String>,
    pub cv_url: Option<String>,
    pub lgpd_consent: bool,
    pub lgpd_consent_date: Option<DateTime<Utc>>,
    pub user_id: Option<IdentityId>,
    pub opportunity_id: Option<OpportunityId>,
}

/// Persisted application as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    #[serde(flatten)]
    pub payload: ApplicationPayload,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn owner(&self) -> Option<&IdentityId> {
        self.payload.user_id.as_ref()
    }

    /// Map the stored row back into wizard values so the owner can edit it.
    ///
    /// Free-text answers that were folded into `experience_type` / `how_did_you_hear` on
    /// submission are unfolded into the `Outro` option plus its companion field.
    pub fn to_form_data(&self) -> ApplicationFormData {
        let p = &self.payload;

        let (experience_type, experience_type_other) = match p.experience_type.as_deref() {
            Some(value)
                if value != OTHER_OPTION
                    && !EXPERIENCE_TYPE_OPTIONS.iter().any(|option| *option == value) =>
            {
                (Some(OTHER_OPTION.to_string()), Some(value.to_string()))
            }
            other => (other.map(str::to_string), None),
        };

        let (how_did_you_hear, how_did_you_hear_other) = match &p.how_did_you_hear_other {
            Some(other) => (OTHER_OPTION.to_string(), Some(other.clone())),
            None => (p.how_did_you_hear.clone(), None),
        };

        ApplicationFormData {
            full_name: p.full_name.clone(),
            birth_date: p.birth_date.clone(),
            email: p.email.clone(),
            whatsapp: p.whatsapp.clone(),
            city: p.city.clone(),
            institution: p.institution.clone(),
            course: p.course.clone(),
            current_period: p.current_period.clone(),
            study_shift: p.study_shift.clone(),
            graduation_month: p.graduation_month,
            graduation_year: p.graduation_year,
            interest_areas: p.interest_areas.clone(),
            interest_other: p.interest_other.clone(),
            motivation: p.motivation.clone(),
            contributions: p.contributions.clone(),
            tools: p.tools.clone(),
            has_experience: p.has_experience,
            experience_type,
            experience_type_other,
            experience_org: p.experience_org.clone(),
            experience_period: p.experience_period.clone(),
            experience_activities: p.experience_activities.clone(),
            experience_learnings: p.experience_learnings.clone(),
            extra_info: p.extra_info.clone(),
            how_did_you_hear,
            how_did_you_hear_other,
            cv_url: p.cv_url.clone(),
            lgpd_consent: p.lgpd_consent,
        }
    }
}
