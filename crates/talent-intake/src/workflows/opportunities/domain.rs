use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityId;
use crate::workflows::intake::validation::{
    Check, Constraint, FieldRule, FieldSource, FieldValue, StepSchema, ValidationReport,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpportunityId(pub String);

impl std::fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkModel {
    #[default]
    Presencial,
    #[serde(rename = "Híbrido")]
    Hibrido,
    Remoto,
}

impl WorkModel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Presencial => "Presencial",
            Self::Hibrido => "Híbrido",
            Self::Remoto => "Remoto",
        }
    }
}

/// Internship opening candidates can apply to from the intro step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub location: String,
    pub work_model: WorkModel,
    pub weekly_hours: u32,
    pub monthly_stipend: Option<u32>,
    pub interest_areas: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub max_applications: Option<u32>,
    pub created_by: Option<IdentityId>,
}

impl Opportunity {
    /// Active and inside its date window (open-ended on either side when unset).
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.is_active
            && self.start_date.map_or(true, |start| start <= today)
            && self.end_date.map_or(true, |end| end >= today)
    }

    pub fn has_room(&self, applications: usize) -> bool {
        self.max_applications
            .map_or(true, |cap| applications < cap as usize)
    }
}

/// Admin-entered values for creating or editing an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpportunityForm {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub benefits: String,
    pub location: String,
    pub work_model: WorkModel,
    pub weekly_hours: u32,
    pub monthly_stipend: Option<u32>,
    pub interest_areas: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub max_applications: Option<u32>,
}

impl Default for OpportunityForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            requirements: String::new(),
            benefits: String::new(),
            location: String::new(),
            work_model: WorkModel::Presencial,
            weekly_hours: 20,
            monthly_stipend: None,
            interest_areas: Vec::new(),
            start_date: None,
            end_date: None,
            is_active: true,
            max_applications: None,
        }
    }
}

impl FieldSource for OpportunityForm {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "title" => FieldValue::Text(self.title.trim()),
            "location" => FieldValue::Text(self.location.trim()),
            "weekly_hours" => FieldValue::Number(self.weekly_hours.into()),
            "monthly_stipend" => self
                .monthly_stipend
                .map_or(FieldValue::Missing, |value| FieldValue::Number(value.into())),
            "max_applications" => self
                .max_applications
                .map_or(FieldValue::Missing, |value| FieldValue::Number(value.into())),
            "interest_areas" => FieldValue::List(&self.interest_areas),
            _ => FieldValue::Missing,
        }
    }
}

static OPPORTUNITY_SCHEMA: StepSchema = StepSchema::new(&[
    FieldRule::required(
        "title",
        &[Check::new(Constraint::Required, "Informe o título da oportunidade")],
    ),
    FieldRule::required(
        "location",
        &[Check::new(Constraint::Required, "Informe o local")],
    ),
    FieldRule::required(
        "weekly_hours",
        &[Check::new(
            Constraint::Range { min: 1, max: 44 },
            "A carga horária deve estar entre 1 e 44 horas semanais",
        )],
    ),
    FieldRule::optional(
        "max_applications",
        &[Check::new(
            Constraint::Range {
                min: 1,
                max: u32::MAX as i64,
            },
            "O limite de candidaturas deve ser de pelo menos 1",
        )],
    ),
]);

impl OpportunityForm {
    pub fn validate(&self) -> ValidationReport {
        let mut report = OPPORTUNITY_SCHEMA.validate(self);
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                report.reject(
                    "end_date",
                    "A data de término deve ser igual ou posterior à data de início",
                );
            }
        }
        report
    }

    /// Row a store writes for this form. Blank text fields are stored as `None`.
    pub fn to_opportunity(
        &self,
        id: OpportunityId,
        created_by: Option<IdentityId>,
        now: DateTime<Utc>,
    ) -> Opportunity {
        let mut opportunity = Opportunity {
            id,
            created_at: now,
            updated_at: now,
            title: String::new(),
            description: None,
            requirements: None,
            benefits: None,
            location: String::new(),
            work_model: self.work_model,
            weekly_hours: self.weekly_hours,
            monthly_stipend: None,
            interest_areas: Vec::new(),
            start_date: None,
            end_date: None,
            is_active: self.is_active,
            max_applications: None,
            created_by,
        };
        self.apply_to(&mut opportunity, now);
        opportunity
    }

    /// Overwrite the editable columns of an existing row, keeping its id and authorship.
    pub fn apply_to(&self, opportunity: &mut Opportunity, now: DateTime<Utc>) {
        opportunity.title = self.title.trim().to_string();
        opportunity.description = blank_to_none(&self.description);
        opportunity.requirements = blank_to_none(&self.requirements);
        opportunity.benefits = blank_to_none(&self.benefits);
        opportunity.location = self.location.trim().to_string();
        opportunity.work_model = self.work_model;
        opportunity.weekly_hours = self.weekly_hours;
        opportunity.monthly_stipend = self.monthly_stipend;
        opportunity.interest_areas = self.interest_areas.clone();
        opportunity.start_date = self.start_date;
        opportunity.end_date = self.end_date;
        opportunity.is_active = self.is_active;
        opportunity.max_applications = self.max_applications;
        opportunity.updated_at = now;
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
