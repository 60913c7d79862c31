use super::{Check, Constraint, FieldRule, StepSchema};
use crate::workflows::intake::domain::{PERIOD_OPTIONS, SHIFT_OPTIONS};
use crate::workflows::intake::steps::Step;

pub const CONSENT_REQUIRED_MESSAGE: &str =
    "Você deve aceitar a Política de Privacidade para continuar";

const fn min_chars(min: usize, message: &'static str) -> Check {
    Check::new(Constraint::MinChars(min), message)
}

pub(crate) static DADOS: StepSchema = StepSchema::new(&[
    FieldRule::required(
        "full_name",
        &[min_chars(3, "Nome deve ter pelo menos 3 caracteres")],
    ),
    FieldRule::required(
        "birth_date",
        &[min_chars(1, "Data de nascimento é obrigatória")],
    ),
    FieldRule::required(
        "email",
        &[Check::new(Constraint::Email, "Informe um e-mail válido")],
    ),
    FieldRule::required("whatsapp", &[min_chars(10, "Informe um telefone válido")]),
    FieldRule::required("city", &[min_chars(2, "Informe sua cidade")]),
]);

pub(crate) static FORMACAO: StepSchema = StepSchema::new(&[
    FieldRule::required(
        "institution",
        &[min_chars(2, "Informe a instituição de ensino")],
    ),
    FieldRule::required("course", &[min_chars(2, "Informe o curso")]),
    FieldRule::required(
        "current_period",
        &[
            min_chars(1, "Selecione o período atual"),
            Check::new(
                Constraint::OneOf(&PERIOD_OPTIONS),
                "Selecione o período atual",
            ),
        ],
    ),
    FieldRule::required(
        "study_shift",
        &[
            min_chars(1, "Selecione o turno de estudo"),
            Check::new(
                Constraint::OneOf(&SHIFT_OPTIONS),
                "Selecione o turno de estudo",
            ),
        ],
    ),
    FieldRule::optional(
        "graduation_month",
        &[Check::new(
            Constraint::Range { min: 1, max: 12 },
            "Informe um mês válido",
        )],
    ),
    FieldRule::optional(
        "graduation_year",
        &[Check::new(
            Constraint::Range {
                min: 2024,
                max: 2035,
            },
            "Informe um ano entre 2024 e 2035",
        )],
    ),
]);

pub(crate) static AREAS: StepSchema = StepSchema::new(&[
    FieldRule::required(
        "interest_areas",
        &[Check::new(
            Constraint::MinItems(1),
            "Selecione pelo menos uma área de interesse",
        )],
    ),
    FieldRule::required(
        "motivation",
        &[min_chars(
            10,
            "Descreva sua motivação (mínimo 10 caracteres)",
        )],
    ),
    FieldRule::required(
        "contributions",
        &[min_chars(
            10,
            "Descreva suas contribuições (mínimo 10 caracteres)",
        )],
    ),
]);

pub(crate) static EXPERIENCIAS: StepSchema = StepSchema::new(&[FieldRule::required(
    "has_experience",
    &[Check::new(Constraint::Required, "Informe se possui experiência")],
)]);

pub(crate) static DETALHES: StepSchema = StepSchema::new(&[
    FieldRule::required(
        "experience_type",
        &[min_chars(1, "Selecione o tipo de experiência")],
    ),
    FieldRule::required(
        "experience_org",
        &[min_chars(2, "Informe o nome da organização")],
    ),
    FieldRule::required(
        "experience_period",
        &[min_chars(3, "Informe o período de atuação")],
    ),
    FieldRule::required(
        "experience_activities",
        &[min_chars(
            10,
            "Descreva as atividades (mínimo 10 caracteres)",
        )],
    ),
    FieldRule::required(
        "experience_learnings",
        &[min_chars(
            10,
            "Descreva o que aprendeu (mínimo 10 caracteres)",
        )],
    ),
]);

pub(crate) static COMPLEMENTARES: StepSchema = StepSchema::new(&[
    FieldRule::required("how_did_you_hear", &[min_chars(1, "Selecione uma opção")]),
    FieldRule::required(
        "lgpd_consent",
        &[Check::new(Constraint::LiteralTrue, CONSENT_REQUIRED_MESSAGE)],
    ),
]);

pub(crate) static NO_FIELDS: StepSchema = StepSchema::empty();

/// Static schema owned by `step`. Intro and terminal steps own no fields.
pub fn schema_for(step: Step) -> &'static StepSchema {
    match step {
        Step::Dados => &DADOS,
        Step::Formacao => &FORMACAO,
        Step::Areas => &AREAS,
        Step::Experiencias => &EXPERIENCIAS,
        Step::Detalhes => &DETALHES,
        Step::Complementares => &COMPLEMENTARES,
        Step::Welcome | Step::Sucesso => &NO_FIELDS,
    }
}
