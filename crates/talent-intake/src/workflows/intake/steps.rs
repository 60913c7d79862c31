use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::ApplicationFormData;
use super::validation::{schemas, StepSchema};

/// Ordered wizard steps, named as the form names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Welcome,
    Dados,
    Formacao,
    Areas,
    Experiencias,
    Detalhes,
    Complementares,
    Sucesso,
}

impl Step {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Dados => "dados",
            Self::Formacao => "formacao",
            Self::Areas => "areas",
            Self::Experiencias => "experiencias",
            Self::Detalhes => "detalhes",
            Self::Complementares => "complementares",
            Self::Sucesso => "sucesso",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown wizard step '{0}'")]
pub struct UnknownStep(pub String);

impl FromStr for Step {
    type Err = UnknownStep;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        STANDARD_STEPS
            .iter()
            .map(|definition| definition.id)
            .find(|step| step.as_str() == value.trim())
            .ok_or_else(|| UnknownStep(value.to_string()))
    }
}

/// Role a step plays in traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Intro,
    Data,
    Terminal,
}

pub type SkipPredicate = fn(&ApplicationFormData) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct StepDefinition {
    pub id: Step,
    pub kind: StepKind,
    pub label: &'static str,
    pub schema: &'static StepSchema,
    pub skip_when: Option<SkipPredicate>,
}

impl StepDefinition {
    pub fn is_skipped(&self, form: &ApplicationFormData) -> bool {
        self.skip_when.is_some_and(|predicate| predicate(form))
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        self.schema.required_fields().collect()
    }
}

fn without_experience(form: &ApplicationFormData) -> bool {
    !form.has_experience
}

pub static STANDARD_STEPS: [StepDefinition; 8] = [
    StepDefinition {
        id: Step::Welcome,
        kind: StepKind::Intro,
        label: "Início",
        schema: &schemas::NO_FIELDS,
        skip_when: None,
    },
    StepDefinition {
        id: Step::Dados,
        kind: StepKind::Data,
        label: "Dados",
        schema: &schemas::DADOS,
        skip_when: None,
    },
    StepDefinition {
        id: Step::Formacao,
        kind: StepKind::Data,
        label: "Formação",
        schema: &schemas::FORMACAO,
        skip_when: None,
    },
    StepDefinition {
        id: Step::Areas,
        kind: StepKind::Data,
        label: "Áreas",
        schema: &schemas::AREAS,
        skip_when: None,
    },
    StepDefinition {
        id: Step::Experiencias,
        kind: StepKind::Data,
        label: "Experiências",
        schema: &schemas::EXPERIENCIAS,
        skip_when: None,
    },
    StepDefinition {
        id: Step::Detalhes,
        kind: StepKind::Data,
        label: "Detalhes",
        schema: &schemas::DETALHES,
        skip_when: Some(without_experience),
    },
    StepDefinition {
        id: Step::Complementares,
        kind: StepKind::Data,
        label: "Envio",
        schema: &schemas::COMPLEMENTARES,
        skip_when: None,
    },
    StepDefinition {
        id: Step::Sucesso,
        kind: StepKind::Terminal,
        label: "Sucesso",
        schema: &schemas::NO_FIELDS,
        skip_when: None,
    },
];

/// Where a forward move from the current step leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Step(Step),
    /// The current step is the last data-bearing one; moving on means submitting.
    Submit,
    /// Nothing follows (terminal step).
    Stay,
}

/// Ordered step list with per-step skip predicates. Traversal never special-cases a step.
#[derive(Debug, Clone, Copy)]
pub struct StepRegistry {
    steps: &'static [StepDefinition],
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl StepRegistry {
    pub fn standard() -> Self {
        Self {
            steps: &STANDARD_STEPS,
        }
    }

    pub fn with_steps(steps: &'static [StepDefinition]) -> Self {
        Self { steps }
    }

    pub fn definitions(&self) -> &'static [StepDefinition] {
        self.steps
    }

    pub fn definition(&self, step: Step) -> Option<&'static StepDefinition> {
        self.steps.iter().find(|definition| definition.id == step)
    }

    fn index_of(&self, step: Step) -> Option<usize> {
        self.steps.iter().position(|definition| definition.id == step)
    }

    pub fn initial(&self) -> Step {
        self.steps
            .iter()
            .find(|definition| definition.kind == StepKind::Intro)
            .or_else(|| self.steps.first())
            .map_or(Step::Welcome, |definition| definition.id)
    }

    pub fn terminal(&self) -> Step {
        self.steps
            .iter()
            .find(|definition| definition.kind == StepKind::Terminal)
            .map_or(Step::Sucesso, |definition| definition.id)
    }

    pub fn is_skipped(&self, step: Step, form: &ApplicationFormData) -> bool {
        self.definition(step)
            .is_some_and(|definition| definition.is_skipped(form))
    }

    /// Next non-skipped step, or [`Transition::Submit`] when only the terminal step remains.
    pub fn next(&self, current: Step, form: &ApplicationFormData) -> Transition {
        let Some(index) = self.index_of(current) else {
            return Transition::Stay;
        };
        let current_kind = self.steps[index].kind;
        if current_kind == StepKind::Terminal {
            return Transition::Stay;
        }

        match self.steps[index + 1..]
            .iter()
            .find(|definition| !definition.is_skipped(form))
        {
            Some(definition) if definition.kind == StepKind::Terminal => {
                if current_kind == StepKind::Data {
                    Transition::Submit
                } else {
                    Transition::Stay
                }
            }
            Some(definition) => Transition::Step(definition.id),
            None => Transition::Stay,
        }
    }

    /// Nearest previous non-skipped step. Nothing precedes the intro, and the terminal
    /// step is final.
    pub fn previous(&self, current: Step, form: &ApplicationFormData) -> Option<Step> {
        let index = self.index_of(current)?;
        if self.steps[index].kind == StepKind::Terminal {
            return None;
        }
        self.steps[..index]
            .iter()
            .rev()
            .find(|definition| !definition.is_skipped(form))
            .map(|definition| definition.id)
    }

    /// Steps the user will pass through on the branch `form` has taken.
    pub fn visible_steps(&self, form: &ApplicationFormData) -> Vec<Step> {
        self.steps
            .iter()
            .filter(|definition| !definition.is_skipped(form))
            .map(|definition| definition.id)
            .collect()
    }

    /// Stepper position: data steps are numbered from 1 in declaration order (skipped
    /// steps keep their slot, as the stepper shows them).
    pub fn progress(&self, current: Step) -> StepProgress {
        let data_steps: Vec<&StepDefinition> = self
            .steps
            .iter()
            .filter(|definition| definition.kind != StepKind::Intro)
            .collect();
        let total = data_steps
            .iter()
            .filter(|definition| definition.kind == StepKind::Data)
            .count()
            + 1;
        let position = data_steps
            .iter()
            .position(|definition| definition.id == current)
            .map_or(0, |index| index + 1);
        let labels = std::iter::once(self.definition(self.initial()))
            .flatten()
            .chain(
                data_steps
                    .iter()
                    .copied()
                    .filter(|definition| definition.kind == StepKind::Data),
            )
            .map(|definition| definition.label)
            .collect();

        StepProgress {
            position,
            total,
            labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    pub position: usize,
    pub total: usize,
    pub labels: Vec<&'static str>,
}
