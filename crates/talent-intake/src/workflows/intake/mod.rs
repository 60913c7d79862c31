//! Candidate application wizard.
//!
//! Steps and their skip predicates live in [`steps`], per-step schemas in [`validation`],
//! the state machine in [`wizard`], and the mapping onto the stored row in [`submission`].
//! [`sessions`] keeps server-side wizards for the HTTP surface in [`router`].

pub mod domain;
pub mod repository;
pub mod router;
pub mod sessions;
pub mod steps;
pub mod submission;
pub mod validation;
pub mod wizard;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    ApplicationFormData, ApplicationId, ApplicationPayload, ApplicationRecord, ApplicationStatus,
    EXPERIENCE_TYPE_OPTIONS, HOW_DID_YOU_HEAR_OPTIONS, INTEREST_AREA_OPTIONS, OTHER_OPTION,
    PERIOD_OPTIONS, SHIFT_OPTIONS,
};
pub use repository::ApplicationStore;
pub use router::{intake_router, IntakeApi};
pub use sessions::{IntakeError, IntakeService, SessionId, SessionView};
pub use steps::{Step, StepDefinition, StepKind, StepProgress, StepRegistry, Transition};
pub use submission::{to_payload, SubmissionAdapter, SubmissionError, SubmissionRequest};
pub use validation::{validate_step, validate_submission, ValidationReport};
pub use wizard::{Advance, SubmissionStatus, WizardError, WizardState};
