//! Internship opportunities: admin management and the open listing offered on the intro step.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{Opportunity, OpportunityForm, OpportunityId, WorkModel};
pub use repository::OpportunityStore;
pub use router::{opportunity_router, OpportunityApi};
pub use service::{OpportunityError, OpportunityService};
