//! Admin-only user management: e-mail invitations and manual confirmation.

pub mod domain;
pub mod router;
pub mod service;


pub use domain::{Invite, InviteId, InviteStatus, InviteStore, NewInvite};
pub use router::{invite_router, InviteApi};
pub use service::{ConfirmOutcome, InviteError, InviteOutcome, InviteService};
