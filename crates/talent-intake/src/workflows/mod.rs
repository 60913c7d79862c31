pub(crate) mod http;
pub mod intake;
pub mod invites;
pub mod opportunities;
pub mod review;
