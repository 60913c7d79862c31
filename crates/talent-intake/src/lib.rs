//! Candidate intake for the talent bank: the multi-step application wizard, the admin
//! review board, opportunity management, and the ports to the hosted backend.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod storage;
pub mod telemetry;
pub mod workflows;
