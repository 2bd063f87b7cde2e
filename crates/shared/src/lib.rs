//! Types shared between the controller and its front ends: domain model,
//! backend wire protocol and the backend error taxonomy.

pub mod domain;
pub mod error;
pub mod protocol;
