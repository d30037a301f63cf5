//! REST API server.

pub mod run;
pub mod schema;
