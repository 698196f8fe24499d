pub mod billing;
pub mod domain;
pub mod infra;
