pub mod access;
pub mod content_usage;
pub mod plan_catalog;
pub mod profiles;
pub mod subscribers;
