pub mod entitlements;
pub mod enums;
pub mod storage;
pub mod subscribers;
pub mod usage;
