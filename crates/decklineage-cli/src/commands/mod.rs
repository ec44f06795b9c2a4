pub mod current;
pub mod diff;
pub mod performance;
pub mod version;
