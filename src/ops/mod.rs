pub mod count_providers;
pub mod format;
pub mod missing_providers;
