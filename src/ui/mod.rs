//! User interface module - console output.
//!
//! Deployments are non-interactive; everything here prints. Pure text
//! building lives in `formatter` so it can be tested.

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_deploy_report, display_error, display_retention_plan, display_status, display_success,
    display_warning, format_deploy_report, format_retention_plan,
};
