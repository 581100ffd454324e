pub mod breaking;
pub mod patterns;

pub use breaking::{BreakingChangeReport, RiskLevel};
pub use patterns::CodePatternSummary;
