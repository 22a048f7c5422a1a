pub mod blame;
pub mod log;

pub use blame::SurvivingLines;
pub use log::{parse_log, CommitEvent, FileDelta};
