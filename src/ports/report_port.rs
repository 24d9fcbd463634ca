//! Report generation port trait.

use crate::domain::error::SeerError;
use crate::domain::pipeline::StrategyRun;
use std::path::Path;

/// Port for persisting a completed run.
pub trait ReportPort {
    fn write(&self, run: &StrategyRun, output_dir: &Path) -> Result<(), SeerError>;
}
