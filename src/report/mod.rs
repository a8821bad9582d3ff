pub mod json;
pub mod md;

use crate::error::GraderError;
use crate::types::grade::GradeReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Md,
}

pub fn render(report: &GradeReport, format: OutputFormat) -> Result<String, GraderError> {
    match format {
        OutputFormat::Json => json::to_json(report).map_err(GraderError::Json),
        OutputFormat::Md => Ok(md::to_markdown(report)),
    }
}
