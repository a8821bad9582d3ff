use crate::types::grade::GradeReport;

pub fn to_json(report: &GradeReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
