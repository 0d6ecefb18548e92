use std::path::Path;

use log::info;

use crate::{GraderError, grader::GradeRecord};

const HEADER: [&str; 3] = ["student_username", "grade", "feedback"];

/// Writes one CSV row per graded repository:
/// `student_username,grade,feedback`.
///
/// The header is written even when `records` is empty.
pub fn write_grades_csv(records: &[GradeRecord], path: &Path) -> Result<(), GraderError> {
    let report_err = |source: csv::Error| GraderError::Report {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(report_err)?;
    writer.write_record(HEADER).map_err(report_err)?;
    for record in records {
        writer.serialize(record).map_err(report_err)?;
    }
    writer
        .flush()
        .map_err(|err| report_err(csv::Error::from(err)))?;

    info!("wrote {} grade(s) to '{}'", records.len(), path.display());
    Ok(())
}
