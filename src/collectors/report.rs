use crate::collectors::CollectError;
use crate::snapshot::CertReport;
use std::fs;
use std::path::Path;
use tracing::debug;

pub fn load_report(path: impl AsRef<Path>) -> Result<CertReport, CollectError> {
    let path_ref = path.as_ref();
    let path_display = path_ref.display().to_string();
    let text = fs::read_to_string(path_ref).map_err(|source| CollectError::ReadReport {
        path: path_display.clone(),
        source,
    })?;

    let report: CertReport =
        serde_json::from_str(&text).map_err(|source| CollectError::ParseReport {
            path: path_display.clone(),
            source,
        })?;

    debug!(
        path = %path_display,
        machines = report.data.len(),
        "отчёт о сертификатах загружен"
    );
    Ok(report)
}
