use crate::config;

use std::io::Write;

/// Writes accepted and rejected input lines to two separate text logs.
///
/// Both files are truncated when the log is opened. A missing path disables
/// that side of the log.
pub struct ValidityLog {
    valid: Option<std::io::BufWriter<std::fs::File>>,
    error: Option<std::io::BufWriter<std::fs::File>>,
}

impl ValidityLog {
    pub fn disabled() -> Self {
        ValidityLog { valid: None, error: None }
    }

    pub fn open<P: AsRef<std::path::Path>>(valid: Option<P>, error: Option<P>) -> anyhow::Result<Self> {
        Ok(ValidityLog {
            valid: valid.map(|p| create_log(p.as_ref())).transpose()?,
            error: error.map(|p| create_log(p.as_ref())).transpose()?,
        })
    }

    pub fn from_settings(settings: &config::Settings) -> anyhow::Result<Self> {
        Self::open(settings.valid_log.as_ref(), settings.error_log.as_ref())
    }

    pub fn record_valid(&mut self, line: &str) -> anyhow::Result<()> {
        if let Some(w) = self.valid.as_mut() {
            writeln!(w, "Valid record: {}", line)?;
        }
        Ok(())
    }

    pub fn record_invalid(&mut self, line_no: u64, line: &str, reason: &str) -> anyhow::Result<()> {
        if let Some(w) = self.error.as_mut() {
            writeln!(w, "Invalid record (line {}: {}): {}", line_no, reason, line)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        if let Some(w) = self.valid.as_mut() {
            w.flush()?;
        }
        if let Some(w) = self.error.as_mut() {
            w.flush()?;
        }
        Ok(())
    }
}

fn create_log(path: &std::path::Path) -> anyhow::Result<std::io::BufWriter<std::fs::File>> {
    let file = std::fs::File::create(path)
        .map_err(|e| anyhow::anyhow!("Failed to create log file {}: {}", path.display(), e))?;
    Ok(std::io::BufWriter::new(file))
}
