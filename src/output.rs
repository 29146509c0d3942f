// src/output.rs
use crate::types::{NescError, OutputFormat, ResolutionResult};
use std::io::Write;
use std::sync::Mutex;

/// Sink for resolved subdomains. Each result is written as one whole line
/// as soon as a worker hands it over.
pub struct OutputManager {
    format: OutputFormat,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl OutputManager {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_writer(format, Box::new(std::io::stdout()))
    }

    pub fn with_writer(format: OutputFormat, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            writer: Mutex::new(writer),
        }
    }

    pub fn write_result(&self, result: &ResolutionResult) -> Result<(), NescError> {
        let line = self.render(result)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| NescError::Output("Output writer poisoned".to_string()))?;

        writeln!(writer, "{}", line).map_err(|e| NescError::Output(e.to_string()))?;
        writer.flush().map_err(|e| NescError::Output(e.to_string()))?;
        Ok(())
    }

    fn render(&self, result: &ResolutionResult) -> Result<String, NescError> {
        match self.format {
            OutputFormat::Text => Ok(result.to_string()),
            OutputFormat::Json => serde_json::to_string(result)
                .map_err(|e| NescError::Output(format!("Failed to serialize JSON: {}", e))),
        }
    }
}
