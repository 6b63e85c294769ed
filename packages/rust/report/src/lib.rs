//! Markdown report rendering and output.
//!
//! A report is the model completion under an H1 title derived from the
//! topic. It is written once to `<output_dir>/<sanitized topic>.md`.

mod filename;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, instrument};

use researchkit_shared::{ResearchError, Result, Topic};

pub use filename::{FALLBACK_FILE_STEM, MAX_FILE_STEM_CHARS, sanitize_filename};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Provenance block rendered as YAML front matter under the title.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    /// Model id that produced the completion.
    pub model: String,
    /// Local time the report was generated.
    pub generated_at: DateTime<Local>,
}

/// A rendered research report.
#[derive(Debug, Clone)]
pub struct Report {
    /// Topic the report is about; becomes the title and the file name.
    pub topic: Topic,
    /// Raw model completion, written verbatim.
    pub body: String,
    /// Optional front matter.
    pub meta: Option<ReportMeta>,
}

impl Report {
    pub fn new(topic: Topic, body: impl Into<String>) -> Self {
        Self {
            topic,
            body: body.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: ReportMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Title line, without trailing newline.
    pub fn title_line(&self) -> String {
        format!("# {}", self.topic)
    }

    /// File name the report is written under.
    pub fn file_name(&self) -> String {
        format!("{}.md", sanitize_filename(self.topic.as_str()))
    }

    /// Render the full document.
    ///
    /// The first line is always the title; the completion follows verbatim
    /// after one blank line (or after the front matter block, if any).
    pub fn render(&self) -> String {
        let mut out = self.title_line();
        out.push_str("\n\n");

        if let Some(meta) = &self.meta {
            out.push_str("---\n");
            out.push_str(&format!("topic: {}\n", yaml_quote(self.topic.as_str())));
            out.push_str(&format!(
                "generated: {}\n",
                meta.generated_at.format("%Y-%m-%d %H:%M:%S")
            ));
            out.push_str(&format!("model: {}\n", yaml_quote(&meta.model)));
            out.push_str("---\n\n");
        }

        out.push_str(&self.body);
        out
    }
}

/// Quote a YAML scalar. A JSON string literal is a valid YAML
/// double-quoted scalar.
fn yaml_quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Write `report` into `output_dir`, creating the directory if needed.
///
/// The file is written to a temporary name first and renamed into place, so
/// a failed write never leaves a partial report behind. An existing report
/// with the same name is replaced.
#[instrument(skip_all, fields(dir = %output_dir.display(), topic = %report.topic))]
pub fn write_report(output_dir: &Path, report: &Report) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| ResearchError::io(output_dir, e))?;

    let file_name = report.file_name();
    let target = output_dir.join(&file_name);
    let temp = output_dir.join(format!(".{file_name}.tmp"));
    let content = report.render();

    std::fs::write(&temp, &content).map_err(|e| ResearchError::io(&temp, e))?;

    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(ResearchError::io(&target, e));
    }

    debug!(size = content.len(), "wrote report");
    info!(path = %target.display(), "report saved");

    Ok(target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
