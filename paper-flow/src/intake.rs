use serde::{Deserialize, Serialize};

/// A binary file held by the intake collector before upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReference {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// The paper reference the user supplies to start an analysis.
///
/// All three fields may be filled; submission requires at least one. Both
/// drag-and-drop and picker inputs land in the same single file slot, so a
/// new file always replaces the previous one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeReference {
    pub file: Option<FileReference>,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub arxiv_url: String,
}

impl IntakeReference {
    /// At least one reference present. No DOI/arXiv syntax checking happens
    /// here; that is the coordinator's call.
    pub fn is_ready(&self) -> bool {
        self.file.is_some() || !self.doi.trim().is_empty() || !self.arxiv_url.trim().is_empty()
    }

    pub fn attach_file(&mut self, file: FileReference) {
        self.file = Some(file);
    }

    pub fn clear(&mut self) {
        self.file = None;
        self.doi.clear();
        self.arxiv_url.clear();
    }

    /// Synthesize the automatic opening message naming the supplied
    /// reference kinds. Callers must check `is_ready` first.
    pub fn opening_message(&self) -> String {
        let mut parts = Vec::new();
        if let Some(file) = &self.file {
            parts.push(format!("an uploaded PDF ({})", file.name));
        }
        if !self.doi.trim().is_empty() {
            parts.push(format!("DOI {}", self.doi.trim()));
        }
        if !self.arxiv_url.trim().is_empty() {
            parts.push(format!("arXiv link {}", self.arxiv_url.trim()));
        }
        format!(
            "I would like to analyze a research paper. Provided reference(s): {}.",
            parts.join(", ")
        )
    }
}
