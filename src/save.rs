use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::CodeArtifact;

pub const SHARED_STORAGE_DIR: &str = "/storage/emulated/0";
pub const DOWNLOADS_DIR: &str = "/storage/emulated/0/Download";
pub const PROJECTS_DIR: &str = "projects";
pub const DEFAULT_SAVE_DIR: &str = "generated_code";

/// Words that mark a follow-up as intent to place staged code somewhere.
const SAVE_KEYWORDS: &[&str] = &[
    "save", "put", "create", "write", "make", "store", "place", "storage", "folder", "file",
    "directory", "yes", "yeah", "ok", "okay",
];

/// Ordered cues scanned for an explicit filename; a two-word cue requires
/// both words in order before the name.
const FILENAME_CUES: &[&str] = &["name", "call", "file", "create", "make", "save as", "put"];

/// True when the follow-up reads like a request to store the staged code.
/// Only meaningful while an artifact set is staged; otherwise the text is
/// ordinary conversation.
pub fn is_save_request(input: &str) -> bool {
    let lower = input.to_lowercase();
    SAVE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Resolved target for one save batch: a directory, an optional explicit
/// base filename, and the implicit numbering policy for multi-artifact
/// sets ([`SaveDirective::filename_for`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDirective {
    pub directory: String,
    pub filename: Option<String>,
}

/// Parses a free-form follow-up into a deterministic directive. Pure:
/// the same text always resolves the same way, and unmatched text falls
/// through to documented defaults instead of failing.
pub fn resolve(followup: &str) -> SaveDirective {
    let lower = followup.to_ascii_lowercase();
    SaveDirective {
        directory: resolve_directory(&lower).to_string(),
        filename: resolve_filename(followup, &lower),
    }
}

/// First match wins: shared storage, then projects, then downloads, then
/// the default directory.
fn resolve_directory(lower: &str) -> &'static str {
    if lower.contains("storage") || lower.contains("sdcard") {
        SHARED_STORAGE_DIR
    } else if lower.contains("project") {
        PROJECTS_DIR
    } else if lower.contains("download") {
        DOWNLOADS_DIR
    } else {
        DEFAULT_SAVE_DIR
    }
}

fn resolve_filename(original: &str, lower: &str) -> Option<String> {
    for cue in FILENAME_CUES {
        let start = match cue.split_once(' ') {
            Some((first, second)) => lower.find(first).and_then(|i| {
                lower[i..].find(second).map(|j| i + j + second.len())
            }),
            None => lower.find(cue).map(|i| i + cue.len()),
        };
        if let Some(start) = start {
            if let Some(name) = filename_token(&original[start..]) {
                return Some(name);
            }
        }
    }
    // Bare `word.ext` anywhere in the follow-up.
    filename_token(original)
}

/// First `word.ext` token whose extension is 1-4 alphanumeric characters.
fn filename_token(text: &str) -> Option<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .map(|token| token.trim_matches('.'))
        .find_map(|token| {
            let (base, ext) = token.rsplit_once('.')?;
            let valid = !base.is_empty()
                && !ext.is_empty()
                && ext.len() <= 4
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| token.to_string())
        })
}

impl SaveDirective {
    /// Filenames for a batch of `count` artifacts. With an explicit name
    /// and more than one artifact, the first keeps the exact name and the
    /// rest get `base_2.ext`, `base_3.ext`, … With no explicit name the
    /// caller falls back to each artifact's suggested filename (`None`).
    pub fn filename_for(&self, index: usize, count: usize) -> Option<String> {
        let name = self.filename.as_deref()?;
        if index == 0 || count <= 1 {
            return Some(name.to_string());
        }
        match name.rsplit_once('.') {
            Some((base, ext)) => Some(format!("{base}_{}.{ext}", index + 1)),
            None => Some(format!("{name}_{}", index + 1)),
        }
    }
}

/// Conversation-scoped slot holding the most recent unsaved artifact set.
/// `Empty -> Staged` on any non-empty extraction (the prior set is
/// superseded, never merged); `Staged -> Empty` exactly once per save
/// attempt, success or not.
#[derive(Debug, Default)]
pub enum Staging {
    #[default]
    Empty,
    Staged(Vec<CodeArtifact>),
}

impl Staging {
    pub fn stage(&mut self, artifacts: Vec<CodeArtifact>) {
        if !artifacts.is_empty() {
            *self = Staging::Staged(artifacts);
        }
    }

    pub fn take(&mut self) -> Option<Vec<CodeArtifact>> {
        match std::mem::take(self) {
            Staging::Empty => None,
            Staging::Staged(artifacts) => Some(artifacts),
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, Staging::Staged(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Staging::Empty => 0,
            Staging::Staged(artifacts) => artifacts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub language: String,
}

#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<SavedFile>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Writes the whole batch sequentially in artifact order, overwriting
/// existing files. A directory-creation or write failure is reported for
/// that artifact and the batch continues; nothing is re-staged.
pub fn execute_save(
    directive: &SaveDirective,
    artifacts: &[CodeArtifact],
    base_dir: &Path,
) -> SaveReport {
    let directory = if Path::new(&directive.directory).is_absolute() {
        PathBuf::from(&directive.directory)
    } else {
        base_dir.join(&directive.directory)
    };

    let mut report = SaveReport::default();
    for (index, artifact) in artifacts.iter().enumerate() {
        let filename = directive
            .filename_for(index, artifacts.len())
            .unwrap_or_else(|| artifact.suggested_filename.clone());
        let path = directory.join(filename);

        if let Err(err) = fs::create_dir_all(&directory) {
            tracing::warn!("could not create {}: {err}", directory.display());
            report.failed.push((path, err.to_string()));
            continue;
        }
        match fs::write(&path, &artifact.source) {
            Ok(()) => report.saved.push(SavedFile {
                path,
                language: artifact.language.clone(),
            }),
            Err(err) => report.failed.push((path, err.to_string())),
        }
    }
    report
}
