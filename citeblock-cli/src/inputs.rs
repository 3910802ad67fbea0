use anyhow::{Context, Result};
use citeblock_core::Preprocessor;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Where one document's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            InputSource::Stdin => {
                let mut bytes = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut bytes)
                    .context("Failed to read stdin")?;
                Ok(bytes)
            }
            InputSource::File(path) => std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Filename attached to records; stdin documents have none
    pub fn filename(&self) -> Option<String> {
        match self {
            InputSource::Stdin => None,
            InputSource::File(path) => Some(path.display().to_string()),
        }
    }

    /// Directory name for this document's stage dump. The position in the
    /// run keeps same-named files from different directories apart.
    pub fn stage_dir_name(&self, position: usize) -> String {
        let stem = match self {
            InputSource::Stdin => "stdin",
            InputSource::File(path) => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document"),
        };
        format!("{position:03}_{stem}")
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => write!(f, "<stdin>"),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Expand command line inputs into documents. Files are taken as given,
/// directories are walked for files the preprocessor supports, and no
/// inputs at all means stdin.
pub fn collect_inputs(inputs: &[PathBuf], preprocessor: &dyn Preprocessor) -> Vec<InputSource> {
    if inputs.is_empty() {
        return vec![InputSource::Stdin];
    }

    let mut sources = Vec::new();
    for input in inputs {
        if input.is_dir() {
            sources.extend(walk_dir(input, preprocessor));
        } else {
            sources.push(InputSource::File(input.clone()));
        }
    }
    sources
}

fn walk_dir(dir: &Path, preprocessor: &dyn Preprocessor) -> Vec<InputSource> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("⚠️  Skipping unreadable entry under {}: {err}", dir.display());
                continue;
            }
        };
        if entry.file_type().is_file() && preprocessor.supports_file_type(entry.path()) {
            found.push(InputSource::File(entry.into_path()));
        }
    }
    debug!(dir = %dir.display(), documents = found.len(), "directory walked");
    found
}
