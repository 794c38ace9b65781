//! Annotations are kept in a JSON sidecar next to the image so a session can
//! be resumed after closing the window.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::{Annotation, AnnotationStore};

#[derive(Debug, Serialize, Deserialize)]
struct AnnotationFile {
    annotations: Vec<Annotation>,
}

pub fn sidecar_path(image_path: &Path) -> PathBuf {
    image_path.with_extension(format!(
        "{}.cropper.json",
        image_path
            .extension()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    ))
}

/// Saved annotations for `image_path`, or an empty store if there are none.
pub fn load_annotations(image_path: &Path) -> AnnotationStore {
    let path = sidecar_path(image_path);
    if !path.exists() {
        return AnnotationStore::new();
    }
    match read(&path) {
        Ok(file) => {
            log::info!(
                "restored {} annotation(s) from {}",
                file.annotations.len(),
                path.display()
            );
            AnnotationStore::from_annotations(file.annotations)
        }
        Err(e) => {
            log::warn!("ignoring saved annotations: {e:#}");
            AnnotationStore::new()
        }
    }
}

fn read(path: &Path) -> Result<AnnotationFile> {
    let data = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Shapes still being drawn are not saved.
pub fn save_annotations(image_path: &Path, store: &AnnotationStore) -> Result<()> {
    let path = sidecar_path(image_path);
    let file = AnnotationFile {
        annotations: store
            .by_creation()
            .into_iter()
            .filter(|a| a.finished)
            .cloned()
            .collect(),
    };
    let data = serde_json::to_string_pretty(&file)?;
    std::fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;
    log::debug!("saved {} annotation(s) to {}", file.annotations.len(), path.display());
    Ok(())
}
