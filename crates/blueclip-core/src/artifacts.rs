//! Clip artifact storage and assembly.
//!
//! An [`ArtifactStore`] is an explicit handle to one artifact directory. Every
//! saved clip gets a `<page>_<uuid>_clip.pdf` file and an entry in the
//! directory's `clips.json` manifest carrying its creation time and a
//! monotonic sequence number. Assembly orders artifacts by creation time,
//! with the sequence breaking ties.
//!
//! The store assumes exclusive access to its directory for the duration of a
//! call; concurrent writers must be serialized by the caller.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use glob::{glob, Pattern};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ArtifactError, Result};
use crate::models::ClipArtifact;
use crate::pdf::{OutputDocument, SourceDocument};

/// Manifest file name inside an artifact directory.
pub const MANIFEST_FILE: &str = "clips.json";

/// Suffix marking a file as a clip artifact.
pub const CLIP_SUFFIX: &str = "_clip.pdf";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    next_sequence: u64,
    clips: Vec<ClipArtifact>,
}

/// Handle to a directory of clip artifacts.
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    manifest: Manifest,
}

impl ArtifactStore {
    /// Open (creating if needed) an artifact directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            serde_json::from_str(&content).map_err(|e| {
                ArtifactError::Manifest(format!("{}: {}", manifest_path.display(), e))
            })?
        } else {
            Manifest::default()
        };

        debug!(
            "Opened artifact store {} ({} tracked clips)",
            dir.display(),
            manifest.clips.len()
        );
        Ok(Self { dir, manifest })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of the artifact for a page (0-based) and id.
    pub fn file_name_for(page_index: usize, id: Uuid) -> String {
        format!("{}_{}{}", page_index + 1, id, CLIP_SUFFIX)
    }

    /// Write `output` as a new artifact for a source page (0-based).
    pub fn save_clip(&mut self, page_index: usize, output: OutputDocument) -> Result<ClipArtifact> {
        let id = Uuid::new_v4();
        let file = Self::file_name_for(page_index, id);
        let path = self.dir.join(&file);
        output.save(&path)?;

        let artifact = ClipArtifact {
            id,
            page_number: page_index + 1,
            file,
            created_at: Utc::now(),
            sequence: self.manifest.next_sequence,
            path,
        };
        self.manifest.next_sequence += 1;
        self.manifest.clips.push(artifact.clone());
        self.write_manifest()?;

        info!("Saved clip {} ({})", artifact.id, artifact.path.display());
        Ok(artifact)
    }

    /// Every artifact currently in the directory, in assembly order.
    ///
    /// Manifest entries whose file is gone are left out. Clip files the
    /// manifest does not know about are included with their filesystem
    /// modification time and sequence numbers after the tracked ones, so they
    /// slot into the timeline by timestamp.
    pub fn artifacts(&self) -> Result<Vec<ClipArtifact>> {
        let mut artifacts: Vec<ClipArtifact> = self
            .manifest
            .clips
            .iter()
            .filter_map(|clip| {
                let path = self.dir.join(&clip.file);
                if path.is_file() {
                    Some(ClipArtifact {
                        path,
                        ..clip.clone()
                    })
                } else {
                    debug!("Manifest entry {} has no file, skipping", clip.id);
                    None
                }
            })
            .collect();

        let mut untracked = self.untracked()?;
        untracked.sort_by(|a, b| (a.created_at, &a.file).cmp(&(b.created_at, &b.file)));
        let first = artifacts
            .iter()
            .map(|a| a.sequence + 1)
            .max()
            .unwrap_or(0)
            .max(self.manifest.next_sequence);
        for (offset, artifact) in untracked.iter_mut().enumerate() {
            artifact.sequence = first + offset as u64;
        }
        artifacts.extend(untracked);

        artifacts.sort_by_key(ClipArtifact::order_key);
        Ok(artifacts)
    }

    fn untracked(&self) -> Result<Vec<ClipArtifact>> {
        let known: HashSet<&str> = self.manifest.clips.iter().map(|c| c.file.as_str()).collect();
        let pattern = format!(
            "{}/*{}",
            Pattern::escape(&self.dir.to_string_lossy()),
            CLIP_SUFFIX
        );

        let mut found = Vec::new();
        let paths = glob(&pattern).map_err(|e| ArtifactError::Manifest(e.to_string()))?;
        for path in paths.filter_map(|r| r.ok()) {
            let Some(file) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if known.contains(file) {
                continue;
            }
            let Some((page_number, id)) = parse_file_name(file) else {
                debug!("Ignoring {}: not a clip artifact name", file);
                continue;
            };

            let metadata = std::fs::metadata(&path)?;
            let timestamp = metadata.modified().or_else(|_| metadata.created())?;
            found.push(ClipArtifact {
                id,
                page_number,
                file: file.to_string(),
                created_at: DateTime::<Utc>::from(timestamp),
                sequence: 0,
                path: path.clone(),
            });
        }

        if !found.is_empty() {
            debug!("Found {} untracked clip files", found.len());
        }
        Ok(found)
    }

    /// Delete an artifact's file and its manifest entry.
    ///
    /// An entry whose file is already gone is dropped from the manifest and
    /// reported as not found.
    pub fn remove(&mut self, id: Uuid) -> Result<ClipArtifact> {
        let Some(artifact) = self.artifacts()?.into_iter().find(|a| a.id == id) else {
            if self.forget(id) {
                self.write_manifest()?;
                warn!("Dropped manifest entry {} with no file", id);
            }
            return Err(ArtifactError::NotFound(id.to_string()).into());
        };

        std::fs::remove_file(&artifact.path)?;
        if self.forget(id) {
            self.write_manifest()?;
        }

        info!("Removed clip {}", id);
        Ok(artifact)
    }

    /// Drop `id` from the in-memory manifest. Returns whether it was there.
    fn forget(&mut self, id: Uuid) -> bool {
        let before = self.manifest.clips.len();
        self.manifest.clips.retain(|c| c.id != id);
        self.manifest.clips.len() != before
    }

    /// Assemble every artifact in the directory into one document.
    pub fn assemble(&self, output_path: impl AsRef<Path>) -> Result<usize> {
        assemble(&self.artifacts()?, output_path)
    }

    fn write_manifest(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.manifest)?;
        std::fs::write(self.dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }
}

/// Split `<page>_<uuid>_clip.pdf` into its page number and id.
fn parse_file_name(file: &str) -> Option<(usize, Uuid)> {
    let stem = file.strip_suffix(CLIP_SUFFIX)?;
    let (page, id) = stem.split_once('_')?;
    Some((page.parse().ok()?, Uuid::parse_str(id).ok()?))
}

/// Concatenate the pages of `artifacts` into one document at `output_path`,
/// ordered by creation time, then sequence. Returns the page count.
///
/// Any existing file at `output_path` is replaced.
pub fn assemble(artifacts: &[ClipArtifact], output_path: impl AsRef<Path>) -> Result<usize> {
    if artifacts.is_empty() {
        return Err(ArtifactError::NoArtifacts.into());
    }
    let output_path = output_path.as_ref();

    let mut ordered: Vec<&ClipArtifact> = artifacts.iter().collect();
    ordered.sort_by_key(|a| a.order_key());

    let mut output = OutputDocument::new();
    let mut pages = 0;
    for artifact in ordered {
        let source = SourceDocument::open(&artifact.path)?;
        pages += output.append_document(&source)?;
    }

    output.save(output_path)?;
    info!(
        "Assembled {} clips ({} pages) into {}",
        artifacts.len(),
        pages,
        output_path.display()
    );
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_name_round_trip() {
        let id = Uuid::new_v4();
        let file = ArtifactStore::file_name_for(2, id);
        assert_eq!(file, format!("3_{}_clip.pdf", id));
        assert_eq!(parse_file_name(&file), Some((3, id)));
    }

    #[test]
    fn test_parse_rejects_other_names() {
        assert_eq!(parse_file_name("parse_1.pdf"), None);
        assert_eq!(parse_file_name("x_notauuid_clip.pdf"), None);
        assert_eq!(parse_file_name("1_clip.pdf"), None);
    }

    #[test]
    fn test_assemble_nothing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = assemble(&[], dir.path().join("out.pdf")).unwrap_err();
        assert!(matches!(
            err,
            crate::ClipError::Artifact(ArtifactError::NoArtifacts)
        ));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("clips")).unwrap();
        assert!(store.artifacts().unwrap().is_empty());
        assert!(store.dir().is_dir());
    }

    #[test]
    fn test_corrupt_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "not json").unwrap();
        let err = ArtifactStore::open(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            crate::ClipError::Artifact(ArtifactError::Manifest(_))
        ));
    }

    #[test]
    fn test_remove_drops_entry_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let manifest = Manifest {
            next_sequence: 1,
            clips: vec![ClipArtifact {
                id,
                page_number: 1,
                file: ArtifactStore::file_name_for(0, id),
                created_at: Utc::now(),
                sequence: 0,
                path: PathBuf::new(),
            }],
        };
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let mut store = ArtifactStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.remove(id),
            Err(crate::ClipError::Artifact(ArtifactError::NotFound(_)))
        ));

        let reopened = ArtifactStore::open(dir.path()).unwrap();
        assert!(reopened.manifest.clips.is_empty());
        assert_eq!(reopened.manifest.next_sequence, 1);
    }

    #[test]
    fn test_remove_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.remove(Uuid::new_v4()),
            Err(crate::ClipError::Artifact(ArtifactError::NotFound(_)))
        ));
    }
}
