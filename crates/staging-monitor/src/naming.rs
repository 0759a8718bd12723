//! File naming convention shared by the converter and the monitor.
//!
//! A source `IMG_01.CR2` is rendered by the converter into
//! `<staging>/IMG_01.png` plus a processing-profile sidecar
//! `<staging>/IMG_01.png.pp3`. The base name (`IMG_01`) is the join key.

use serde::{Deserialize, Serialize};

/// Kind of artifact found in the staging directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The rendered image.
    Preview,
    /// The processing parameters written next to the preview.
    Sidecar,
}

/// Extensions the converter uses for its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNaming {
    /// Extension of the rendered preview, without the dot.
    #[serde(default = "default_preview_extension")]
    pub preview_extension: String,

    /// Suffix appended to a file name to form its sidecar, without the dot.
    #[serde(default = "default_sidecar_suffix")]
    pub sidecar_suffix: String,
}

fn default_preview_extension() -> String {
    "png".to_string()
}

fn default_sidecar_suffix() -> String {
    "pp3".to_string()
}

impl Default for ArtifactNaming {
    fn default() -> Self {
        Self {
            preview_extension: default_preview_extension(),
            sidecar_suffix: default_sidecar_suffix(),
        }
    }
}

impl ArtifactNaming {
    /// File name of the preview rendered for `base_name`.
    pub fn preview_file_name(&self, base_name: &str) -> String {
        format!("{}.{}", base_name, self.preview_extension)
    }

    /// File name of the sidecar belonging to `file_name`.
    pub fn sidecar_file_name(&self, file_name: &str) -> String {
        format!("{}.{}", file_name, self.sidecar_suffix)
    }

    /// Classify a staging file and recover the base name it belongs to.
    ///
    /// Matching is case-insensitive on extensions; the base name keeps its
    /// original case. Returns `None` for anything that is not an artifact.
    pub fn classify<'a>(&self, file_name: &'a str) -> Option<(ArtifactKind, &'a str)> {
        let (stem, ext) = split_extension(file_name)?;

        if ext.eq_ignore_ascii_case(&self.preview_extension) {
            return Some((ArtifactKind::Preview, stem));
        }

        if ext.eq_ignore_ascii_case(&self.sidecar_suffix) {
            let (base, inner) = split_extension(stem)?;
            if inner.eq_ignore_ascii_case(&self.preview_extension) {
                return Some((ArtifactKind::Sidecar, base));
            }
        }

        None
    }
}

/// Split `name` at its last dot into `(stem, extension)`.
///
/// Leading dots do not start an extension, so `.hidden` has none.
pub fn split_extension(name: &str) -> Option<(&str, &str)> {
    let idx = name.rfind('.')?;
    let stem = &name[..idx];
    if stem.chars().all(|c| c == '.') {
        return None;
    }
    Some((stem, &name[idx + 1..]))
}
