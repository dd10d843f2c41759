//! Atlas configuration loading
//!
//! The atlas is described by a JSON file naming a data directory, the surface
//! files inside it and per-tissue display parameters:
//!
//! ```json
//! {
//!   "files": { "root": "/data/liver", "vtk_files": ["Liver_IVC.vtk"] },
//!   "tissues": {
//!     "names": ["ivc"],
//!     "orientation": { "ivc": "hfsi" },
//!     "opacity": { "ivc": 1.0 },
//!     "indices": { "ivc": 1 }
//!   }
//! }
//! ```
//!
//! Keys of the `tissues` and `figures` sections are merged into a single
//! parameter map, later sections overriding earlier ones.

use atlasview_core::{Error, Result};
use atlasview_reslice::OrientationCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Tissue alias to the token its surface file stem contains
pub const TISSUE_ALIASES: [(&str, &str); 23] = [
    ("ivc", "IVC"),
    ("caudate_veins", "CaudateVeins"),
    ("main_portal_vein", "MainPortalVein"),
    ("left_portal_vein", "LeftPortalVein"),
    ("right_portal_vein", "RightPortalVein"),
    ("left_hepatic_vein", "LeftHepaticVein"),
    ("middle_hepatic_vein", "MiddleHepaticVein"),
    ("right_hepatic_vein", "RightHepaticVein"),
    ("liver_segment_i", "LiverSegment_I"),
    ("liver_segment_ii", "LiverSegment_II"),
    ("liver_segment_iii", "LiverSegment_III"),
    ("liver_segment_iva", "LiverSegment_IVa"),
    ("liver_segment_ivb", "LiverSegment_IVb"),
    ("liver_segment_v", "LiverSegment_V"),
    ("liver_segment_vi", "LiverSegment_VI"),
    ("liver_segment_vii", "LiverSegment_VII"),
    ("liver_segment_viii", "LiverSegment_VIII"),
    ("gallbladder", "Gallbladder"),
    ("stomach", "Stomach"),
    ("right_kidney", "RightKidney"),
    ("left_kidney", "LeftKidney"),
    ("spleen", "Spleen"),
    ("aorta", "Aorta"),
];

/// File-stem token for a tissue alias, case-insensitive
pub fn stem_token(tissue: &str) -> Option<&'static str> {
    let key = tissue.to_lowercase();
    TISSUE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, token)| *token)
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    files: RawFiles,
    #[serde(default)]
    tissues: Map<String, Value>,
    #[serde(default)]
    figures: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawFiles {
    root: PathBuf,
    vtk_files: Vec<String>,
}

/// Display parameters of one tissue surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TissueSpec {
    pub name: String,
    pub path: PathBuf,
    pub orientation: OrientationCode,
    pub opacity: f64,
    /// Lookup table index of the tissue color
    pub color_index: i64,
}

/// Validated atlas description
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    root: PathBuf,
    /// Surface files by stem, in listing order
    surface_files: Vec<(String, PathBuf)>,
    parameters: BTreeMap<String, Value>,
}

impl AtlasConfig {
    /// Read and validate an atlas JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!(
            "Loaded atlas config {}: {} surface files, {} tissues",
            path.display(),
            config.surface_files.len(),
            config.tissue_names()?.len()
        );
        Ok(config)
    }

    /// Parse and validate atlas JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(content)?;

        let root = raw.files.root;
        if !root.exists() {
            return Err(Error::Config(format!(
                "Root directory does not exist: {}",
                root.display()
            )));
        }

        let mut surface_files: Vec<(String, PathBuf)> = Vec::new();
        for file in &raw.files.vtk_files {
            let path = root.join(file);
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "Surface file does not exist: {}",
                    path.display()
                )));
            }
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match surface_files.iter_mut().find(|(s, _)| *s == stem) {
                Some(entry) => entry.1 = path,
                None => surface_files.push((stem, path)),
            }
        }
        if surface_files.is_empty() {
            return Err(Error::Config(
                "No surface files configured, expected at least one".to_string(),
            ));
        }

        let parameters: BTreeMap<String, Value> =
            raw.tissues.into_iter().chain(raw.figures).collect();

        let config = Self {
            root,
            surface_files,
            parameters,
        };
        config.orientations()?;
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Surface files as `(stem, path)` pairs
    pub fn surface_files(&self) -> &[(String, PathBuf)] {
        &self.surface_files
    }

    /// Raw parameter value from the merged `tissues`/`figures` sections
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Tissue names in display order
    pub fn tissue_names(&self) -> Result<Vec<String>> {
        match self.parameters.get("names") {
            None => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }

    /// Parsed orientation code per tissue
    pub fn orientations(&self) -> Result<BTreeMap<String, OrientationCode>> {
        self.string_map("orientation")?
            .into_iter()
            .map(|(tissue, code)| Ok((tissue, code.parse::<OrientationCode>()?)))
            .collect()
    }

    /// Surface file of a tissue: the first file whose stem contains the
    /// tissue's alias token
    pub fn resolve(&self, tissue: &str) -> Result<&Path> {
        let token = stem_token(tissue).ok_or_else(|| {
            let known: Vec<&str> = TISSUE_ALIASES.iter().map(|(alias, _)| *alias).collect();
            Error::Config(format!(
                "No alias for tissue \"{}\". Known tissues: {}",
                tissue,
                known.join(", ")
            ))
        })?;

        self.surface_files
            .iter()
            .find(|(stem, _)| stem.contains(token))
            .map(|(_, path)| path.as_path())
            .ok_or_else(|| {
                let stems: Vec<&str> = self.surface_files.iter().map(|(s, _)| s.as_str()).collect();
                Error::Config(format!(
                    "No surface file for tissue \"{}\": no stem contains \"{}\" among {}",
                    tissue,
                    token,
                    stems.join(", ")
                ))
            })
    }

    /// Everything needed to display one tissue
    pub fn tissue(&self, name: &str) -> Result<TissueSpec> {
        let orientation = self
            .orientations()?
            .remove(name)
            .ok_or_else(|| Error::Config(format!("No orientation for tissue \"{}\"", name)))?;
        let opacity = self
            .section_map::<f64>("opacity")?
            .remove(name)
            .ok_or_else(|| Error::Config(format!("No opacity for tissue \"{}\"", name)))?;
        let color_index = self
            .section_map::<i64>("indices")?
            .remove(name)
            .ok_or_else(|| Error::Config(format!("No color index for tissue \"{}\"", name)))?;

        Ok(TissueSpec {
            name: name.to_string(),
            path: self.resolve(name)?.to_path_buf(),
            orientation,
            opacity,
            color_index,
        })
    }

    /// Display parameters of every configured tissue, in order
    pub fn tissues(&self) -> Result<Vec<TissueSpec>> {
        self.tissue_names()?
            .iter()
            .map(|name| self.tissue(name))
            .collect()
    }

    fn string_map(&self, key: &str) -> Result<BTreeMap<String, String>> {
        self.section_map(key)
    }

    fn section_map<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<BTreeMap<String, T>> {
        match self.parameters.get(key) {
            None => Ok(BTreeMap::new()),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }
}

/// Viewer-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Similarity threshold of the 3D segmentation display mode
    pub segmentation_threshold: f64,
    /// Initial axial slice offset
    pub initial_axial_offset: i64,
    /// Initial opacity of the per-label segmentation controls
    pub segmentation_opacity: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            segmentation_threshold: 0.0,
            initial_axial_offset: -50,
            segmentation_opacity: 0.9,
        }
    }
}

impl ViewerConfig {
    pub fn with_segmentation_threshold(mut self, threshold: f64) -> Self {
        self.segmentation_threshold = threshold;
        self
    }

    pub fn with_initial_axial_offset(mut self, offset: i64) -> Self {
        self.initial_axial_offset = offset;
        self
    }

    pub fn with_segmentation_opacity(mut self, opacity: f64) -> Self {
        self.segmentation_opacity = opacity;
        self
    }
}
