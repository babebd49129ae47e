//! Case-directory discovery.
//!
//! A case is a flat directory of tabular files. Logical names are fixed but
//! matching is forgiving: case is ignored, as are spaces, hyphens and
//! underscores, so `Load_hourly.csv`, `load hourly.csv` and `LOAD-HOURLY.csv`
//! all resolve to the same logical input.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sdom_core::{SdomError, SdomResult};

/// Logical input file names, as documented for case authors.
pub mod logical {
    pub const SCALARS: &str = "Scalars";
    pub const FORMULATIONS: &str = "Formulations";
    pub const LOAD: &str = "Load_hourly";
    pub const NUCLEAR: &str = "Nucl_hourly";
    pub const HYDRO: &str = "lahy_hourly";
    pub const OTHER_RENEWABLES: &str = "otre_hourly";
    pub const HYDRO_MAX: &str = "lahy_max_hourly";
    pub const HYDRO_MIN: &str = "lahy_min_hourly";
    pub const CF_SOLAR: &str = "CFSolar";
    pub const CF_WIND: &str = "CFWind";
    pub const CAP_SOLAR: &str = "CapSolar";
    pub const CAP_WIND: &str = "CapWind";
    pub const STORAGE: &str = "StorageData";
    pub const BALANCING: &str = "Data_BalancingUnits";
    pub const IMPORT_CAP: &str = "Import_Cap";
    pub const IMPORT_PRICES: &str = "Import_Prices";
    pub const EXPORT_CAP: &str = "Export_Cap";
    pub const EXPORT_PRICES: &str = "Export_Prices";
}

/// Fold a file stem or logical name onto the comparison alphabet.
pub(crate) fn normalize(name: &str) -> String {
    name.chars()
        .filter(|&c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// An opened case directory with its logical-name index.
#[derive(Debug)]
pub struct CaseDir {
    root: PathBuf,
    files: HashMap<String, PathBuf>,
}

impl CaseDir {
    /// Scan a directory and index its files by normalized stem.
    pub fn open(root: &Path) -> SdomResult<Self> {
        if !root.is_dir() {
            return Err(SdomError::Config(format!(
                "case directory '{}' does not exist",
                root.display()
            )));
        }
        let mut files = HashMap::new();
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = normalize(stem);
            if let Some(previous) = files.insert(key.clone(), path.clone()) {
                return Err(SdomError::Config(format!(
                    "'{}' and '{}' both resolve to input '{key}'",
                    previous.display(),
                    path.display()
                )));
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a required logical input.
    pub fn required(&self, logical: &str) -> SdomResult<&Path> {
        self.optional(logical).ok_or_else(|| {
            SdomError::Config(format!(
                "required input '{logical}' not found in '{}'",
                self.root.display()
            ))
        })
    }

    /// Path of an optional logical input, if present.
    pub fn optional(&self, logical: &str) -> Option<&Path> {
        self.files.get(&normalize(logical)).map(PathBuf::as_path)
    }
}
