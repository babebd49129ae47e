//! CSV export of run results.

use std::path::Path;

use serde::Serialize;

use sdom_core::{SdomError, SdomResult};

use crate::results::RunResults;

impl RunResults {
    /// Write the five output tables into `out_dir`, stamped with the case
    /// name.
    pub fn export_csv(&self, out_dir: &Path) -> SdomResult<()> {
        std::fs::create_dir_all(out_dir)?;
        write_table(
            &out_dir.join(format!("OutputGeneration_{}.csv", self.name)),
            &self.generation,
        )?;
        write_table(
            &out_dir.join(format!("OutputStorage_{}.csv", self.name)),
            &self.storage,
        )?;
        write_table(
            &out_dir.join(format!("OutputSummary_{}.csv", self.name)),
            &self.summary,
        )?;
        write_table(
            &out_dir.join(format!("OutputThermalGeneration_{}.csv", self.name)),
            &self.thermal,
        )?;
        write_table(
            &out_dir.join(format!("OutputInstalledPowerPlants_{}.csv", self.name)),
            &self.installed_plants,
        )?;
        Ok(())
    }
}

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> SdomResult<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| SdomError::Other(format!("{}: {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| SdomError::Other(format!("{}: {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| SdomError::Other(format!("{}: {e}", path.display())))?;
    Ok(())
}
