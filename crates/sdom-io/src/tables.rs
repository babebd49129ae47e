//! CSV readers for the case-table schemas.
//!
//! Each reader is tolerant of an optional header row and strict about
//! everything else: short series, broken hour sequences and unparsable cells
//! are surfaced with file and row context.

use std::collections::HashMap;
use std::path::Path;

use sdom_core::{SdomError, SdomResult};

use crate::case::normalize;

/// Raw per-plant attribute row from a capacity table.
#[derive(Debug, Clone)]
pub struct PlantRow {
    pub id: String,
    pub capacity_mw: f64,
    pub capex_per_kw: f64,
    pub fom_per_kw_yr: f64,
    pub transmission_capex: f64,
    pub latitude: f64,
    pub longitude: f64,
}

fn open(path: &Path) -> SdomResult<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SdomError::Parse(format!("{}: {e}", path.display())))
}

fn records(path: &Path) -> SdomResult<Vec<csv::StringRecord>> {
    let mut rows = Vec::new();
    for record in open(path)?.records() {
        let record = record.map_err(|e| SdomError::Parse(format!("{}: {e}", path.display())))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record);
    }
    Ok(rows)
}

fn cell(record: &csv::StringRecord, idx: usize, path: &Path, row: usize) -> SdomResult<f64> {
    let raw = record.get(idx).unwrap_or("");
    raw.parse::<f64>().map_err(|_| {
        SdomError::Parse(format!(
            "{}: row {}, column {}: '{raw}' is not a number",
            path.display(),
            row + 1,
            idx + 1
        ))
    })
}

fn looks_numeric(field: Option<&str>) -> bool {
    field.is_some_and(|f| f.parse::<f64>().is_ok())
}

/// Read a two-column (name, value) scalar table.
///
/// Keys are normalized with the same folding as file names, so callers look
/// up `GenMix_Target` as `genmixtarget`.
pub fn read_scalars(path: &Path) -> SdomResult<HashMap<String, f64>> {
    let mut out = HashMap::new();
    for (row, record) in records(path)?.iter().enumerate() {
        if row == 0 && !looks_numeric(record.get(1)) {
            continue; // header
        }
        let name = record.get(0).unwrap_or("").to_string();
        if name.is_empty() {
            return Err(SdomError::Parse(format!(
                "{}: row {} has an empty scalar name",
                path.display(),
                row + 1
            )));
        }
        let value = cell(record, 1, path, row)?;
        out.insert(normalize(&name), value);
    }
    Ok(out)
}

/// Read a 1-indexed (hour, value) series, taking the first `horizon` rows.
///
/// Files may carry a full year; shorter study horizons read a prefix. Fewer
/// rows than the horizon is an error, as is a broken hour sequence.
pub fn read_hourly(path: &Path, horizon: usize) -> SdomResult<Vec<f64>> {
    let mut values = Vec::with_capacity(horizon);
    for (row, record) in records(path)?.iter().enumerate() {
        if row == 0 && !looks_numeric(record.get(0)) {
            continue; // header
        }
        if values.len() == horizon {
            break;
        }
        let hour = cell(record, 0, path, row)? as usize;
        if hour != values.len() + 1 {
            return Err(SdomError::Parse(format!(
                "{}: row {}: expected hour {}, found {hour}",
                path.display(),
                row + 1,
                values.len() + 1
            )));
        }
        values.push(cell(record, 1, path, row)?);
    }
    if values.len() < horizon {
        return Err(SdomError::Data(format!(
            "{}: {} hourly rows, horizon needs {horizon}",
            path.display(),
            values.len()
        )));
    }
    Ok(values)
}

/// Read an hour × plant capacity-factor matrix.
///
/// Returns the plant ids from the header and one column of `horizon` values
/// per plant.
pub fn read_cf_matrix(path: &Path, horizon: usize) -> SdomResult<(Vec<String>, Vec<Vec<f64>>)> {
    let rows = records(path)?;
    let Some(header) = rows.first() else {
        return Err(SdomError::Parse(format!("{}: empty table", path.display())));
    };
    let ids: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
    if ids.is_empty() {
        return Err(SdomError::Config(format!(
            "{}: capacity-factor table has no plant columns",
            path.display()
        )));
    }
    let mut columns = vec![Vec::with_capacity(horizon); ids.len()];
    for (row, record) in rows.iter().enumerate().skip(1) {
        let filled = columns[0].len();
        if filled == horizon {
            break;
        }
        let hour = cell(record, 0, path, row)? as usize;
        if hour != filled + 1 {
            return Err(SdomError::Parse(format!(
                "{}: row {}: expected hour {}, found {hour}",
                path.display(),
                row + 1,
                filled + 1
            )));
        }
        if record.len() < ids.len() + 1 {
            return Err(SdomError::Parse(format!(
                "{}: row {} has {} columns, expected {}",
                path.display(),
                row + 1,
                record.len(),
                ids.len() + 1
            )));
        }
        for (p, column) in columns.iter_mut().enumerate() {
            column.push(cell(record, p + 1, path, row)?);
        }
    }
    if columns[0].len() < horizon {
        return Err(SdomError::Data(format!(
            "{}: {} hourly rows, horizon needs {horizon}",
            path.display(),
            columns[0].len()
        )));
    }
    Ok((ids, columns))
}

/// Read a per-plant capacity/cost table (id, MW, $/kW capex, $/kW-yr FOM,
/// $ transmission capex, latitude, longitude).
pub fn read_plant_table(path: &Path) -> SdomResult<Vec<PlantRow>> {
    let mut out = Vec::new();
    for (row, record) in records(path)?.iter().enumerate() {
        if row == 0 && !looks_numeric(record.get(1)) {
            continue; // header
        }
        if record.len() < 7 {
            return Err(SdomError::Config(format!(
                "{}: row {} has {} columns, the plant schema needs 7",
                path.display(),
                row + 1,
                record.len()
            )));
        }
        out.push(PlantRow {
            id: record.get(0).unwrap_or("").to_string(),
            capacity_mw: cell(record, 1, path, row)?,
            capex_per_kw: cell(record, 2, path, row)?,
            fom_per_kw_yr: cell(record, 3, path, row)?,
            transmission_capex: cell(record, 4, path, row)?,
            latitude: cell(record, 5, path, row)?,
            longitude: cell(record, 6, path, row)?,
        });
    }
    Ok(out)
}

/// Read a parameter × technology table.
///
/// The header row names the technologies; each following row is one
/// parameter. Returns the technology ids and a map from normalized parameter
/// name to the per-technology values.
pub fn read_param_table(path: &Path) -> SdomResult<(Vec<String>, HashMap<String, Vec<f64>>)> {
    let rows = records(path)?;
    let Some(header) = rows.first() else {
        return Err(SdomError::Parse(format!("{}: empty table", path.display())));
    };
    let ids: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
    if ids.is_empty() {
        return Err(SdomError::Config(format!(
            "{}: parameter table has no technology columns",
            path.display()
        )));
    }
    let mut params = HashMap::new();
    for (row, record) in rows.iter().enumerate().skip(1) {
        let name = record.get(0).unwrap_or("").to_string();
        if record.len() < ids.len() + 1 {
            return Err(SdomError::Config(format!(
                "{}: parameter '{name}' has {} values, expected {}",
                path.display(),
                record.len() - 1,
                ids.len()
            )));
        }
        let mut values = Vec::with_capacity(ids.len());
        for idx in 0..ids.len() {
            values.push(cell(record, idx + 1, path, row)?);
        }
        params.insert(normalize(&name), values);
    }
    Ok((ids, params))
}

/// Fetch a required parameter row from a parameter × technology table.
pub fn param_row<'a>(
    params: &'a HashMap<String, Vec<f64>>,
    name: &str,
    path: &Path,
) -> SdomResult<&'a [f64]> {
    params
        .get(&normalize(name))
        .map(Vec::as_slice)
        .ok_or_else(|| {
            SdomError::Config(format!(
                "{}: parameter row '{name}' is missing",
                path.display()
            ))
        })
}

/// Read the (component, formulation) selection table.
pub fn read_formulations(path: &Path) -> SdomResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for (row, record) in records(path)?.iter().enumerate() {
        let component = record.get(0).unwrap_or("").to_string();
        if row == 0 && normalize(&component) == "component" {
            continue; // header
        }
        let formulation = record.get(1).unwrap_or("").to_string();
        if component.is_empty() || formulation.is_empty() {
            return Err(SdomError::Parse(format!(
                "{}: row {} must name a component and a formulation",
                path.display(),
                row + 1
            )));
        }
        out.push((component, formulation));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_scalars_with_and_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let with = write(&dir, "a.csv", "Name,Value\nr,0.06\nGenMix_Target,0.8\n");
        let without = write(&dir, "b.csv", "r,0.06\nGenMix_Target,0.8\n");
        for path in [with, without] {
            let map = read_scalars(&path).unwrap();
            assert_eq!(map["r"], 0.06);
            assert_eq!(map["genmixtarget"], 0.8);
        }
    }

    #[test]
    fn test_hourly_prefix_and_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "load.csv", "hour,MW\n1,10\n2,20\n3,30\n");
        assert_eq!(read_hourly(&path, 2).unwrap(), vec![10.0, 20.0]);
        assert!(read_hourly(&path, 4).is_err());

        let broken = write(&dir, "broken.csv", "1,10\n3,30\n");
        assert!(matches!(
            read_hourly(&broken, 2).unwrap_err(),
            SdomError::Parse(_)
        ));
    }

    #[test]
    fn test_cf_matrix_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "cf.csv", "hour,pv1,pv2\n1,0.0,0.1\n2,0.5,0.6\n");
        let (ids, cols) = read_cf_matrix(&path, 2).unwrap();
        assert_eq!(ids, vec!["pv1", "pv2"]);
        assert_eq!(cols[0], vec![0.0, 0.5]);
        assert_eq!(cols[1], vec![0.1, 0.6]);
    }

    #[test]
    fn test_param_table_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "storage.csv",
            "Parameter,Li-Ion,PHS\nP_Capex,200,1500\nEff,0.85,0.78\n",
        );
        let (ids, params) = read_param_table(&path).unwrap();
        assert_eq!(ids, vec!["Li-Ion", "PHS"]);
        assert_eq!(param_row(&params, "P_Capex", &path).unwrap(), &[200.0, 1500.0]);
        assert!(param_row(&params, "VOM", &path).is_err());
    }

    #[test]
    fn test_formulations_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "form.csv",
            "Component,Formulation\nhydro,MonthlyBudget\nImports,Disabled\n",
        );
        let rows = read_formulations(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, "MonthlyBudget");
    }
}
