//! Binary-level tests: a real case directory in, output tables out.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn hourly(n: usize, value: f64) -> String {
    let mut body = String::from("hour,MW\n");
    for h in 1..=n {
        body.push_str(&format!("{h},{value}\n"));
    }
    body
}

fn write_case(dir: &Path) {
    fs::write(
        dir.join("Scalars.csv"),
        "Name,Value\nr,0.06\nGenMix_Target,0.2\nalpha_Nuclear,1.0\nalpha_Hydro,1.0\nalpha_OtherRenewables,1.0\n",
    )
    .unwrap();
    fs::write(
        dir.join("Formulations.csv"),
        "Component,Formulation\nhydro,RunOfRiver\nImports,Disabled\nExports,Disabled\n",
    )
    .unwrap();
    fs::write(dir.join("Load_hourly.csv"), hourly(24, 100.0)).unwrap();
    fs::write(dir.join("Nucl_hourly.csv"), hourly(24, 10.0)).unwrap();
    fs::write(dir.join("lahy_hourly.csv"), hourly(24, 5.0)).unwrap();
    fs::write(dir.join("otre_hourly.csv"), hourly(24, 0.0)).unwrap();
    let mut cf = String::from("hour,pv1\n");
    for h in 1..=24 {
        cf.push_str(&format!("{h},0.5\n"));
    }
    fs::write(dir.join("CFSolar.csv"), cf).unwrap();
    fs::write(
        dir.join("CapSolar.csv"),
        "id,MW,Capex,FOM,TransCost,Lat,Lon\npv1,50,800,15,1000000,35,-106\n",
    )
    .unwrap();
    let mut wind_cf = String::from("hour,w1\n");
    for h in 1..=24 {
        wind_cf.push_str(&format!("{h},0.4\n"));
    }
    fs::write(dir.join("CFWind.csv"), wind_cf).unwrap();
    fs::write(
        dir.join("CapWind.csv"),
        "id,MW,Capex,FOM,TransCost,Lat,Lon\nw1,80,1200,30,2000000,42,-95\n",
    )
    .unwrap();
    fs::write(
        dir.join("StorageData.csv"),
        "Parameter,battery\nP_Capex,500\nE_Capex,300\nEff,0.85\nMin_Duration,1\nMax_Duration,10\nMax_P,500\nCoupled,1\nFOM,8\nVOM,1\nLifetime,15\nCostRatio,0.5\nMaxCycles,5000\n",
    )
    .unwrap();
    fs::write(
        dir.join("Data_BalancingUnits.csv"),
        "Parameter,gas\nMinCapacity,0\nMaxCapacity,1000\nLifetime,25\nCapex,900\nHeatRate,6.5\nFuelCost,3\nVOM,2\nFOM,10\n",
    )
    .unwrap();
}

#[test]
fn solve_writes_the_output_tables() {
    let case = tempfile::tempdir().unwrap();
    write_case(case.path());
    let out = tempfile::tempdir().unwrap();

    Command::cargo_bin("sdom")
        .unwrap()
        .args(["solve"])
        .arg(case.path())
        .args(["--horizon", "24", "--model-name", "tiny"])
        .arg("--output-dir")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("optimal"));

    for table in [
        "OutputGeneration_tiny.csv",
        "OutputStorage_tiny.csv",
        "OutputSummary_tiny.csv",
        "OutputThermalGeneration_tiny.csv",
        "OutputInstalledPowerPlants_tiny.csv",
    ] {
        let path = out.path().join(table);
        assert!(path.is_file(), "missing {table}");
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.lines().count() > 1, "{table} has no data rows");
    }
}

#[test]
fn validate_reports_the_case_shape() {
    let case = tempfile::tempdir().unwrap();
    write_case(case.path());

    Command::cargo_bin("sdom")
        .unwrap()
        .args(["validate"])
        .arg(case.path())
        .args(["--horizon", "24"])
        .assert()
        .success()
        .stdout(predicate::str::contains("24 hours"))
        .stdout(predicate::str::contains("RunOfRiver"));
}

#[test]
fn missing_table_is_a_configuration_error() {
    let case = tempfile::tempdir().unwrap();
    write_case(case.path());
    fs::remove_file(case.path().join("StorageData.csv")).unwrap();

    Command::cargo_bin("sdom")
        .unwrap()
        .args(["validate"])
        .arg(case.path())
        .args(["--horizon", "24"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn impossible_clean_target_surfaces_as_infeasible() {
    let case = tempfile::tempdir().unwrap();
    write_case(case.path());
    fs::write(
        case.path().join("Scalars.csv"),
        "Name,Value\nr,0.06\nGenMix_Target,1.0\n",
    )
    .unwrap();
    let out = tempfile::tempdir().unwrap();

    Command::cargo_bin("sdom")
        .unwrap()
        .args(["solve"])
        .arg(case.path())
        .args(["--horizon", "24", "--model-name", "tiny"])
        .arg("--output-dir")
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("infeasible"));
}
