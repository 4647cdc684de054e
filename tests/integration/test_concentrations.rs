//! Dimer free energies and equilibrium concentrations, end to end.

use std::io::Cursor;

use approx::assert_relative_eq;
use multifold_lib::concentration::{DimerEnergies, parse_concentrations, solve};
use multifold_lib::config::{OutputFormat, RunConfig};
use multifold_lib::fold::{PairEnergyEngine, thermal_energy};

use crate::helpers::{run_in_memory, text_input};

#[test]
fn test_concentration_rows_stop_at_sentinel() {
    let rows =
        parse_concentrations(Cursor::new("1e-5 1e-5\n2e-5\t1e-5\n0 0\n3 3\n"), "test").unwrap();
    assert_eq!(rows.len(), 2);
    assert_relative_eq!(rows[1].a, 2e-5);
}

#[test]
fn test_mass_fractions_sum_to_one() {
    let energies = DimerEnergies { ab: -15.2, aa: -9.8, bb: -11.1, a: -3.4, b: -4.0 };
    let rows = parse_concentrations(Cursor::new("1e-5 1e-5\n1e-3 1e-6\n0.5 0\n"), "test").unwrap();
    let results = solve(&energies, thermal_energy(37.0), &rows).unwrap();
    assert_eq!(results.len(), 3);
    for result in &results {
        assert!(result.converged);
        assert_relative_eq!(result.total(), 1.0, epsilon = 1e-8);
    }
    // Without any B, nothing but A and AA can form.
    assert_relative_eq!(results[2].ab, 0.0);
    assert_relative_eq!(results[2].bb, 0.0);
}

#[test]
fn test_fold_reports_energies_and_table_per_dimer() {
    let config = RunConfig {
        jobs: 2,
        concentrations: Some(
            parse_concentrations(Cursor::new("1e-5 1e-5\n1e-4 1e-5\n"), "test").unwrap(),
        ),
        ..RunConfig::default()
    }
    .resolve()
    .unwrap();
    let input = text_input("dimers", ">d1\nGGGGAC&GUCCCC\n>d2\nGCGCAA&UUGCGC\n");

    let report = run_in_memory(&PairEnergyEngine::new(), &config, &[input]);
    assert!(report.error.is_none());
    let data = &report.sink.data;
    assert_eq!(data.matches("Free Energies:").count(), 2);
    assert_eq!(data.matches("Initial concentrations").count(), 2);
    assert!(data.find(">d1").unwrap() < data.find(">d2").unwrap());

    let rows: Vec<&str> =
        data.lines().filter(|line| line.starts_with("1e-05") || line.starts_with("0.0001")).collect();
    assert_eq!(rows.len(), 4);
    for row in rows {
        let total: f64 = row.split_whitespace().skip(2).map(|f| f.parse::<f64>().unwrap()).sum();
        // Five fractions printed with five decimals.
        assert!((total - 1.0).abs() < 5e-5, "row '{row}' sums to {total}");
    }
}

#[test]
fn test_tabular_dimer_columns() {
    let mut config = RunConfig {
        output: OutputFormat::Tabular { delimiter: '\t', header: true },
        ..RunConfig::default()
    };
    config.dimer_energies = true;
    let config = config.resolve().unwrap();
    let input = text_input("mixed", "GGGGAC&GUCCCC\nGGGAAACCC\n");

    let report = run_in_memory(&PairEnergyEngine::new(), &config, &[input]);
    assert!(report.error.is_none());
    let lines: Vec<_> = report.sink.data.lines().collect();
    assert_eq!(lines[0].split('\t').count(), 12);
    assert_eq!(lines[1].split('\t').count(), 12);
    // Single strands keep their columns, left empty.
    assert_eq!(lines[2].split('\t').count(), 12);
    assert!(lines[2].ends_with("\t\t\t\t\t"));
    assert!(report.sink.diagnostics.contains("two strands"));
}
