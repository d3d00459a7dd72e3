// src/json_io.rs

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::config::SimulationParameters;
use crate::error::OutputError;
use crate::io::{io_error, Diagnostics, FinalReport};

#[derive(Serialize, Debug, Clone)]
struct Metadata {
    lx: usize,
    ly: usize,
    resolution: usize,
    nx: usize,
    ny: usize,
    dx: f64,
    tau_ad: f64,
    omega: f64,
    max_iterations: usize,
    convergence_iter: usize,
    workers: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CadenceRecord {
    pub iteration: usize,
    pub average_flux: f64,
    pub total_mass: f64,
    pub min_density: f64,
    pub max_density: f64,
}

#[derive(Serialize, Debug)]
struct FinalRecord<'a> {
    iterations: usize,
    profile: &'a [f64],
    reference_deviation: f64,
}

#[derive(Serialize, Debug)]
struct RunSummary<'a> {
    metadata: &'a Metadata,
    cadence: &'a [CadenceRecord],
    final_profile: FinalRecord<'a>,
}

/// Collects one record per cadence point and writes everything as a single
/// JSON document at the end of the run.
#[derive(Debug)]
pub struct JsonSummary {
    output_filepath: PathBuf,
    metadata: Metadata,
    records: Vec<CadenceRecord>,
}

impl JsonSummary {
    pub fn new(output_filepath: PathBuf, params: &SimulationParameters, workers: usize) -> Self {
        let metadata = Metadata {
            lx: params.lx(),
            ly: params.ly(),
            resolution: params.resolution(),
            nx: params.nx(),
            ny: params.ny(),
            dx: params.dx(),
            tau_ad: params.tau_ad(),
            omega: params.omega(),
            max_iterations: params.max_iterations(),
            convergence_iter: params.convergence_iter(),
            workers,
        };
        Self {
            output_filepath,
            metadata,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[CadenceRecord] {
        &self.records
    }

    pub fn collect(&mut self, diagnostics: &Diagnostics) {
        let density = &diagnostics.fields.density;
        self.records.push(CadenceRecord {
            iteration: diagnostics.iteration,
            average_flux: diagnostics.average_flux,
            total_mass: diagnostics.total_mass(),
            min_density: density.min(),
            max_density: density.max(),
        });
    }

    pub fn write(&self, report: &FinalReport) -> Result<(), OutputError> {
        info!("Writing run summary to JSON file: {}...", self.output_filepath.display());
        let output_start = Instant::now();
        let summary = RunSummary {
            metadata: &self.metadata,
            cadence: &self.records,
            final_profile: FinalRecord {
                iterations: report.iterations,
                profile: &report.profile,
                reference_deviation: report.reference_deviation,
            },
        };
        let json_string = serde_json::to_string_pretty(&summary)?;

        let path = &self.output_filepath;
        let file = File::create(path).map_err(io_error(path))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(json_string.as_bytes()).map_err(io_error(path))?;
        writer.flush().map_err(io_error(path))?;
        info!("JSON output finished in {}ms", output_start.elapsed().as_millis());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DerivedFields;
    use crate::domain::grid2d::{GridDimensions2D, Region2D};
    use crate::domain::lattice::LatticeState;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collect_records_extremes() {
        let params = SimulationParameters::new(1, 1, 3, 1, 1.0).unwrap();
        let mut summary = JsonSummary::new(PathBuf::from("unused.json"), &params, 1);
        let dims = params.dimensions();
        let mut lattice = LatticeState::new(dims).unwrap();
        lattice.initialize_at_equilibrium(Region2D::whole(dims), 0.25, [0.0, 0.0]);
        lattice.initialize_at_equilibrium(Region2D::row(0, 0, 3), 1.0, [0.0, 0.0]);
        summary.collect(&Diagnostics::new(3, DerivedFields::compute(&lattice)));

        let record = &summary.records()[0];
        assert_eq!(record.iteration, 3);
        assert_eq!(record.max_density, 1.0);
        assert_relative_eq!(record.min_density, 0.25, epsilon = 1e-12);
        assert_relative_eq!(record.total_mass, 4.0 + 12.0 * 0.25, epsilon = 1e-12);
        assert!(record.average_flux > 0.0);
    }

    #[test]
    fn test_write_summary() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let filepath = dir.path().join("summary.json");
        let params = SimulationParameters::new(2, 1, 4, 8, 0.8).unwrap();
        let summary = JsonSummary::new(filepath.clone(), &params, 4);
        let report = FinalReport {
            iterations: 17,
            profile: vec![1.0, 0.4],
            reference_deviation: 0.02,
        };
        summary.write(&report)?;

        let output: serde_json::Value = serde_json::from_str(&fs::read_to_string(filepath)?)?;
        assert_eq!(output["metadata"]["nx"], 9);
        assert_eq!(output["metadata"]["ny"], 5);
        assert_eq!(output["metadata"]["max_iterations"], 16);
        assert_eq!(output["metadata"]["omega"], 1.25);
        assert_eq!(output["cadence"].as_array().unwrap().len(), 0);
        assert_eq!(output["final_profile"]["profile"][1], 0.4);
        Ok(())
    }
}
