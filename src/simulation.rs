use std::time::Instant;
use tracing::{debug, info, info_span, warn};

use crate::analysis::{self, DerivedFields};
use crate::boundary::bc2d::{BoundaryPolicy, DirichletBoundary};
use crate::config::SimulationParameters;
use crate::domain::grid2d::Region2D;
use crate::domain::lattice::LatticeState;
use crate::error::SimulationError;
use crate::io::{Diagnostics, FinalReport, OutputSink};
use crate::numerical::analytic::{max_deviation, reference_profile};
use crate::solver::partition::default_workers;
use crate::solver::CollisionStreamEngine;

/// Initial concentration everywhere but the boundary.
pub const C_INIT: f64 = 0.0;
/// Concentration held on the south boundary.
pub const C_BOUNDARY: f64 = 1.0;

/// Lifecycle of a controller. A controller that failed to build never exists,
/// so there is no uninitialized state to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Configured,
    Stepping,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub workers: usize,
    pub boundary_policy: BoundaryPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            boundary_policy: BoundaryPolicy::default(),
        }
    }
}

/// True when diagnostics are due at `iteration`. A zero cadence never fires.
pub fn is_cadence_point(iteration: usize, convergence_iter: usize) -> bool {
    convergence_iter != 0 && iteration % convergence_iter == 0
}

/// Owns the lattice and drives the fixed-length time loop.
#[derive(Debug)]
pub struct SimulationController {
    params: SimulationParameters,
    lattice: LatticeState,
    engine: CollisionStreamEngine,
    boundary: DirichletBoundary,
    state: ControllerState,
    iterations_done: usize,
}

impl SimulationController {
    /// Builds the lattice, fills it with `C_INIT` and pins the south row to
    /// `C_BOUNDARY`.
    pub fn new(params: SimulationParameters, options: RunOptions) -> Result<Self, SimulationError> {
        let dims = params.dimensions();
        let mut lattice = LatticeState::new(dims)?;
        let boundary = DirichletBoundary::south(dims, C_BOUNDARY);
        let engine = CollisionStreamEngine::new(dims, params.omega(), options.workers)?
            .with_boundary(boundary, options.boundary_policy);

        info!("Omega = {}", params.omega());
        info!("tau_ad (tau advection/diffusion lattice) = {}", params.tau_ad());
        if !params.is_stable() {
            warn!(
                omega = params.omega(),
                "relaxation rate outside (0, 2); the run may diverge"
            );
        }

        lattice.initialize_at_equilibrium(Region2D::whole(dims), C_INIT, [0.0, 0.0]);
        boundary.apply(&mut lattice);
        lattice.log_populations(0, 0, "boundary node");

        Ok(Self {
            params,
            lattice,
            engine,
            boundary,
            state: ControllerState::Configured,
            iterations_done: 0,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn lattice(&self) -> &LatticeState {
        &self.lattice
    }

    pub fn boundary(&self) -> &DirichletBoundary {
        &self.boundary
    }

    pub fn workers(&self) -> usize {
        self.engine.workers()
    }

    pub fn iterations_done(&self) -> usize {
        self.iterations_done
    }

    /// Density on column `x = 0` for `y = 0..=resolution`, clipped to the lattice.
    pub fn final_profile(&self) -> Vec<f64> {
        let column = Region2D::column(0, 0, self.params.resolution());
        analysis::density(&self.lattice, column).iter().copied().collect()
    }

    /// Runs `max_iterations + 1` steps. Diagnostics for iteration `i` are taken
    /// before step `i` is applied. A controller runs once; later calls fail
    /// with [`SimulationError::InvalidState`].
    pub fn run<S: OutputSink>(&mut self, sink: &mut S) -> Result<FinalReport, SimulationError> {
        if self.state != ControllerState::Configured {
            return Err(SimulationError::InvalidState(self.state));
        }
        let max_iter = self.params.max_iterations();
        let convergence_iter = self.params.convergence_iter();
        let run_span = info_span!("simulation_run", max_iter, workers = self.workers()).entered();
        if convergence_iter == 0 {
            warn!("convergenceIter is zero; no intermediate output will be written");
        }

        self.state = ControllerState::Stepping;
        let start_time = Instant::now();
        for iteration in 0..=max_iter {
            if is_cadence_point(iteration, convergence_iter) {
                let fields = DerivedFields::compute(&self.lattice);
                let diagnostics = Diagnostics::new(iteration, fields);
                info!(
                    "Iteration {}: Average Flux = {}",
                    iteration, diagnostics.average_flux
                );
                sink.write_diagnostics(&self.params, &diagnostics)?;
            }
            self.engine.step(&mut self.lattice)?;
            self.iterations_done += 1;
            debug!("completed step {}", iteration);
        }
        self.state = ControllerState::Completed;
        info!(
            "Simulation finished in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );

        let profile = self.final_profile();
        let reference =
            reference_profile(profile.len(), self.iterations_done, self.params.tau_ad());
        let report = FinalReport {
            iterations: self.iterations_done,
            reference_deviation: max_deviation(&profile, &reference),
            profile,
        };
        info!(
            "Max deviation from analytic profile = {:.3e}",
            report.reference_deviation
        );
        sink.write_final_report(&self.params, &report)?;

        drop(run_span);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutputError;
    use crate::io::{FileOutput, OutputContext, DEFAULT_PREFIX, PROFILE_FILE, SUMMARY_FILE};
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingSink {
        iterations: Vec<usize>,
        boundary_densities: Vec<f64>,
        report: Option<FinalReport>,
    }

    impl OutputSink for RecordingSink {
        fn write_diagnostics(
            &mut self,
            _params: &SimulationParameters,
            diagnostics: &Diagnostics,
        ) -> Result<(), OutputError> {
            self.iterations.push(diagnostics.iteration);
            self.boundary_densities.push(diagnostics.fields.density[(0, 0)]);
            Ok(())
        }

        fn write_final_report(
            &mut self,
            _params: &SimulationParameters,
            report: &FinalReport,
        ) -> Result<(), OutputError> {
            self.report = Some(report.clone());
            Ok(())
        }
    }

    fn options(workers: usize) -> RunOptions {
        RunOptions {
            workers,
            boundary_policy: BoundaryPolicy::EveryStep,
        }
    }

    #[test]
    fn test_cadence_points() {
        assert!(is_cadence_point(0, 4));
        assert!(!is_cadence_point(3, 4));
        assert!(is_cadence_point(8, 4));
        assert!(!is_cadence_point(0, 0));
        assert!(!is_cadence_point(5, 0));
    }

    #[test]
    fn test_setup_state() {
        let params = SimulationParameters::new(1, 1, 4, 4, 1.0).unwrap();
        let controller = SimulationController::new(params, options(2)).unwrap();
        assert_eq!(controller.state(), ControllerState::Configured);
        let lattice = controller.lattice();
        for x in 0..5 {
            assert_eq!(lattice.concentration_at(x, 0), C_BOUNDARY);
            for y in 1..5 {
                assert_relative_eq!(lattice.concentration_at(x, y), C_INIT, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_end_to_end_profile() {
        let params = SimulationParameters::new(1, 1, 4, 4, 1.0).unwrap();
        let mut controller = SimulationController::new(params, options(2)).unwrap();
        let mut sink = RecordingSink::default();
        let report = controller.run(&mut sink).unwrap();

        assert_eq!(controller.state(), ControllerState::Completed);
        assert_eq!(controller.iterations_done(), 17);
        assert_eq!(sink.iterations, vec![0, 4, 8, 12, 16]);
        assert!(sink.boundary_densities.iter().all(|&c| c == 1.0));

        let profile = &report.profile;
        assert_eq!(profile.len(), 5);
        assert_eq!(profile[0], 1.0);
        assert!(profile[4] < 1.0);
        assert!(profile[4] > 0.0);
        assert!(
            profile.windows(2).all(|w| w[1] <= w[0]),
            "profile not monotone: {:?}",
            profile
        );
        assert_eq!(sink.report.as_ref(), Some(&report));
    }

    #[test]
    fn test_completed_controller_does_not_run_again() {
        let params = SimulationParameters::new(1, 1, 4, 4, 1.0).unwrap();
        let mut controller = SimulationController::new(params, options(2)).unwrap();
        let mut sink = RecordingSink::default();
        let report = controller.run(&mut sink).unwrap();
        let populations = controller.lattice().populations().clone();

        let second = controller.run(&mut sink);
        assert!(matches!(
            second,
            Err(SimulationError::InvalidState(ControllerState::Completed))
        ));
        assert_eq!(controller.state(), ControllerState::Completed);
        assert_eq!(controller.iterations_done(), 17);
        assert_eq!(sink.iterations, vec![0, 4, 8, 12, 16]);
        assert_eq!(sink.report.as_ref(), Some(&report));
        assert_eq!(controller.lattice().populations(), &populations);
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let params = SimulationParameters::new(1, 2, 4, 100, 0.8).unwrap();
        let profiles: Vec<Vec<f64>> = [1, 2, 4]
            .iter()
            .map(|&w| {
                let mut controller = SimulationController::new(params, options(w)).unwrap();
                controller.run(&mut RecordingSink::default()).unwrap().profile
            })
            .collect();
        for other in &profiles[1..] {
            for (a, b) in profiles[0].iter().zip(other) {
                assert_relative_eq!(*a, *b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_setup_only_policy_lets_boundary_decay() {
        let params = SimulationParameters::new(1, 1, 4, 1, 1.0).unwrap();
        let opts = RunOptions {
            workers: 1,
            boundary_policy: BoundaryPolicy::SetupOnly,
        };
        let mut controller = SimulationController::new(params, opts).unwrap();
        let mut sink = RecordingSink::default();
        controller.run(&mut sink).unwrap();
        assert_eq!(sink.boundary_densities[0], 1.0);
        assert!(sink.boundary_densities[1] < 1.0);
    }

    #[test]
    fn test_zero_cadence_skips_diagnostics() {
        let params = SimulationParameters::new(1, 1, 2, 0, 1.0).unwrap();
        let mut controller = SimulationController::new(params, options(1)).unwrap();
        let mut sink = RecordingSink::default();
        controller.run(&mut sink).unwrap();
        assert!(sink.iterations.is_empty());
        assert!(sink.report.is_some());
    }

    #[test]
    fn test_run_with_file_output() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let params = SimulationParameters::new(1, 1, 4, 8, 1.0).unwrap();
        let mut controller = SimulationController::new(params, options(2))?;
        let context = OutputContext::new(dir.path().join("tmp"), DEFAULT_PREFIX)?;
        let mut output = FileOutput::new(context, &params, controller.workers());
        controller.run(&mut output)?;

        let out = dir.path().join("tmp");
        assert!(out.join("ad_diffusion_000000.vti").exists());
        assert!(out.join("ad_diffusion_000008.vti").exists());
        assert!(out.join("ad_diffusion_000016.vti").exists());
        assert!(out.join(PROFILE_FILE).exists());
        assert!(out.join(SUMMARY_FILE).exists());
        Ok(())
    }
}
