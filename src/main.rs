use lbm_diffusion::config::load_parameters;
use lbm_diffusion::io::{FileOutput, OutputContext, DEFAULT_OUTPUT_DIR, DEFAULT_PREFIX};
use lbm_diffusion::simulation::{RunOptions, SimulationController};
use tracing::{info, warn, Level};

const PARAMS_FILE: &str = "params.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let params_path = std::env::args().nth(1).unwrap_or_else(|| PARAMS_FILE.to_string());

    // A bad or missing parameter file is not fatal: continue with what was read.
    let params = match load_parameters(&params_path) {
        Ok(params) => params,
        Err(partial) => {
            warn!(
                error = %partial.error,
                "continuing with partially read parameters"
            );
            partial.fallback
        }
    };
    info!(
        lx = params.lx(),
        ly = params.ly(),
        resolution = params.resolution(),
        convergence_iter = params.convergence_iter(),
        nx = params.nx(),
        ny = params.ny(),
        max_iter = params.max_iterations(),
        "parameters"
    );

    let context = OutputContext::new(DEFAULT_OUTPUT_DIR, DEFAULT_PREFIX)?;
    let mut controller = SimulationController::new(params, RunOptions::default())?;
    let mut output = FileOutput::new(context, &params, controller.workers());

    let report = controller.run(&mut output)?;
    info!(
        "Final profile at x = 0 ({} nodes) after {} iterations written to {}",
        report.profile.len(),
        report.iterations,
        output.context().output_dir().display()
    );

    Ok(())
}
