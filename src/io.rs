use nalgebra::DMatrix;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::{DerivedFields, VectorField};
use crate::config::SimulationParameters;
use crate::error::OutputError;
use crate::json_io::JsonSummary;

pub const DEFAULT_OUTPUT_DIR: &str = "./tmp/";
pub const DEFAULT_PREFIX: &str = "ad_diffusion_";
pub const PROFILE_FILE: &str = "concentration_final.dat";
pub const SUMMARY_FILE: &str = "summary.json";

pub(crate) fn io_error(path: &Path) -> impl FnOnce(io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Diagnostics handed out at one cadence point.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub iteration: usize,
    pub fields: DerivedFields,
    pub average_flux: f64,
}

impl Diagnostics {
    pub fn new(iteration: usize, fields: DerivedFields) -> Self {
        let average_flux = fields.average_flux();
        Self {
            iteration,
            fields,
            average_flux,
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.fields.density.sum()
    }
}

/// End-of-run result: the density column at `x = 0` and how far it is from
/// the analytic semi-infinite solution.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub iterations: usize,
    pub profile: Vec<f64>,
    pub reference_deviation: f64,
}

/// Receiver of everything the controller reports.
pub trait OutputSink {
    fn write_diagnostics(
        &mut self,
        params: &SimulationParameters,
        diagnostics: &Diagnostics,
    ) -> Result<(), OutputError>;

    fn write_final_report(
        &mut self,
        params: &SimulationParameters,
        report: &FinalReport,
    ) -> Result<(), OutputError>;
}

/// Where output files go. Created on construction if absent.
#[derive(Debug, Clone)]
pub struct OutputContext {
    output_dir: PathBuf,
    prefix: String,
}

impl OutputContext {
    pub fn new<P: Into<PathBuf>>(output_dir: P, prefix: &str) -> Result<Self, OutputError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(io_error(&output_dir))?;
        info!("Ensured output directory exists: {}", output_dir.display());
        Ok(Self {
            output_dir,
            prefix: prefix.to_string(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// `<prefix><iteration, zero-padded to 6>.vti`
    pub fn image_path(&self, iteration: usize) -> PathBuf {
        self.path(&format!("{}{:06}.vti", self.prefix, iteration))
    }
}

/// One named point-data array of a VTK image.
#[derive(Debug, Clone)]
pub struct ImageArray<'a> {
    pub name: &'a str,
    pub components: Vec<&'a DMatrix<f64>>,
    pub scale: f64,
}

impl<'a> ImageArray<'a> {
    pub fn scalar(name: &'a str, field: &'a DMatrix<f64>, scale: f64) -> Self {
        Self {
            name,
            components: vec![field],
            scale,
        }
    }

    pub fn vector(name: &'a str, field: &'a VectorField, scale: f64) -> Self {
        Self {
            name,
            components: vec![&field.x, &field.y],
            scale,
        }
    }
}

/// Writes a VTK XML ImageData file with ASCII Float32 point data.
/// All arrays must share the shape `nx x ny`.
pub fn write_image<W: Write>(
    out: &mut W,
    nx: usize,
    ny: usize,
    spacing: f64,
    arrays: &[ImageArray<'_>],
) -> io::Result<()> {
    let extent = format!("0 {} 0 {} 0 0", nx.saturating_sub(1), ny.saturating_sub(1));
    writeln!(out, "<?xml version=\"1.0\"?>")?;
    writeln!(
        out,
        "<VTKFile type=\"ImageData\" version=\"0.1\" byte_order=\"LittleEndian\">"
    )?;
    writeln!(
        out,
        "  <ImageData WholeExtent=\"{extent}\" Origin=\"0 0 0\" Spacing=\"{spacing} {spacing} {spacing}\">"
    )?;
    writeln!(out, "    <Piece Extent=\"{extent}\">")?;
    writeln!(out, "      <PointData>")?;
    for array in arrays {
        writeln!(
            out,
            "        <DataArray type=\"Float32\" Name=\"{}\" NumberOfComponents=\"{}\" \
             format=\"ascii\">",
            array.name,
            array.components.len()
        )?;
        write!(out, "         ")?;
        for y in 0..ny {
            for x in 0..nx {
                for component in &array.components {
                    write!(out, " {}", (component[(x, y)] * array.scale) as f32)?;
                }
            }
        }
        writeln!(out)?;
        writeln!(out, "        </DataArray>")?;
    }
    writeln!(out, "      </PointData>")?;
    writeln!(out, "    </Piece>")?;
    writeln!(out, "  </ImageData>")?;
    writeln!(out, "</VTKFile>")?;
    Ok(())
}

/// Space-separated values at 7 decimal places.
pub fn write_profile<W: Write>(out: &mut W, profile: &[f64]) -> io::Result<()> {
    for value in profile {
        write!(out, "{value:.7} ")?;
    }
    writeln!(out)?;
    writeln!(out)?;
    Ok(())
}

/// File-backed sink: one `.vti` per cadence point, the final profile as
/// plain text and a JSON run summary.
#[derive(Debug)]
pub struct FileOutput {
    context: OutputContext,
    summary: JsonSummary,
}

impl FileOutput {
    pub fn new(context: OutputContext, params: &SimulationParameters, workers: usize) -> Self {
        let summary = JsonSummary::new(context.path(SUMMARY_FILE), params, workers);
        Self { context, summary }
    }

    pub fn context(&self) -> &OutputContext {
        &self.context
    }
}

impl OutputSink for FileOutput {
    fn write_diagnostics(
        &mut self,
        params: &SimulationParameters,
        diagnostics: &Diagnostics,
    ) -> Result<(), OutputError> {
        let path = self.context.image_path(diagnostics.iteration);
        let fields = &diagnostics.fields;
        let scale = params.resolution() as f64;
        let arrays = [
            ImageArray::scalar("density", &fields.density, 1.0),
            ImageArray::vector("potential flux", &fields.gradient, scale),
            ImageArray::scalar("norm flux", &fields.norm, scale),
            ImageArray::vector("Laplacian", &fields.laplacian, scale),
        ];
        let (nx, ny) = fields.density.shape();

        let file = File::create(&path).map_err(io_error(&path))?;
        let mut writer = BufWriter::new(file);
        write_image(&mut writer, nx, ny, params.dx(), &arrays).map_err(io_error(&path))?;
        writer.flush().map_err(io_error(&path))?;
        info!("Writing vtk instance at iT = {}", diagnostics.iteration);

        self.summary.collect(diagnostics);
        Ok(())
    }

    fn write_final_report(
        &mut self,
        _params: &SimulationParameters,
        report: &FinalReport,
    ) -> Result<(), OutputError> {
        let path = self.context.path(PROFILE_FILE);
        let file = File::create(&path).map_err(io_error(&path))?;
        let mut writer = BufWriter::new(file);
        write_profile(&mut writer, &report.profile).map_err(io_error(&path))?;
        writer.flush().map_err(io_error(&path))?;
        info!("Final concentration profile written to {}", path.display());

        self.summary.write(report)
    }
}
