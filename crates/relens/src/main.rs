//! Batch lens-reprojection tool: produce a variation of lens
//! configurations from reference renders with a known lens, then grade
//! and re-encode them in parallel.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail, ensure};
use clap::{Parser, ValueEnum};
use relens_batch::{JobDescriptor, OutputTarget, run_batch};
use relens_io::{OutputFormat, discover_inputs, read_scene_config, write_scene_config};
use relens_pipeline::{ColorGrade, InterpolationMethod, LensModel, RenderConfig, lens};
use tracing::info;

/// Reproject images rendered with a known lens configuration into a
/// different lens model, with optional exposure/tonemap grading.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input JSON file with the lens and camera settings of the input
    /// images.
    #[arg(long, value_name = "json-file")]
    input_cfg: PathBuf,

    /// Output JSON file to receive the updated lens and camera
    /// settings.
    #[arg(long, value_name = "json-file")]
    output_cfg: PathBuf,

    /// Input directory containing images to reproject.
    #[arg(short = 'i', long, value_name = "dir", conflicts_with = "single")]
    input_dir: Option<PathBuf>,

    /// A single input file to convert.
    #[arg(long, value_name = "file")]
    single: Option<PathBuf>,

    /// Output directory for the reprojected images.
    #[arg(short = 'o', long, value_name = "dir")]
    output_dir: PathBuf,

    /// Write EXR files (color and auxiliary channels).
    #[arg(long)]
    exr: bool,

    /// Write PNG files (color only).
    #[arg(long)]
    png: bool,

    /// Only include files whose name starts with this prefix.
    #[arg(long, value_name = "prefix", default_value = "")]
    filter_prefix: String,

    /// Only include files whose name ends with this suffix.
    #[arg(long, value_name = "suffix", default_value = "")]
    filter_suffix: String,

    /// Sub-samples per output pixel axis. Raise together with --scale
    /// below 1.0 to avoid aliasing (e.g. --scale 0.5 --samples 2).
    #[arg(short = 's', long, value_name = "number", default_value_t = 1)]
    samples: u32,

    /// Interpolation used for input lookups.
    #[arg(long, value_enum, default_value_t = InterpolationArg::Bicubic)]
    interpolation: InterpolationArg,

    /// Output scale as a fraction of the input size; final dimensions
    /// are truncated towards zero.
    #[arg(long, value_name = "fraction", default_value_t = 1.0)]
    scale: f64,

    /// Keep the input lens: no reprojection at all.
    #[arg(long)]
    no_reproject: bool,

    /// Output rectilinear images with the given tuple.
    #[arg(long, value_name = "focal_length,sensor_width")]
    rectilinear: Option<String>,

    /// Output equisolid fisheye images with the given tuple.
    #[arg(long, value_name = "focal_length,sensor_width,fov")]
    equisolid: Option<String>,

    /// Output equidistant fisheye images with the given field of view
    /// (radians).
    #[arg(long, value_name = "fov")]
    equidistant: Option<String>,

    /// Automatic exposure compensation from image statistics.
    #[arg(long)]
    auto_exposure: bool,

    /// Exposure compensation in stops (EV) to brighten or darken.
    #[arg(long, value_name = "EV", default_value_t = 0.0)]
    exposure: f32,

    /// Reinhard tonemapping white point applied after exposure.
    #[arg(long, value_name = "max", default_value_t = 1.0)]
    reinhard: f32,

    /// Skip a job when all of its output files already exist.
    #[arg(long)]
    skip_if_exists: bool,

    /// Number of images to process in parallel.
    #[arg(short = 'j', long, value_name = "threads", default_value_t = 1)]
    parallel: usize,

    /// Produce only the output config; do not reproject any images.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InterpolationArg {
    /// Nearest-neighbor.
    Nearest,
    /// Bilinear.
    Bilinear,
    /// Bicubic (Catmull-Rom).
    Bicubic,
}

impl From<InterpolationArg> for InterpolationMethod {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Nearest => Self::Nearest,
            InterpolationArg::Bilinear => Self::Bilinear,
            InterpolationArg::Bicubic => Self::Bicubic,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    ensure!(args.scale > 0.0, "--scale must be positive, got {}", args.scale);
    ensure!(args.samples >= 1, "--samples must be at least 1");
    ensure!(args.parallel >= 1, "--parallel must be at least 1");

    let formats = selected_formats(&args);
    if formats.is_empty() {
        bail!("no output format selected; choose --png or --exr (both are allowed)");
    }

    let config = read_scene_config(&args.input_cfg)?;
    let input_lens = config.input_lens()?;
    info!(
        "input camera: {:?}, resolution {}x{}",
        config.camera, config.resolution[0], config.resolution[1],
    );

    let output_lens = select_output_lens(&args, input_lens, config.aspect())?;

    let out_config = config
        .retain_frames(&args.filter_prefix, &args.filter_suffix)
        .with_output(&output_lens, args.scale);

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("failed to create output directory {}", args.output_dir.display())
    })?;
    write_scene_config(&out_config, &args.output_cfg)?;
    info!("wrote output config {}", args.output_cfg.display());

    if args.dry_run {
        info!("dry run, exiting before processing");
        return Ok(());
    }

    let inputs = gather_inputs(&args)?;
    if inputs.is_empty() {
        info!("no input files matched; nothing to do");
        return Ok(());
    }

    let render = RenderConfig {
        output_lens,
        scale: args.scale,
        samples: args.samples,
        interpolation: args.interpolation.into(),
        color: ColorGrade {
            auto_exposure: args.auto_exposure,
            exposure: 2f32.powf(args.exposure),
            white_point: args.reinhard,
        },
    };

    let jobs: Vec<JobDescriptor> = inputs
        .into_iter()
        .map(|input| JobDescriptor {
            outputs: output_targets(&input, &args.output_dir, &formats),
            input,
            input_lens,
            render,
            skip_if_exists: args.skip_if_exists,
        })
        .collect();

    let summary = run_batch(jobs, args.parallel);
    info!(
        "batch finished: {} done, {} failed of {}",
        summary.done, summary.failed, summary.total,
    );

    Ok(())
}

/// Output formats in a stable order.
fn selected_formats(args: &Args) -> Vec<OutputFormat> {
    let mut formats = Vec::new();
    if args.png {
        formats.push(OutputFormat::Png);
    }
    if args.exr {
        formats.push(OutputFormat::Exr);
    }
    formats
}

/// Resolve the requested output lens. Exactly one selection is
/// accepted; `--no-reproject` counts as selecting the input lens.
fn select_output_lens(
    args: &Args,
    input_lens: LensModel,
    aspect: f64,
) -> anyhow::Result<LensModel> {
    let mut selected = Vec::new();

    if let Some(spec) = &args.rectilinear {
        let (focal_length, sensor_width) =
            lens::parse_rectilinear_spec(spec).context("--rectilinear")?;
        selected.push(
            LensModel::rectilinear(focal_length, sensor_width, aspect).context("--rectilinear")?,
        );
    }
    if let Some(spec) = &args.equisolid {
        let (focal_length, sensor_width, fov) =
            lens::parse_equisolid_spec(spec).context("--equisolid")?;
        selected.push(
            LensModel::fisheye_equisolid(focal_length, sensor_width, fov, aspect)
                .context("--equisolid")?,
        );
    }
    if let Some(spec) = &args.equidistant {
        let fov = lens::parse_equidistant_spec(spec).context("--equidistant")?;
        selected.push(
            LensModel::fisheye_equidistant(fov, lens::DEFAULT_SENSOR_WIDTH, aspect)
                .context("--equidistant")?,
        );
    }
    if args.no_reproject {
        selected.push(input_lens);
    }

    match selected.len() {
        1 => Ok(selected.remove(0)),
        0 => bail!(
            "no output lens selected; pass one of --rectilinear, --equisolid, \
             --equidistant, or --no-reproject"
        ),
        _ => bail!(
            "only one output lens type may be selected \
             (--rectilinear, --equisolid, --equidistant, --no-reproject)"
        ),
    }
}

/// Input files: an explicit single path, or a filtered directory scan.
fn gather_inputs(args: &Args) -> anyhow::Result<Vec<PathBuf>> {
    if let Some(single) = &args.single {
        return Ok(vec![single.clone()]);
    }
    let Some(dir) = &args.input_dir else {
        bail!("no input specified; pass --input-dir or --single");
    };
    Ok(discover_inputs(dir, &args.filter_prefix, &args.filter_suffix)?)
}

/// One output target per requested format, named after the input stem.
fn output_targets(
    input: &Path,
    output_dir: &Path,
    formats: &[OutputFormat],
) -> Vec<OutputTarget> {
    let stem = input
        .file_stem()
        .unwrap_or(input.as_os_str())
        .to_string_lossy();
    formats
        .iter()
        .map(|&format| OutputTarget {
            format,
            path: output_dir.join(format!("{stem}.{}", format.extension())),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn single_and_input_dir_conflict() {
        let result = Args::command().try_get_matches_from([
            "relens",
            "--input-cfg", "in.json",
            "--output-cfg", "out.json",
            "-i", "frames",
            "--single", "frame.png",
            "-o", "out",
            "--png",
        ]);
        assert!(result.is_err(), "conflicting inputs must be rejected");
    }

    #[test]
    fn output_targets_follow_input_stem() {
        let targets = output_targets(
            &PathBuf::from("frames/shot_010.exr"),
            &PathBuf::from("out"),
            &[OutputFormat::Png, OutputFormat::Exr],
        );
        assert_eq!(targets[0].path, PathBuf::from("out/shot_010.png"));
        assert_eq!(targets[1].path, PathBuf::from("out/shot_010.exr"));
    }

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "relens",
            "--input-cfg", "in.json",
            "--output-cfg", "out.json",
            "-i", "frames",
            "-o", "out",
            "--png",
        ];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn rejects_two_output_lenses() {
        let args = parse(&["--rectilinear", "50,36", "--equidistant", "3.14"]);
        let input = LensModel::rectilinear(50.0, 36.0, 1.0).unwrap();
        assert!(select_output_lens(&args, input, 1.0).is_err());
    }

    #[test]
    fn rejects_missing_output_lens() {
        let args = parse(&[]);
        let input = LensModel::rectilinear(50.0, 36.0, 1.0).unwrap();
        assert!(select_output_lens(&args, input, 1.0).is_err());
    }

    #[test]
    fn no_reproject_selects_the_input_lens() {
        let args = parse(&["--no-reproject"]);
        let input = LensModel::rectilinear(50.0, 36.0, 1.0).unwrap();
        let output = select_output_lens(&args, input, 1.0).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn malformed_lens_spec_is_fatal() {
        let args = parse(&["--equisolid", "10.5;36;3.14"]);
        let input = LensModel::rectilinear(50.0, 36.0, 1.0).unwrap();
        assert!(select_output_lens(&args, input, 1.0).is_err());
    }
}
