//! Job descriptors and per-job execution.
//!
//! A [`JobDescriptor`] is an immutable value built before submission
//! and moved into the worker by value, so job data is decoupled from
//! the scheduling mechanism. Execution walks the state machine
//!
//! ```text
//! Queued → Loading → Transforming → ColorProcessing → Saving → Done
//! ```
//!
//! with any non-terminal state falling to `Failed` on error. The
//! image buffer is owned by the job and dropped on every exit path.

use std::fmt;
use std::path::PathBuf;

use relens_io::OutputFormat;
use relens_pipeline::{LensModel, PipelineError, RenderConfig, color, resample};
use tracing::{debug, info};

/// One requested output file.
#[derive(Debug, Clone)]
pub struct OutputTarget {
    /// Storage format.
    pub format: OutputFormat,
    /// Destination path.
    pub path: PathBuf,
}

/// Immutable parameters of one reprojection job.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    /// Source frame on disk.
    pub input: PathBuf,
    /// Requested outputs, one file per format.
    pub outputs: Vec<OutputTarget>,
    /// Lens the source frame was captured through.
    pub input_lens: LensModel,
    /// Shared pipeline parameters.
    pub render: RenderConfig,
    /// Reach `Done` without touching a codec when every output already
    /// exists.
    pub skip_if_exists: bool,
}

/// Per-job processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Loading,
    Transforming,
    ColorProcessing,
    Saving,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => f.write_str("queued"),
            Self::Loading => f.write_str("loading"),
            Self::Transforming => f.write_str("transforming"),
            Self::ColorProcessing => f.write_str("color-processing"),
            Self::Saving => f.write_str("saving"),
            Self::Done => f.write_str("done"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Recoverable per-job failure: logged, counted, never fatal to
/// sibling jobs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Codec or filesystem failure during load/save.
    #[error(transparent)]
    Io(#[from] relens_io::IoError),

    /// Pipeline failure (geometry mismatch, collapsed output).
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Run one job to a terminal state.
///
/// # Errors
///
/// [`JobError`] after the `Failed` transition has been logged; the
/// caller counts it and moves on.
pub(crate) fn execute(job: &JobDescriptor) -> Result<(), JobError> {
    let mut state = JobState::Queued;

    if job.skip_if_exists && !job.outputs.is_empty() && job.outputs.iter().all(|t| t.path.exists())
    {
        info!(input = %job.input.display(), "skipping, all outputs exist");
        advance(&mut state, JobState::Done, job);
        return Ok(());
    }

    match run_stages(&mut state, job) {
        Ok(()) => Ok(()),
        Err(error) => {
            advance(&mut state, JobState::Failed, job);
            Err(error)
        }
    }
}

fn run_stages(state: &mut JobState, job: &JobDescriptor) -> Result<(), JobError> {
    advance(state, JobState::Loading, job);
    let input = relens_io::load_image(&job.input, job.input_lens)?;

    let (out_width, out_height) = job
        .render
        .output_dimensions(input.width, input.height)
        .ok_or(PipelineError::EmptyOutput {
            width: input.width,
            height: input.height,
            scale: job.render.scale,
        })?;

    advance(state, JobState::Transforming, job);
    let mut output = resample::reproject(
        &input,
        job.render.output_lens,
        out_width,
        out_height,
        job.render.samples,
        job.render.interpolation,
    )?;

    advance(state, JobState::ColorProcessing, job);
    if job.render.color.auto_exposure {
        color::auto_exposure(&mut output, job.render.color.white_point);
    } else {
        color::post_process(
            &mut output,
            job.render.color.exposure,
            job.render.color.white_point,
        );
    }

    advance(state, JobState::Saving, job);
    for target in &job.outputs {
        relens_io::save_image(&output, &target.path, target.format)?;
    }

    advance(state, JobState::Done, job);
    Ok(())
}

fn advance(state: &mut JobState, next: JobState, job: &JobDescriptor) {
    debug!(from = %state, to = %next, input = %job.input.display(), "job state");
    *state = next;
}
