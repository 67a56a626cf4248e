//! Batch orchestration behavior over real files: drain counts,
//! failure isolation, and the skip-if-exists fast path.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use relens_batch::{JobDescriptor, OutputTarget, run_batch};
use relens_io::OutputFormat;
use relens_pipeline::{
    ColorGrade, Image, InterpolationMethod, LensModel, RenderConfig, RowOrder,
};

fn lens() -> LensModel {
    LensModel::rectilinear(50.0, 36.0, 1.0).unwrap()
}

fn render() -> RenderConfig {
    RenderConfig {
        output_lens: lens(),
        scale: 1.0,
        samples: 1,
        interpolation: InterpolationMethod::Nearest,
        color: ColorGrade::default(),
    }
}

fn write_input_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let data: Vec<f32> = (0..4 * 4 * 3).map(|i| f32::from(i as u16) / 48.0).collect();
    let image = Image::from_samples(4, 4, 3, RowOrder::TopFirst, lens(), data).unwrap();
    relens_io::save_image(&image, &path, OutputFormat::Png).unwrap();
    path
}

fn job(input: PathBuf, out_dir: &Path, skip_if_exists: bool) -> JobDescriptor {
    let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
    JobDescriptor {
        outputs: vec![
            OutputTarget {
                format: OutputFormat::Png,
                path: out_dir.join(format!("{stem}.png")),
            },
            OutputTarget {
                format: OutputFormat::Exr,
                path: out_dir.join(format!("{stem}.exr")),
            },
        ],
        input,
        input_lens: lens(),
        render: render(),
        skip_if_exists,
    }
}

#[test]
fn single_worker_drains_every_job() {
    let dir = tempfile::tempdir().unwrap();
    let jobs: Vec<JobDescriptor> = (0..5)
        .map(|i| {
            let input = write_input_png(dir.path(), &format!("frame_{i}.png"));
            job(input, dir.path(), false)
        })
        .collect();
    let outputs: Vec<OutputTarget> = jobs.iter().flat_map(|j| j.outputs.clone()).collect();

    let summary = run_batch(jobs, 1);

    assert_eq!(summary.total, 5);
    assert_eq!(summary.done, 5, "every job must reach a terminal state");
    assert_eq!(summary.failed, 0);
    for target in outputs {
        assert!(target.path.exists(), "missing output {}", target.path.display());
    }
}

#[test]
fn corrupt_input_fails_alone() {
    let dir = tempfile::tempdir().unwrap();

    let corrupt = dir.path().join("broken.png");
    std::fs::write(&corrupt, [0xde, 0xad, 0xbe, 0xef]).unwrap();

    let good_a = write_input_png(dir.path(), "good_a.png");
    let good_b = write_input_png(dir.path(), "good_b.png");

    let jobs = vec![
        job(good_a, dir.path(), false),
        job(corrupt, dir.path(), false),
        job(good_b, dir.path(), false),
    ];
    let summary = run_batch(jobs, 1);

    assert_eq!(summary.total, 3);
    assert_eq!(summary.failed, 1, "only the corrupt job may fail");
    assert_eq!(summary.done, 2);
    assert!(dir.path().join("good_a.exr").exists());
    assert!(dir.path().join("good_b.exr").exists());
    assert!(!dir.path().join("broken.exr").exists());
}

#[test]
fn missing_input_fails_alone() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_input_png(dir.path(), "good.png");

    let jobs = vec![
        job(dir.path().join("never_rendered.png"), dir.path(), false),
        job(good, dir.path(), false),
    ];
    let summary = run_batch(jobs, 1);

    assert_eq!((summary.done, summary.failed), (1, 1));
}

#[test]
fn skip_if_exists_makes_no_codec_calls() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input_png(dir.path(), "frame.png");
    let descriptor = job(input, dir.path().join("out").as_path(), true);

    // Pre-create both targets with sentinel bytes. A real save would
    // replace them, so surviving sentinels prove the codecs never ran.
    std::fs::create_dir(dir.path().join("out")).unwrap();
    for target in &descriptor.outputs {
        std::fs::write(&target.path, b"sentinel").unwrap();
    }

    let summary = run_batch(vec![descriptor.clone()], 1);

    assert_eq!((summary.done, summary.failed), (1, 0), "skip still counts");
    for target in &descriptor.outputs {
        let bytes = std::fs::read(&target.path).unwrap();
        assert_eq!(bytes, b"sentinel", "output was rewritten despite skip");
    }
}

#[test]
fn skip_if_exists_processes_when_one_output_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input_png(dir.path(), "frame.png");
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();
    let descriptor = job(input, &out_dir, true);

    // Only the PNG target pre-exists; the EXR is missing, so the job
    // must run and produce both.
    std::fs::write(&descriptor.outputs[0].path, b"sentinel").unwrap();

    let summary = run_batch(vec![descriptor.clone()], 1);

    assert_eq!((summary.done, summary.failed), (1, 0));
    let png = std::fs::read(&descriptor.outputs[0].path).unwrap();
    assert_ne!(png, b"sentinel", "stale output should be replaced");
    assert!(descriptor.outputs[1].path.exists());
}

#[test]
fn parallel_workers_drain_the_same_total() {
    let dir = tempfile::tempdir().unwrap();
    let jobs: Vec<JobDescriptor> = (0..12)
        .map(|i| {
            let input = write_input_png(dir.path(), &format!("frame_{i:02}.png"));
            job(input, dir.path(), false)
        })
        .collect();

    let summary = run_batch(jobs, 4);

    assert_eq!(summary.total, 12);
    assert_eq!(summary.done + summary.failed, 12, "join-all must drain");
    assert_eq!(summary.failed, 0);
}

#[test]
fn empty_batch_returns_immediately() {
    let summary = run_batch(Vec::new(), 3);
    assert_eq!(summary, relens_batch::BatchSummary::default());
}
