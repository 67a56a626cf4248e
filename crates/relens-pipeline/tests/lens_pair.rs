//! Whole-pipeline checks across a real lens pair: fisheye source →
//! rectilinear → back to fisheye. The round trip cannot be exact (two
//! resamplings, finite sensor coverage), but inside the region both
//! lenses cover it must stay close, and constant frames must survive
//! untouched.

#![allow(clippy::unwrap_used)]

use relens_pipeline::{
    ColorGrade, Image, InterpolationMethod, LensModel, RenderConfig, RowOrder, process,
};

const SIZE: u32 = 32;

fn fisheye() -> LensModel {
    LensModel::fisheye_equisolid(10.5, 36.0, std::f64::consts::PI, 1.0).unwrap()
}

/// Wide rectilinear target: covers ~42° half-angle, comfortably more
/// than the fisheye center region the tests compare.
fn rectilinear() -> LensModel {
    LensModel::rectilinear(20.0, 36.0, 1.0).unwrap()
}

fn render(lens: LensModel, samples: u32) -> RenderConfig {
    RenderConfig {
        output_lens: lens,
        scale: 1.0,
        samples,
        interpolation: InterpolationMethod::Bilinear,
        color: ColorGrade::default(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn horizontal_gradient() -> Image {
    let mut data = Vec::with_capacity((SIZE * SIZE * 3) as usize);
    for _y in 0..SIZE {
        for x in 0..SIZE {
            let v = x as f32 / SIZE as f32;
            data.extend_from_slice(&[v, v, v]);
        }
    }
    Image::from_samples(SIZE, SIZE, 3, RowOrder::TopFirst, fisheye(), data).unwrap()
}

#[test]
fn round_trip_preserves_center_region() {
    let source = horizontal_gradient();

    let flat = process(&source, &render(rectilinear(), 1)).unwrap();
    assert_eq!((flat.width, flat.height), (SIZE, SIZE));

    let back = process(&flat, &render(fisheye(), 1)).unwrap();

    // Compare only the center block; it sits well inside both lenses'
    // coverage, so every sub-sample contributes.
    for y in 13..19 {
        for x in 13..19 {
            let want = source.sample(x, y, 0);
            let got = back.sample(x, y, 0);
            assert!(
                (got - want).abs() < 0.1,
                "round trip drifted at ({x},{y}): {got} vs {want}",
            );
        }
    }
}

#[test]
fn constant_frame_survives_the_round_trip_exactly_where_covered() {
    let data = vec![0.375f32; (SIZE * SIZE * 3) as usize];
    let source = Image::from_samples(SIZE, SIZE, 3, RowOrder::TopFirst, fisheye(), data).unwrap();

    let flat = process(&source, &render(rectilinear(), 2)).unwrap();
    let back = process(&flat, &render(fisheye(), 2)).unwrap();

    for &s in back.samples() {
        assert!(
            s.abs() < f32::EPSILON || (s - 0.375).abs() < 1e-3,
            "constant frame picked up structure: {s}",
        );
    }
}

#[test]
fn supersampling_changes_nothing_on_a_constant_frame() {
    let data = vec![0.5f32; (SIZE * SIZE * 3) as usize];
    let source = Image::from_samples(SIZE, SIZE, 3, RowOrder::TopFirst, fisheye(), data).unwrap();

    let coarse = process(&source, &render(rectilinear(), 1)).unwrap();
    let fine = process(&source, &render(rectilinear(), 4)).unwrap();

    for (a, b) in coarse.samples().iter().zip(fine.samples()) {
        assert!(
            (a - b).abs() < 1e-3,
            "sample count changed a constant frame: {a} vs {b}",
        );
    }
}
