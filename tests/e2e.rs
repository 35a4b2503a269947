mod common;

use common::init_logging;
use common::synthetic_volume::{
    column_gap_mask, corner_block_4x4, split_volume, three_band_label, three_band_volume,
};
use mrf_segmentation::energy::{UnaryPolicy, COST_CEILING};
use mrf_segmentation::model::{Gaussian, IntensityModel, OutlierSide, ResponseCurve};
use mrf_segmentation::solver::{IteratedConditionalModes, WinnerTakesAll};
use mrf_segmentation::volume::{Shape, Volume};
use mrf_segmentation::{
    PipelineStage, SegmentationError, SegmentationParams, SegmentationPipeline, VolumeContext,
};

#[test]
fn corner_block_separates_without_smoothing() {
    init_logging();
    let image = corner_block_4x4();
    let mut seeds = Volume::filled(image.shape(), 0u32);
    seeds.set(0, 3, 3, 1);
    seeds.set(0, 0, 0, 2);
    let ctx = VolumeContext::new(image, None, Some(seeds)).expect("valid");
    let params = SegmentationParams {
        alpha: 0.0,
        ..SegmentationParams::default()
    };
    let mut pipeline = SegmentationPipeline::new(ctx, params).expect("valid");
    let labels = pipeline.run(&WinnerTakesAll).expect("solved");

    for r in 0..4 {
        for c in 0..4 {
            let expected = if r < 2 && c < 2 { 2 } else { 1 };
            assert_eq!(labels.get(0, r, c), expected, "voxel ({r}, {c})");
        }
    }
}

#[test]
fn seeded_classes_are_costed_by_density_even_with_cumulative_flag() {
    init_logging();
    let image = corner_block_4x4();
    let mut seeds = Volume::filled(image.shape(), 0u32);
    seeds.set(0, 3, 3, 1);
    seeds.set(0, 0, 0, 2);
    let ctx = VolumeContext::new(image, None, Some(seeds)).expect("valid");
    let params = SegmentationParams {
        alpha: 0.0,
        unaries_as_cdf: true,
        ..SegmentationParams::default()
    };
    let mut pipeline = SegmentationPipeline::new(ctx, params).expect("valid");
    assert_eq!(pipeline.energy_options().policy, UnaryPolicy::Density);
    let labels = pipeline.run(&WinnerTakesAll).expect("solved");

    for r in 0..4 {
        for c in 0..4 {
            let expected = if r < 2 && c < 2 { 2 } else { 1 };
            assert_eq!(labels.get(0, r, c), expected, "voxel ({r}, {c})");
        }
    }
}

#[test]
fn empty_volume_fails_with_an_error_at_any_scale() {
    init_logging();
    for scale in [1.0, 0.5, 2.0] {
        let image = Volume::new(Shape::new(1, 0, 5), Vec::new()).expect("valid");
        let params = SegmentationParams {
            scale,
            ..SegmentationParams::default()
        };
        let mut pipeline =
            SegmentationPipeline::new(VolumeContext::from_image(image), params).expect("valid");
        let err = pipeline.run(&WinnerTakesAll).unwrap_err();
        assert_eq!(err, SegmentationError::EmptyMask, "scale {scale}");
    }
}

#[test]
fn corner_block_has_no_unsupervised_hypo_class() {
    init_logging();
    let ctx = VolumeContext::from_image(corner_block_4x4());
    let params = SegmentationParams {
        models_estim: Some(mrf_segmentation::model::EstimationMode::Hydohy),
        k_std_h: 1.0,
        ..SegmentationParams::default()
    };
    let mut pipeline = SegmentationPipeline::new(ctx, params).expect("valid");
    let err = pipeline.run(&WinnerTakesAll).unwrap_err();
    assert!(matches!(
        err,
        SegmentationError::DegenerateOutlierFit {
            side: OutlierSide::Hypo,
            ..
        }
    ));
    assert_eq!(pipeline.stage(), PipelineStage::Uninitialized);
}

#[test]
fn unsupervised_cumulative_run_labels_each_band() {
    init_logging();
    let params = SegmentationParams {
        unaries_as_cdf: true,
        ret_prob: true,
        ..SegmentationParams::default()
    };
    let mut pipeline =
        SegmentationPipeline::new(VolumeContext::from_image(three_band_volume()), params)
            .expect("valid");
    let report = pipeline
        .run_with_diagnostics(&IteratedConditionalModes::default())
        .expect("solved");

    let shape = report.labels.shape();
    for r in 0..shape.rows {
        for c in 0..shape.cols {
            assert_eq!(
                report.labels.get(0, r, c),
                three_band_label(r),
                "voxel ({r}, {c})"
            );
        }
    }

    let counts: Vec<usize> = report
        .trace
        .solver
        .label_counts
        .iter()
        .map(|c| c.voxels)
        .collect();
    assert_eq!(counts, vec![400, 1200, 400]);
    let models = report.trace.models.as_ref().expect("estimated models");
    assert_eq!(models.models.len(), 3);
    assert!(models.dominant_band.is_some());
    assert!(report.trace.energy.computed_unaries);
    assert_eq!(report.trace.graph.kept_edges, 40 * 49 + 39 * 50);
    assert!(pipeline.probabilities().is_some());

    let json = serde_json::to_string(&report.trace).expect("trace serializes");
    assert!(json.contains("\"labelCounts\""));
}

#[test]
fn label_volume_keeps_the_input_shape_for_any_scale() {
    init_logging();
    let models = vec![
        IntensityModel::gaussian(100.0, 10.0).expect("valid"),
        IntensityModel::gaussian(200.0, 10.0).expect("valid"),
    ];
    for shape in [Shape::planar(9, 13), Shape::new(3, 10, 7)] {
        for scale in [0.0, 0.5, 0.3, 1.0, 2.0] {
            let image = split_volume(shape, shape.cols / 2, 100.0, 200.0);
            let params = SegmentationParams {
                scale,
                ..SegmentationParams::default()
            };
            let mut pipeline =
                SegmentationPipeline::new(VolumeContext::from_image(image), params)
                    .expect("valid");
            pipeline.set_models(models.clone()).expect("valid");
            let labels = pipeline
                .run(&IteratedConditionalModes::default())
                .expect("solved");
            assert_eq!(labels.shape(), shape, "scale {scale}");
            assert!(labels.iter().all(|&l| l == 1 || l == 2));
        }
    }
}

#[test]
fn masked_gap_keeps_regions_apart_in_the_graph() {
    init_logging();
    let shape = Shape::new(2, 6, 7);
    let image = split_volume(shape, 3, 100.0, 200.0);
    let mask = column_gap_mask(shape, 3);
    let ctx = VolumeContext::new(image, Some(mask.clone()), None).expect("valid");
    let mut pipeline = SegmentationPipeline::new(ctx, SegmentationParams::default()).expect("valid");
    pipeline
        .set_models(vec![
            IntensityModel::gaussian(100.0, 10.0).expect("valid"),
            IntensityModel::gaussian(200.0, 10.0).expect("valid"),
        ])
        .expect("valid");
    let energy = pipeline.prepare_energy().expect("assembled");

    for &[a, b] in energy.edges() {
        assert!(mask.as_slice()[a] && mask.as_slice()[b]);
        let (ca, cb) = (shape.coords_of(a).2, shape.coords_of(b).2);
        assert_eq!(ca < 3, cb < 3, "edge ({a}, {b}) crosses the gap");
    }
    // masked-out rows of the unary table are zero
    let gap = shape.index_of(1, 2, 3);
    assert!(energy.unaries().row(gap).iter().all(|&c| c == 0));
}

#[test]
fn zero_survival_never_reaches_the_solver_as_infinity() {
    init_logging();
    let image = Volume::new(Shape::planar(1, 4), vec![0.0, 5.0, 100.0, 300.0]).expect("valid");
    let params = SegmentationParams {
        unaries_as_cdf: true,
        ..SegmentationParams::default()
    };
    let mut pipeline =
        SegmentationPipeline::new(VolumeContext::from_image(image), params).expect("valid");
    pipeline
        .set_models(vec![
            IntensityModel::new(Gaussian::new(0.0, 1.0).expect("valid"), ResponseCurve::Survival),
            IntensityModel::gaussian(100.0, 5.0).expect("valid"),
            IntensityModel::new(
                Gaussian::new(300.0, 5.0).expect("valid"),
                ResponseCurve::Cumulative,
            ),
        ])
        .expect("valid");
    let energy = pipeline.prepare_energy().expect("assembled");
    let costs = energy.unaries().as_slice();
    assert!(costs.iter().all(|&c| (c as f64).abs() < COST_CEILING));

    // survival underflows at 100 and 300; both take the value seen at 5
    let hypo: Vec<i32> = (0..4).map(|v| energy.unaries().get(v, 0)).collect();
    assert!(hypo[1] > hypo[0]);
    assert_eq!(hypo[2], hypo[1]);
    assert_eq!(hypo[3], hypo[1]);

    let labels = pipeline.run(&WinnerTakesAll).expect("solved");
    assert_eq!(labels.as_slice(), &[1, 1, 2, 3]);
}
