use mrf_segmentation::config::load_config;
use mrf_segmentation::diagnostics::SegmentationReport;
use mrf_segmentation::energy::sample_curves;
use mrf_segmentation::volume::io::{
    load_grayscale_volume, load_mask_volume, load_seed_volume, save_label_slices, write_json_file,
};
use mrf_segmentation::{SegmentationPipeline, VolumeContext};
use std::env;
use std::path::Path;

/// Intensity samples written to the curves file.
const CURVE_SAMPLES: usize = 256;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;

    let image = load_grayscale_volume(&config.input.slices)?;
    let mask = if config.input.mask.is_empty() {
        None
    } else {
        Some(load_mask_volume(&config.input.mask)?)
    };
    let seeds = if config.input.seeds.is_empty() {
        None
    } else {
        Some(load_seed_volume(&config.input.seeds)?)
    };
    let context = VolumeContext::new(image, mask, seeds).map_err(|e| e.to_string())?;

    let mut pipeline =
        SegmentationPipeline::new(context, config.params.clone()).map_err(|e| e.to_string())?;
    let solver = config.solver.build();
    let report = pipeline
        .run_with_diagnostics(solver.as_ref())
        .map_err(|e| e.to_string())?;

    print_summary(&report);

    let written = save_label_slices(
        &report.labels,
        &config.output.labels_dir,
        &config.output.prefix,
    )?;
    println!(
        "Saved {} label slices to {}",
        written.len(),
        config.output.labels_dir.display()
    );

    if let Some(path) = &config.output.report_json {
        write_json_file(path, &report.trace)?;
        println!("JSON report written to {}", path.display());
    }

    if let Some(path) = &config.output.curves_json {
        match pipeline.models() {
            Some(models) => {
                let (lo, hi) = intensity_range(pipeline.working_context());
                let policy = pipeline.energy_options().policy;
                let curves = sample_curves(models, policy, lo, hi, CURVE_SAMPLES)
                    .map_err(|e| e.to_string())?;
                write_json_file(path, &curves)?;
                println!("Model curves written to {}", path.display());
            }
            None => eprintln!("No class models available, skipping {}", path.display()),
        }
    }

    Ok(())
}

fn intensity_range(ctx: &VolumeContext) -> (f64, f64) {
    ctx.masked_intensities()
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

fn print_summary(report: &SegmentationReport) {
    let trace = &report.trace;
    println!(
        "Input {} (working {}), masked voxels {}, seed voxels {}",
        trace.input.original_shape,
        trace.input.working_shape,
        trace.input.masked_voxels,
        trace.input.seed_voxels
    );
    if let Some(models) = &trace.models {
        for m in &models.models {
            println!(
                "  class {}: mean={:.2} spread={:.2} curve={:?}",
                m.label, m.mean, m.spread, m.curve
            );
        }
    }
    println!(
        "Graph: {} of {} edges kept, {} active nodes",
        trace.graph.kept_edges, trace.graph.candidate_edges, trace.graph.active_nodes
    );
    for count in &trace.solver.label_counts {
        println!("  label {}: {} voxels", count.label, count.voxels);
    }
    println!(
        "Solver {} finished, total {:.3} ms",
        trace.solver.name, trace.timings.total_ms
    );
}

fn usage() -> String {
    "Usage: mrf_demo <config.json>".to_string()
}
