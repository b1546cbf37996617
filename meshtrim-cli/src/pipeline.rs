//! Import, decimate and export a single mesh file

use crate::args::Args;
use anyhow::{Context, Result};
use log::info;
use meshtrim_io::{format_from_path, FormatRegistry};
use meshtrim_simplification::{
    decimate, from_scene_with_options, to_scene_with_options, DecimationReport, ExportOptions,
    ImportOptions,
};
use std::fs;
use std::time::Instant;

/// Run the whole pipeline with the built-in formats.
pub fn run(args: &Args) -> Result<DecimationReport> {
    run_with_registry(args, &FormatRegistry::with_defaults())
}

/// Run the whole pipeline.
///
/// The output writer is resolved before any work is done, and the output
/// file is only created once the result has been serialized.
pub fn run_with_registry(args: &Args, registry: &FormatRegistry) -> Result<DecimationReport> {
    let start = Instant::now();
    let writer = registry.writer(&format_from_path(&args.output))?;
    let reader = registry.reader(&format_from_path(&args.input))?;

    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let scene = reader
        .read_scene(&bytes)
        .with_context(|| format!("Failed to import {}", args.input.display()))?;
    info!(
        "Imported {}: {} meshes, {} vertices, {} faces",
        args.input.display(),
        scene.meshes.len(),
        scene.vertex_count(),
        scene.face_count()
    );

    let import = ImportOptions::default().with_skip_non_manifold_faces(args.skip_non_manifold);
    let mut mesh = from_scene_with_options(&scene, &import)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    let config = args.decimation_config(scene.bounding_diagonal() as f64);
    info!("Decimating to {} faces", args.target_faces());
    let report = decimate(&mut mesh, &config)?;

    let export = ExportOptions::default().with_compute_normals(args.normals);
    let result = to_scene_with_options(&mesh, &export);
    let bytes = writer.write_scene(&result)?;
    fs::write(&args.output, &bytes)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        "Exported {}: {} vertices, {} faces in {:.2}s",
        args.output.display(),
        result.vertex_count(),
        result.face_count(),
        start.elapsed().as_secs_f32()
    );
    Ok(report)
}
