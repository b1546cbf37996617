//! Benchmarks comparing metric configurations on a curved grid

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meshtrim_core::{Point3f, Scene, SceneMesh};
use meshtrim_simplification::{decimate, from_scene, DecimationConfig, MetricConfig};

fn generate_grid_scene(size: usize) -> Scene {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
            vertices.push(Point3f::new(
                x as f32,
                y as f32,
                (fx.sin() * fy.sin()) * 2.0,
            ));
        }
    }
    let mut faces = Vec::with_capacity((size - 1) * (size - 1) * 2);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push(vec![tl, tr, bl]);
            faces.push(vec![tr, br, bl]);
        }
    }
    Scene::from_mesh(SceneMesh::from_vertices_and_faces(vertices, faces))
}

fn bench_decimation(c: &mut Criterion) {
    let sizes = [10, 20, 40];
    let ratios = [0.3, 0.5, 0.7];
    let setups: [(&str, Vec<MetricConfig>); 3] = [
        ("quadric", vec![MetricConfig::quadric()]),
        (
            "quadric_hausdorff",
            vec![MetricConfig::quadric(), MetricConfig::hausdorff(0.5)],
        ),
        (
            "quadric_aspect_edge",
            vec![
                MetricConfig::quadric(),
                MetricConfig::aspect_ratio(5.0),
                MetricConfig::edge_length(),
            ],
        ),
    ];

    let mut group = c.benchmark_group("decimation");

    for &size in &sizes {
        let scene = generate_grid_scene(size);
        let face_count = scene.face_count();

        for &ratio in &ratios {
            let target = ((1.0 - ratio) * face_count as f64) as usize;
            for (name, metrics) in &setups {
                let config = DecimationConfig::new()
                    .with_target_faces(target)
                    .with_metrics(metrics.clone());
                group.bench_with_input(
                    BenchmarkId::new(*name, format!("{}f_r{}", face_count, (ratio * 100.0) as u32)),
                    &(&scene, config),
                    |b, (scene, config)| {
                        b.iter(|| {
                            let mut mesh = from_scene(black_box(scene)).unwrap();
                            let report = decimate(&mut mesh, config).unwrap();
                            black_box(report);
                        });
                    },
                );
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_decimation);
criterion_main!(benches);
