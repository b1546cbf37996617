//! Command-line arguments

use clap::{ArgAction, Parser};
use log::LevelFilter;
use meshtrim_simplification::{DecimationConfig, MetricConfig, MetricKind, DEFAULT_TARGET_FACES};
use std::path::PathBuf;

/// Reduce the polygon count of a mesh file.
#[derive(Parser, Debug, Clone)]
#[command(name = "meshtrim")]
#[command(author, version, about = "Mesh decimation by greedy edge collapse", long_about = None)]
pub struct Args {
    /// Input mesh file; the format follows the extension
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output mesh file; the format follows the extension
    #[arg(short, long)]
    pub output: PathBuf,

    /// Target number of faces
    #[arg(short = 'f', long, conflicts_with = "vertices")]
    pub faces: Option<usize>,

    /// Target number of vertices, applied as three times as many faces
    #[arg(short = 'v', long)]
    pub vertices: Option<usize>,

    /// Rank collapses by the aspect ratio of the resulting triangles
    #[arg(long)]
    pub prioritize_aspect_ratio: bool,

    /// Reject collapses that move the surface further than the Hausdorff tolerance
    #[arg(long)]
    pub use_hausdorff: bool,

    /// Prefer collapsing short edges
    #[arg(long)]
    pub prioritize_short_edges: bool,

    /// Hausdorff tolerance as a fraction of the bounding box diagonal
    #[arg(long, default_value_t = 0.01)]
    pub hausdorff_tolerance: f64,

    /// Largest aspect ratio a collapse may produce
    #[arg(long, default_value_t = 5.0)]
    pub max_aspect_ratio: f64,

    /// Upper bound on the quadric error of a collapse
    #[arg(long)]
    pub max_error: Option<f64>,

    /// Keep boundary vertices in place
    #[arg(long)]
    pub preserve_boundary: bool,

    /// Drop faces that would make the mesh non-manifold instead of failing
    #[arg(long)]
    pub skip_non_manifold: bool,

    /// Write recomputed vertex normals
    #[arg(long)]
    pub normals: bool,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More logging; repeat for more detail
    #[arg(long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Face target: `-f`, else three times `-v`, else the default
    pub fn target_faces(&self) -> usize {
        self.faces
            .or_else(|| self.vertices.map(|v| v.saturating_mul(3)))
            .unwrap_or(DEFAULT_TARGET_FACES)
    }

    /// Build the decimation configuration for a model with the given
    /// bounding box diagonal.
    ///
    /// The quadric metric always ranks and places; the optional metrics are
    /// appended in a fixed order.
    pub fn decimation_config(&self, diagonal: f64) -> DecimationConfig {
        let mut quadric = MetricConfig::quadric();
        if let Some(max_error) = self.max_error {
            quadric.kind = MetricKind::Quadric {
                max_error: Some(max_error),
            };
        }

        let mut metrics = vec![quadric];
        if self.use_hausdorff {
            metrics.push(MetricConfig::hausdorff(self.hausdorff_tolerance * diagonal));
        }
        if self.prioritize_aspect_ratio {
            metrics.push(MetricConfig::aspect_ratio(self.max_aspect_ratio));
        }
        if self.prioritize_short_edges {
            metrics.push(MetricConfig::edge_length());
        }

        DecimationConfig::new()
            .with_target_faces(self.target_faces())
            .with_metrics(metrics)
            .with_preserve_boundary(self.preserve_boundary)
    }

    /// Log level from `-q` / `--verbose`
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtrim_simplification::DecimationTarget;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["meshtrim", "-i", "in.obj", "-o", "out.ply"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.input, PathBuf::from("in.obj"));
        assert_eq!(args.output, PathBuf::from("out.ply"));
        assert_eq!(args.target_faces(), DEFAULT_TARGET_FACES);
        assert_eq!(args.log_level(), LevelFilter::Info);

        let config = args.decimation_config(1.0);
        assert_eq!(config.target, DecimationTarget::Faces(5000));
        assert_eq!(config.metrics, vec![MetricConfig::quadric()]);
        assert!(!config.preserve_boundary);
    }

    #[test]
    fn test_face_and_vertex_targets() {
        assert_eq!(parse(&["-f", "1200"]).target_faces(), 1200);
        assert_eq!(parse(&["-v", "400"]).target_faces(), 1200);
        assert!(Args::try_parse_from(["meshtrim", "-i", "a.obj", "-o", "b.obj", "-f", "1", "-v", "2"]).is_err());
    }

    #[test]
    fn test_flag_as_last_token() {
        let args = parse(&["--use-hausdorff"]);
        assert!(args.use_hausdorff);

        let args = Args::try_parse_from(["meshtrim", "-o", "out.obj", "-i", "in.obj"]).unwrap();
        assert_eq!(args.input, PathBuf::from("in.obj"));
    }

    #[test]
    fn test_missing_required_paths() {
        assert!(Args::try_parse_from(["meshtrim", "-i", "in.obj"]).is_err());
        assert!(Args::try_parse_from(["meshtrim", "-o", "out.obj", "-i"]).is_err());
    }

    #[test]
    fn test_optional_metrics_in_order() {
        let args = parse(&[
            "--prioritize-short-edges",
            "--use-hausdorff",
            "--prioritize-aspect-ratio",
            "--hausdorff-tolerance",
            "0.5",
            "--max-aspect-ratio",
            "3",
            "--max-error",
            "0.5",
        ]);
        let config = args.decimation_config(4.0);
        let kinds: Vec<MetricKind> = config.metrics.iter().map(|m| m.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                MetricKind::Quadric {
                    max_error: Some(0.5)
                },
                MetricKind::Hausdorff { tolerance: 2.0 },
                MetricKind::AspectRatio {
                    max_aspect_ratio: 3.0
                },
                MetricKind::EdgeLength {
                    max_edge_length: None
                },
            ]
        );
        assert!(config.metrics[1].binary);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(parse(&["-q"]).log_level(), LevelFilter::Error);
        assert_eq!(parse(&["--verbose"]).log_level(), LevelFilter::Debug);
        assert_eq!(parse(&["--verbose", "--verbose"]).log_level(), LevelFilter::Trace);
        assert!(Args::try_parse_from(["meshtrim", "-i", "a", "-o", "b", "-q", "--verbose"]).is_err());
    }
}
