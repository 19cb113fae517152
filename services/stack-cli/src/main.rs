//! Band-stack command line tool.
//!
//! Builds template grids, matches source rasters onto them, maintains the
//! resulting band stacks and burns vector layers into the template grid.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use raster_stack::{
    add_selected_bands_from_source, create_template_raster, drop_bands, estimate_layer_memory,
    match_stack_into, rasterize_vector_to_file, restack_matched_layers, retain_bands,
    selectors_for, template_dimensions, vector_proximity_raster, BandSelection, BandSelector,
    BoundingBox, Crs, FeatureSet, ResamplingMethod, SourceSpec, StackConfig,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "stack-cli")]
#[command(about = "Build and maintain aligned raster band stacks")]
struct Args {
    /// YAML configuration file (defaults to STACK_* environment variables)
    #[arg(long, env = "STACK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a template raster from bounds, CRS and pixel size
    Template {
        /// Bounds as west,south,east,north in the target CRS
        #[arg(long, value_parser = BoundingBox::from_wsen_string)]
        bounds: BoundingBox,
        /// Target CRS, e.g. EPSG:32613
        #[arg(long)]
        crs: Crs,
        #[arg(long)]
        pixel_size: f64,
        /// GeoJSON polygons masking the analysis area
        #[arg(long)]
        clip: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Match source rasters onto a template and add them to a data raster
    MatchStack {
        /// Template raster (defaults to the data raster itself)
        #[arg(long)]
        template: Option<PathBuf>,
        /// Band stack to replace or extend
        #[arg(long)]
        data: PathBuf,
        /// Resampling method for every source
        #[arg(long)]
        method: Option<ResamplingMethod>,
        /// 1-based bands to take from each source (default: all)
        #[arg(long, value_delimiter = ',')]
        bands: Vec<usize>,
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },

    /// Add bands picked by "Band <n>: <description>" selectors from one source
    AddBands {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        source: PathBuf,
        #[arg(long = "band", required = true)]
        selectors: Vec<BandSelector>,
        #[arg(long)]
        method: Option<ResamplingMethod>,
    },

    /// Drop bands by zero-based index
    Drop {
        #[arg(long)]
        data: PathBuf,
        #[arg(required = true, value_delimiter = ',')]
        indices: Vec<usize>,
    },

    /// Keep only the bands named by selectors, in selector order
    Retain {
        #[arg(long)]
        data: PathBuf,
        #[arg(long = "band", required = true)]
        selectors: Vec<BandSelector>,
    },

    /// Burn a vector attribute onto the template grid
    Rasterize {
        #[arg(long)]
        template: PathBuf,
        #[arg(long)]
        vector: PathBuf,
        /// Numeric attribute to burn (default: 1 for every feature)
        #[arg(long)]
        field: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Distance-to-nearest-feature raster on the template grid
    Proximity {
        #[arg(long)]
        template: PathBuf,
        #[arg(long)]
        vector: PathBuf,
    },

    /// Stack aligned single-band rasters into a new file
    Restack {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Show the grid and band list of a raster
    Info {
        path: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate the size of one template layer
    Estimate {
        #[arg(long, value_parser = BoundingBox::from_wsen_string)]
        bounds: BoundingBox,
        #[arg(long)]
        pixel_size: f64,
        #[arg(long, default_value = "4")]
        bytes_per_pixel: usize,
    },
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let config = config::load_config(args.config.as_deref())?;
    run(args.command, &config)
}

fn run(command: Command, config: &StackConfig) -> Result<()> {
    match command {
        Command::Template {
            bounds,
            crs,
            pixel_size,
            clip,
            output,
        } => {
            let clip = clip.map(|p| FeatureSet::from_path(&p)).transpose()?;
            let template =
                create_template_raster(&output, &bounds, crs, pixel_size, clip.as_ref(), config)?;
            println!("{}", template.describe());
        }

        Command::MatchStack {
            template,
            data,
            method,
            bands,
            sources,
        } => {
            let method = method.unwrap_or(config.default_resampling);
            let selection = if bands.is_empty() {
                BandSelection::All
            } else {
                BandSelection::Indices(bands)
            };
            let specs: Vec<SourceSpec> = sources
                .into_iter()
                .map(|path| SourceSpec::new(path).method(method).bands(selection.clone()))
                .collect();
            let template = template.unwrap_or_else(|| data.clone());
            let count = match_stack_into(&data, &template, &specs, config)?;
            info!(sources = specs.len(), band_count = count, "Match-stack finished");
            println!("{count}");
        }

        Command::AddBands {
            data,
            source,
            selectors,
            method,
        } => {
            let method = method.unwrap_or(config.default_resampling);
            let count = add_selected_bands_from_source(&data, &source, &selectors, method, config)?;
            println!("{count}");
        }

        Command::Drop { data, indices } => {
            println!("{}", drop_bands(&data, &indices, config)?);
        }

        Command::Retain { data, selectors } => {
            println!("{}", retain_bands(&data, &selectors, config)?);
        }

        Command::Rasterize {
            template,
            vector,
            field,
            output,
        } => {
            let features = FeatureSet::from_path(&vector)
                .with_context(|| format!("Failed to load {}", vector.display()))?;
            rasterize_vector_to_file(&features, &template, field.as_deref(), &output, config)?;
            println!("{}", output.display());
        }

        Command::Proximity { template, vector } => {
            let features = FeatureSet::from_path(&vector)
                .with_context(|| format!("Failed to load {}", vector.display()))?;
            let path = vector_proximity_raster(&features, &template, config)?;
            println!("{}", path.display());
        }

        Command::Restack { output, inputs } => {
            println!("{}", restack_matched_layers(inputs.as_slice(), &output, config)?);
        }

        Command::Info { path, json } => {
            let header = geotiff_io::read_header(&path)?;
            if json {
                let doc = serde_json::json!({
                    "template": header.template,
                    "band_count": header.band_count,
                    "descriptions": header.descriptions,
                    "placeholder": header.placeholder,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!("{}", header.template.describe());
                if header.placeholder == Some(true) {
                    println!("placeholder template");
                }
                for selector in selectors_for(&header.descriptions) {
                    println!("{selector}");
                }
            }
        }

        Command::Estimate {
            bounds,
            pixel_size,
            bytes_per_pixel,
        } => {
            let (width, height) = template_dimensions(&bounds, pixel_size)?;
            let bytes = estimate_layer_memory(&bounds, pixel_size, bytes_per_pixel)?;
            println!(
                "{width}x{height} pixels, {bytes} bytes ({:.1} MiB) per layer",
                bytes as f64 / (1024.0 * 1024.0)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_match_stack() {
        let args = Args::try_parse_from([
            "stack-cli",
            "match-stack",
            "--data",
            "stack.tif",
            "--method",
            "cubic-spline",
            "--bands",
            "1,3",
            "a.tif",
            "b.tif",
        ])
        .unwrap();
        match args.command {
            Command::MatchStack {
                method,
                bands,
                sources,
                template,
                ..
            } => {
                assert_eq!(method, Some(ResamplingMethod::CubicSpline));
                assert_eq!(bands, vec![1, 3]);
                assert_eq!(sources.len(), 2);
                assert!(template.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_selectors_and_bounds() {
        let args = Args::try_parse_from([
            "stack-cli",
            "retain",
            "--data",
            "stack.tif",
            "--band",
            "Band 2: gravity",
        ])
        .unwrap();
        match args.command {
            Command::Retain { selectors, .. } => {
                assert_eq!(selectors, vec![BandSelector::new(2, "gravity")]);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let args = Args::try_parse_from([
            "stack-cli",
            "estimate",
            "--bounds",
            "0,0,1000,500",
            "--pixel-size",
            "10",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Estimate { bytes_per_pixel: 4, .. }));
    }

    #[test]
    fn test_bad_selector_rejected() {
        assert!(Args::try_parse_from([
            "stack-cli",
            "retain",
            "--data",
            "stack.tif",
            "--band",
            "gravity",
        ])
        .is_err());
    }

    #[test]
    fn test_template_and_info_run() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("template.tif");
        let config = StackConfig::default();
        run(
            Command::Template {
                bounds: BoundingBox::new(0.0, 0.0, 30.0, 20.0),
                crs: Crs::from_epsg(32613),
                pixel_size: 10.0,
                clip: None,
                output: output.clone(),
            },
            &config,
        )
        .unwrap();
        let header = geotiff_io::read_header(&output).unwrap();
        assert_eq!((header.template.width, header.template.height), (3, 2));
        run(Command::Info { path: output, json: true }, &config).unwrap();
    }
}
