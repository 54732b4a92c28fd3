//! Constellation ISL visualizer
//!
//! Usage:
//!   satviz --preset starlink --output out/starlink.html
//!   satviz --config data/starlink.toml --mode traffic \
//!          --node-summary per_node_summary.csv --link-summary per_link_summary.csv

use anyhow::Result;
use clap::{Parser, ValueEnum};
use isl_topology::{ConstellationConfig, NodeId, Preset, TrafficMetric};
use satviz::{
    build_scene, read_token, render_html, write_outputs, DocumentTemplate, PipelineOptions,
    RenderMode,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Palette colours for intra/inter-orbit links
    Links,
    /// Colours from traffic summaries
    Traffic,
}

#[derive(Parser, Debug)]
#[command(name = "satviz", about = "Render +Grid ISL meshes of Walker-delta constellations")]
struct Args {
    /// Constellation TOML file
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in constellation (starlink, starlink-5shell, telesat, kuiper)
    #[arg(short, long, default_value = "starlink")]
    preset: Preset,

    #[arg(short, long, value_enum, default_value_t = Mode::Links)]
    mode: Mode,

    /// Per-node traffic CSV
    #[arg(long, default_value = "per_node_summary.csv")]
    node_summary: PathBuf,

    /// Per-link traffic CSV
    #[arg(long, default_value = "per_link_summary.csv")]
    link_summary: PathBuf,

    /// Traffic column used for colouring (megabytes, packets)
    #[arg(long, default_value = "megabytes")]
    metric: TrafficMetric,

    /// Only materialize the first K orbits of each shell
    #[arg(long)]
    orbit_limit: Option<u32>,

    /// Comma-separated node ids that get markers
    #[arg(long, value_delimiter = ',')]
    markers: Option<Vec<NodeId>>,

    /// Template prefix (defaults to the built-in page)
    #[arg(long, requires = "bottom")]
    top: Option<PathBuf>,

    /// Template suffix
    #[arg(long, requires = "top")]
    bottom: Option<PathBuf>,

    /// File holding the Cesium access token
    #[arg(long, default_value = "cesium-token")]
    token: PathBuf,

    /// Output HTML file (defaults to <name>.html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the scene as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Satviz ISL topology renderer");
    info!("{}", "=".repeat(60));

    let config = match &args.config {
        Some(path) => ConstellationConfig::load(path)?,
        None => {
            info!("Using preset {}", args.preset);
            args.preset.config()
        }
    };
    info!(
        "Constellation {}: {} shell(s), {} satellites at {}",
        config.name,
        config.shells.len(),
        config.total_satellites(),
        config.epoch
    );

    let mode = match args.mode {
        Mode::Links => RenderMode::Links,
        Mode::Traffic => RenderMode::Traffic {
            node_summary: args.node_summary.clone(),
            link_summary: args.link_summary.clone(),
            metric: args.metric,
        },
    };
    let options = PipelineOptions {
        mode,
        orbit_limit: args.orbit_limit,
        markers: args.markers.clone().map(BTreeSet::from_iter),
    };

    let template = match (&args.top, &args.bottom) {
        (Some(top), Some(bottom)) => DocumentTemplate::load(top, bottom)?,
        _ => DocumentTemplate::default(),
    };
    let token = read_token(&args.token)?;

    // Everything is assembled before the first write
    let (scene, summary) = build_scene(&config, &options)?;
    let html = render_html(&scene, &template, &token);
    let json = match &args.json {
        Some(_) => Some(scene.to_json()?),
        None => None,
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.html", config.name.to_lowercase())));
    let mut outputs = vec![(output.as_path(), html.as_str())];
    if let (Some(path), Some(json)) = (&args.json, &json) {
        outputs.push((path.as_path(), json.as_str()));
    }
    write_outputs(&outputs)?;

    // Summary
    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    for shell in &summary.shells {
        info!(
            "  {}: {} satellites, {} links rendered",
            shell.label, shell.satellites, shell.mesh.rendered_edges
        );
    }
    info!(
        "Markers: {}, links: {}, link keys: {}",
        summary.markers, summary.links, summary.link_keys
    );

    Ok(())
}
