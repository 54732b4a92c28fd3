//! End-to-end batch run: constellation, topology, optional traffic, scene

use crate::document::DocumentTemplate;
use anyhow::{Context, Result};
use isl_topology::constellation::truncate_orbits;
use isl_topology::{
    build_edges, build_link_index, build_shell_scene, colorize, export, generate,
    ConstellationConfig, LinkIndex, MeshStats, NodeId, PositionEvaluator, Scene, ShellGrid,
    Styling, TrafficMetric, TrafficSummary, PLASMA, VIRIDIS,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What drives link and marker colours
#[derive(Debug, Clone, PartialEq)]
pub enum RenderMode {
    /// Fixed palette from the constellation config
    Links,
    /// Traffic summaries mapped through viridis (nodes) and plasma (links)
    Traffic {
        node_summary: PathBuf,
        link_summary: PathBuf,
        metric: TrafficMetric,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub mode: RenderMode,
    /// Materialize only the first K orbits of each shell
    pub orbit_limit: Option<u32>,
    /// Only these nodes get markers
    pub markers: Option<BTreeSet<NodeId>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::Links,
            orbit_limit: None,
            markers: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShellSummary {
    pub label: String,
    pub satellites: usize,
    pub mesh: MeshStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub constellation: String,
    pub epoch: String,
    pub shells: Vec<ShellSummary>,
    pub link_keys: usize,
    pub markers: usize,
    pub links: usize,
}

/// Build the scene for every shell of `config`.
///
/// Nothing is written here; the caller serializes the finished scene.
pub fn build_scene(
    config: &ConstellationConfig,
    options: &PipelineOptions,
) -> Result<(Scene, RunSummary)> {
    config.validate()?;
    let template = config.orbit_template();
    let evaluator: PositionEvaluator = PositionEvaluator::default();

    let mut index = LinkIndex::default();
    let mut grids = Vec::with_capacity(config.shells.len());
    for shell in &config.shells {
        let grid = ShellGrid::from_shell(shell)?.with_phase_offset(template.phase_diff);
        index.extend(build_link_index(&grid))?;
        grids.push(grid);
    }
    debug!("Combined link index holds {} keys", index.len());

    let traffic = match &options.mode {
        RenderMode::Links => None,
        RenderMode::Traffic {
            node_summary,
            link_summary,
            metric,
        } => {
            let summary = TrafficSummary::load(node_summary, link_summary)?;
            summary.validate_links(&index)?;
            info!("Colouring by traffic {}", metric);
            Some((
                colorize(&summary.node_magnitudes(*metric), &VIRIDIS),
                colorize(&summary.link_magnitudes(*metric), &PLASMA),
            ))
        }
    };
    let styling = match &traffic {
        None => Styling::Palette(&config.palette),
        Some((node_colors, link_colors)) => Styling::Traffic {
            node_colors,
            link_colors,
            marker_radius_m: config.palette.marker_radius_m,
        },
    };

    let mut scene = Scene::default();
    let mut shells = Vec::with_capacity(config.shells.len());

    for (shell, grid) in config.shells.iter().zip(&grids) {
        let mut satellites = generate(shell, &template)?;
        if let Some(limit) = options.orbit_limit {
            satellites = truncate_orbits(&satellites, limit);
        }
        let positioned = evaluator.evaluate_all(&satellites, template.epoch)?;

        let mesh = build_edges(&positioned, grid).mesh_stats(&shell.distance_window);
        info!(
            "Shell {}: {} satellites, {} rendered / {} suppressed links, {} component(s)",
            shell.label(),
            positioned.len(),
            mesh.rendered_edges,
            mesh.suppressed_edges,
            mesh.components
        );

        scene.merge(build_shell_scene(
            shell,
            grid,
            &positioned,
            &index,
            &styling,
            options.markers.as_ref(),
        )?);
        shells.push(ShellSummary {
            label: shell.label(),
            satellites: positioned.len(),
            mesh,
        });
    }

    let summary = RunSummary {
        constellation: config.name.clone(),
        epoch: config.epoch.to_rfc3339(),
        shells,
        link_keys: index.len(),
        markers: scene.nodes.len(),
        links: scene.links.len(),
    };
    Ok((scene, summary))
}

/// Full HTML document for `scene`.
pub fn render_html(scene: &Scene, template: &DocumentTemplate, token: &str) -> String {
    template.render(token, &export::to_cesium_script(scene))
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    write_outputs(&[(path, contents)])
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Write every `(path, contents)` pair or none of them.
///
/// Each file is staged next to its target first; targets are only renamed
/// into place once every staged write succeeded.
pub fn write_outputs(outputs: &[(&Path, &str)]) -> Result<()> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        let staging = staging_path(path);
        let written = stage(path, &staging, contents);
        staged.push(staging);
        if let Err(e) = written {
            for staging in &staged {
                let _ = std::fs::remove_file(staging);
            }
            return Err(e);
        }
    }

    for ((path, contents), staging) in outputs.iter().zip(&staged) {
        std::fs::rename(staging, path)
            .with_context(|| format!("failed to move output into {:?}", path))?;
        info!("Wrote {} bytes to {:?}", contents.len(), path);
    }
    Ok(())
}

fn stage(path: &Path, staging: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {:?}", parent))?;
    }
    std::fs::write(staging, contents).with_context(|| format!("failed to write {:?}", staging))
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_topology::{Preset, ShellConfig};

    fn tiny() -> ConstellationConfig {
        ConstellationConfig::new(
            "tiny",
            vec![
                ShellConfig::new(15.19, 550_000.0, 4, 5, 53.0, 0),
                ShellConfig::new(13.4, 1_110_000.0, 3, 4, 53.8, 20),
            ],
        )
    }

    #[test]
    fn test_links_mode_covers_all_shells() {
        let (scene, summary) = build_scene(&tiny(), &PipelineOptions::default()).unwrap();
        assert_eq!(summary.shells.len(), 2);
        assert_eq!(summary.link_keys, (20 + 12) * 4);
        assert_eq!(scene.nodes.len(), 32);
        assert_eq!(summary.markers, 32);
        assert_eq!(summary.links, scene.links.len());
        assert!(scene.links.iter().any(|l| l.node_a >= 20));
    }

    #[test]
    fn test_orbit_limit_and_markers() {
        let config = Preset::Starlink.config();
        let options = PipelineOptions {
            orbit_limit: Some(2),
            markers: Some(BTreeSet::from([5, 16, 27])),
            ..PipelineOptions::default()
        };
        let (scene, summary) = build_scene(&config, &options).unwrap();
        assert_eq!(summary.shells[0].satellites, 44);
        assert_eq!(scene.nodes.len(), 3);
        // two orbits of 22: in-orbit links both ways plus the 0<->1 orbit pair
        assert_eq!(scene.links.len(), 2 * 22 * 2 + 22 * 2);
    }

    #[test]
    fn test_render_html() {
        let (scene, _) = build_scene(&tiny(), &PipelineOptions::default()).unwrap();
        let template = DocumentTemplate::new("token=<CESIUM_ACCESS_TOKEN>\n", "END");
        let html = render_html(&scene, &template, "xyz");
        assert!(html.starts_with("token=xyz\n"));
        assert!(html.ends_with("END"));
        assert_eq!(html.matches("var redSphere").count(), 32);
    }

    #[test]
    fn test_write_outputs_is_all_or_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let html = dir.path().join("out").join("scene.html");
        let json = dir.path().join("out").join("scene.json");
        write_outputs(&[(html.as_path(), "<html>"), (json.as_path(), "{}")]).unwrap();
        assert_eq!(std::fs::read_to_string(&html).unwrap(), "<html>");
        assert_eq!(std::fs::read_to_string(&json).unwrap(), "{}");

        // a regular file where a parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let fresh = dir.path().join("fresh.html");
        let unreachable = blocker.join("scene.json");
        let outputs = [(fresh.as_path(), "<html>"), (unreachable.as_path(), "{}")];
        assert!(write_outputs(&outputs).is_err());
        assert!(!fresh.exists());
        assert!(!staging_path(&fresh).exists());
    }
}
