use isl_topology::{ConstellationConfig, LinkKey, ShellConfig, TopologyError, TrafficMetric};
use satviz::{
    build_scene, read_token, render_html, write_output, DocumentTemplate, PipelineOptions,
    RenderMode,
};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
name = "Mini"
epoch = "2000-01-01T00:00:00Z"

[[shells]]
name = "mini-550"
mean_motion_rev_per_day = 15.19
altitude_m = 550000.0
orbit_count = 3
sats_per_orbit = 4
inclination_deg = 53.0
"#;

fn write_traffic(dir: &Path, extra_link: Option<&str>) -> (std::path::PathBuf, std::path::PathBuf) {
    let mut nodes = String::from("node_id,packet_count,traffic_size_mb,orbit,sat_id\n");
    for id in 0..12u32 {
        writeln!(nodes, "{},{},{},{},{}", id, id * 10, id as f64 * 0.5, id / 4, id % 4).unwrap();
    }
    let mut links = String::from("link_id,packet_count,traffic_size_mb\n");
    for id in 0..12u32 {
        for index in 1..=4u32 {
            writeln!(links, "{}-{},{},{}", id, index, id + index, (id + index) as f64).unwrap();
        }
    }
    if let Some(extra) = extra_link {
        links.push_str(extra);
    }

    let node_path = dir.join("per_node_summary.csv");
    let link_path = dir.join("per_link_summary.csv");
    fs::write(&node_path, nodes).unwrap();
    fs::write(&link_path, links).unwrap();
    (node_path, link_path)
}

#[test]
fn palette_document_is_written() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("mini.toml");
    fs::write(&config_path, CONFIG).unwrap();
    let token_path = dir.path().join("cesium-token");
    fs::write(&token_path, "tok-123\n").unwrap();

    let config = ConstellationConfig::load(&config_path).unwrap();
    let (scene, summary) = build_scene(&config, &PipelineOptions::default()).unwrap();
    let html = render_html(&scene, &DocumentTemplate::default(), &read_token(&token_path).unwrap());

    let out = dir.path().join("out").join("mini.html");
    write_output(&out, &html).unwrap();
    let written = fs::read_to_string(&out).unwrap();

    assert!(written.contains("'tok-123'"));
    assert_eq!(written.matches("var redSphere").count(), 12);
    assert_eq!(written.matches("polyline").count(), summary.links);
    assert!(written.contains("withAlpha(0.3)"));
    assert_eq!(summary.shells[0].label, "mini-550");
}

#[test]
fn traffic_document_uses_colormaps() {
    let dir = TempDir::new().unwrap();
    let (node_summary, link_summary) = write_traffic(dir.path(), None);
    let config = ConstellationConfig::from_toml_str(CONFIG).unwrap();
    let options = PipelineOptions {
        mode: RenderMode::Traffic {
            node_summary,
            link_summary,
            metric: TrafficMetric::Megabytes,
        },
        ..PipelineOptions::default()
    };

    let (scene, _) = build_scene(&config, &options).unwrap();
    // lowest and highest node traffic hit the ends of viridis
    assert_eq!(scene.nodes[0].paint.css, "#440154");
    assert_eq!(scene.nodes[11].paint.css, "#fde724");
    assert!(scene.links.iter().all(|l| l.paint.alpha == 1.0));

    let json: serde_json::Value = serde_json::from_str(&scene.to_json().unwrap()).unwrap();
    assert_eq!(json["nodes"].as_array().unwrap().len(), 12);
}

#[test]
fn unmapped_traffic_link_aborts() {
    let dir = TempDir::new().unwrap();
    let (node_summary, link_summary) = write_traffic(dir.path(), Some("99-1,1,1.0\n"));
    let config = ConstellationConfig::from_toml_str(CONFIG).unwrap();
    let options = PipelineOptions {
        mode: RenderMode::Traffic {
            node_summary,
            link_summary,
            metric: TrafficMetric::Packets,
        },
        ..PipelineOptions::default()
    };

    let err = build_scene(&config, &options).unwrap_err();
    match err.downcast_ref::<TopologyError>() {
        Some(TopologyError::UnmappedTrafficLink(key)) => {
            assert_eq!(*key, LinkKey { node_id: 99, local_link_index: 1 })
        }
        other => panic!("expected unmapped link, got {:?}", other),
    }
}

#[test]
fn missing_node_traffic_aborts() {
    let dir = TempDir::new().unwrap();
    let (node_summary, link_summary) = write_traffic(dir.path(), None);
    let config = ConstellationConfig::new(
        "bigger",
        vec![ShellConfig::new(15.19, 550_000.0, 3, 5, 53.0, 0)],
    );
    let options = PipelineOptions {
        mode: RenderMode::Traffic {
            node_summary,
            link_summary,
            metric: TrafficMetric::Megabytes,
        },
        ..PipelineOptions::default()
    };

    // nodes 12..15 have link keys but no node traffic record
    let err = build_scene(&config, &options).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TopologyError>(),
        Some(TopologyError::DataIntegrity(_))
    ));
}

#[test]
fn bundled_configs_are_valid() {
    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data");
    let starlink = ConstellationConfig::load(data.join("starlink.toml")).unwrap();
    assert_eq!(starlink.total_satellites(), 1584);

    let telesat = ConstellationConfig::load(data.join("telesat.toml")).unwrap();
    assert_eq!(telesat.shells.len(), 2);
    assert_eq!(telesat.shells[1].base_id, 351);
}
