//! Satviz - static Cesium views of constellation ISL meshes
//!
//! Glue between the topology library and the output document: runs the batch
//! pipeline for a constellation and renders the resulting scene into a
//! self-contained HTML page (or JSON).

pub mod document;
pub mod pipeline;

pub use document::{read_token, DocumentTemplate, TOKEN_PLACEHOLDER};
pub use pipeline::{
    build_scene, render_html, write_output, write_outputs, PipelineOptions, RenderMode, RunSummary,
};
