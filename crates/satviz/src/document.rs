//! HTML document assembly
//!
//! A prefix/suffix template wraps the generated entity script. The prefix may
//! carry a `<CESIUM_ACCESS_TOKEN>` placeholder, replaced with a token read
//! from a local file.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

pub const TOKEN_PLACEHOLDER: &str = "<CESIUM_ACCESS_TOKEN>";

const DEFAULT_TOP: &str = include_str!("../static_html/top.html");
const DEFAULT_BOTTOM: &str = include_str!("../static_html/bottom.html");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTemplate {
    pub prefix: String,
    pub suffix: String,
}

impl Default for DocumentTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TOP, DEFAULT_BOTTOM)
    }
}

impl DocumentTemplate {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn load(top: &Path, bottom: &Path) -> Result<Self> {
        let prefix = std::fs::read_to_string(top)
            .with_context(|| format!("reading template prefix {:?}", top))?;
        let suffix = std::fs::read_to_string(bottom)
            .with_context(|| format!("reading template suffix {:?}", bottom))?;
        debug!("Loaded template {:?} + {:?}", top, bottom);
        Ok(Self { prefix, suffix })
    }

    /// Prefix with the token substituted, then `body`, then the suffix.
    pub fn render(&self, token: &str, body: &str) -> String {
        let prefix = self.prefix.replace(TOKEN_PLACEHOLDER, token);
        let mut out = String::with_capacity(prefix.len() + body.len() + self.suffix.len());
        out.push_str(&prefix);
        out.push_str(body);
        out.push_str(&self.suffix);
        out
    }
}

/// Read an access token, stripping surrounding whitespace.
pub fn read_token(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading token {:?}", path))?;
    Ok(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_render_substitutes_token() {
        let template = DocumentTemplate::new("<p>key=<CESIUM_ACCESS_TOKEN></p>\n", "<end/>");
        let html = template.render("abc123", "body;\n");
        assert_eq!(html, "<p>key=abc123</p>\nbody;\n<end/>");
    }

    #[test]
    fn test_default_template_has_placeholder_and_viewer() {
        let template = DocumentTemplate::default();
        assert!(template.prefix.contains(TOKEN_PLACEHOLDER));
        assert!(template.prefix.contains("var viewer"));
        assert!(!template.render("t", "").contains(TOKEN_PLACEHOLDER));
    }

    #[test]
    fn test_read_token_trims() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"  secret-token\n\n").unwrap();
        assert_eq!(read_token(file.path()).unwrap(), "secret-token");
    }

    #[test]
    fn test_missing_template_names_path() {
        let err = DocumentTemplate::load(Path::new("/nonexistent/top.html"), Path::new("b.html"))
            .unwrap_err();
        assert!(err.to_string().contains("top.html"));
    }
}
