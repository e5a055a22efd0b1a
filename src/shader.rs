//! User-supplied WGSL fragment stages.
//!
//! A [`FragmentShader`] only carries validated source. The GPU backend prepends its own vertex
//! stage and bindings to it and compiles one pipeline per shader and blend state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use regex::Regex;

use crate::error::{RenderError, Result};

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

/// Declarations the backend provides to every user fragment stage.
pub(crate) const FRAGMENT_PREAMBLE: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) tex_coords: vec2<f32>,
};

@group(0) @binding(0) var t_diffuse: texture_2d<f32>;
@group(0) @binding(1) var s_diffuse: sampler;
"#;

/// A fragment stage written against the preamble's `VertexOutput`, `t_diffuse` and
/// `s_diffuse`. It must define `@fragment fn fs_main(in: VertexOutput) -> @location(0) vec4<f32>`
/// and return a straight-alpha color.
#[derive(Debug, Clone)]
pub struct FragmentShader {
    id: u64,
    source: Arc<str>,
}

impl PartialEq for FragmentShader {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl FragmentShader {
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source: String = source.into();
        validate(&source).map_err(|reason| RenderError::ResourceUpload {
            resource: "fragment shader".into(),
            reason,
        })?;
        Ok(Self {
            id: NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed),
            source: source.into(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Full module source: preamble, shared vertex stage, then the user fragment stage.
    pub(crate) fn module_source(&self, vertex_stage: &str) -> String {
        format!("{FRAGMENT_PREAMBLE}\n{vertex_stage}\n{}", self.source)
    }
}

/// Strips `//` and `/* */` comments so that commented-out code does not count.
fn strip_comments(source: &str) -> std::result::Result<String, regex::Error> {
    let no_block = Regex::new(r"(?s)/\*.*?\*/")?.replace_all(source, "");
    Ok(Regex::new(r"//[^\n]*")?.replace_all(&no_block, "").into_owned())
}

fn validate(source: &str) -> std::result::Result<(), String> {
    let stripped = strip_comments(source).map_err(|e| e.to_string())?;
    let entry = Regex::new(r"@fragment\s+fn\s+fs_main\s*\(").map_err(|e| e.to_string())?;
    if !entry.is_match(&stripped) {
        return Err("missing `@fragment fn fs_main(...)` entry point".into());
    }
    let reserved =
        Regex::new(r"\b(fn\s+vs_main|struct\s+VertexOutput|var\s+t_diffuse|var\s+s_diffuse)\b")
            .map_err(|e| e.to_string())?;
    if let Some(m) = reserved.find(&stripped) {
        return Err(format!("`{}` is provided by the renderer", m.as_str()));
    }
    Ok(())
}
