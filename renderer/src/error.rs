use std::path::PathBuf;

use ivm::frontmatter::FrontmatterError;
use thiserror::Error;

/// Errors that abort a conversion run.
///
/// Irregular mechanics never end up here; they are parse warnings.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot read template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("template `{name}` does not compile: {source}")]
    TemplateCompile {
        name: String,
        source: minijinja::Error,
    },

    #[error("template `{name}` failed to render: {source}")]
    Render {
        name: String,
        source: minijinja::Error,
    },

    #[error("unknown template override `{0}`")]
    UnknownOverride(String),

    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),
}
