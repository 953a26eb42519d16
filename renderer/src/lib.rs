pub mod convert;
pub mod error;
pub mod render;
pub mod templates;

pub use convert::{Config, Converter};
pub use error::RenderError;
pub use render::Renderer;
pub use templates::{TemplateKey, Templates};
