use std::collections::BTreeMap;
use std::path::PathBuf;

use ivm::frontmatter::{self, Frontmatter};
use ivm::journal::{self, Fence, FenceKind};
use ivm::link::{Link, replace_links};
use ivm::parser::ParseWarning;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Parser as CmarkParser, Tag, TagEnd, TextMergeStream};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::RenderError;
use crate::render::Renderer;
use crate::templates::{TemplateKey, Templates};

/// File id used for warnings of converted pages.
pub const PAGE_FILE_ID: usize = 0;

/// Template configuration of a [`Converter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory searched for `blocks/*.html`, `nodes/*.html` and `link.html`.
    pub template_path: Option<PathBuf>,
    /// Template sources keyed by element name, e.g. `roll` or `move_block`.
    /// An empty string hides the element.
    pub template_overrides: BTreeMap<String, String>,
}

/// Converts journal pages to HTML.
pub struct Converter {
    config: Config,
    templates: Templates,
    warnings: Vec<ParseWarning>,
}

impl Converter {
    pub fn new(config: Config) -> Result<Self, RenderError> {
        let templates = Templates::new(config.template_path.as_deref(), &config.template_overrides)?;
        Ok(Converter {
            config,
            templates,
            warnings: Vec::new(),
        })
    }

    /// Switch to another configuration. On error the current one stays.
    pub fn reconfigure(&mut self, config: Config) -> Result<(), RenderError> {
        let templates = Templates::new(config.template_path.as_deref(), &config.template_overrides)?;
        info!("templates reconfigured");
        self.config = config;
        self.templates = templates;
        self.reset();
        Ok(())
    }

    /// Forget everything from the previous run.
    pub fn reset(&mut self) {
        self.warnings.clear();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Parse warnings of the last run, with spans into the whole page.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Convert one page.
    ///
    /// Links found in text and mechanics are appended to `links`; the page's
    /// front matter, if any, replaces the content of `frontmatter`.
    pub fn convert(
        &mut self,
        source: &str,
        mut links: Option<&mut Vec<Link>>,
        frontmatter: Option<&mut Frontmatter>,
    ) -> Result<String, RenderError> {
        self.reset();

        let split = frontmatter::split(source)?;
        if let Some(parsed) = split.parse()? {
            debug!(keys = parsed.len(), "front matter");
            if let Some(out) = frontmatter {
                *out = parsed;
            }
        }

        let mut fences = journal::fences(split.body, split.body_offset)
            .into_iter()
            .filter(|fence| fence.kind == FenceKind::Mechanics);

        let mut events = Vec::new();
        let mut dropping = false;
        let mut in_code = false;

        let parser = CmarkParser::new_ext(split.body, journal::markdown_options());
        for event in TextMergeStream::new(parser) {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info)))
                    if FenceKind::from_info(info) != FenceKind::Code =>
                {
                    dropping = true;
                    if FenceKind::from_info(info) == FenceKind::Mechanics {
                        if let Some(fence) = fences.next() {
                            let html = self.render_fence(&fence, links.as_deref_mut())?;
                            events.push(Event::Html(CowStr::from(html)));
                        }
                    }
                }
                Event::End(TagEnd::CodeBlock) if dropping => dropping = false,
                _ if dropping => {}
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code = true;
                    events.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code = false;
                    events.push(event);
                }
                Event::Text(text) if !in_code => {
                    events.push(self.link_text(text, links.as_deref_mut())?);
                }
                other => events.push(other),
            }
        }

        let mut html = String::with_capacity(source.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html, events.into_iter());
        Ok(html)
    }

    fn render_fence(
        &mut self,
        fence: &Fence,
        links: Option<&mut Vec<Link>>,
    ) -> Result<String, RenderError> {
        let (document, warnings) = fence.parse(PAGE_FILE_ID);
        debug!(
            entries = document.entries.len(),
            warnings = warnings.len(),
            "mechanics fence"
        );
        self.warnings.extend(warnings);

        let mut html = Renderer::new(&self.templates).render_document(&document)?;
        if !html.is_empty() {
            // Link text in the rendered fence is already escaped.
            html = self.render_links(&html, str::to_string, true, links)?;
            html.push('\n');
        }
        Ok(html)
    }

    fn link_text<'a>(
        &self,
        text: CowStr<'a>,
        links: Option<&mut Vec<Link>>,
    ) -> Result<Event<'a>, RenderError> {
        if ivm::link::find_links(&text).is_empty() {
            return Ok(Event::Text(text));
        }
        let escape = |plain: &str| html_escape::encode_text(plain).into_owned();
        let html = self.render_links(&text, escape, false, links)?;
        Ok(Event::InlineHtml(CowStr::from(html)))
    }

    fn render_links(
        &self,
        text: &str,
        plain: impl FnMut(&str) -> String,
        escaped: bool,
        mut links: Option<&mut Vec<Link>>,
    ) -> Result<String, RenderError> {
        replace_links(text, plain, |link| {
            let link = if escaped { unescape(link) } else { link.clone() };
            let html = self.templates.render(TemplateKey::Link, &link)?;
            if let Some(list) = links.as_deref_mut() {
                list.push(link);
            }
            Ok(html)
        })
    }
}

fn unescape(link: &Link) -> Link {
    let decode = |s: &str| html_escape::decode_html_entities(s).into_owned();
    Link {
        reference: decode(&link.reference),
        anchor: decode(&link.anchor),
        label: decode(&link.label),
    }
}
