use std::collections::BTreeMap;

use ivm::block::Block;
use ivm::node::{Fields, Node};
use ivm::outcome::Outcome;
use ivm::{Entry, MechanicsDocument};
use minijinja::Value;
use tracing::trace;

use crate::error::RenderError;
use crate::templates::{TemplateKey, Templates};

type Context = BTreeMap<String, Value>;

/// Depth-first renderer for parsed mechanics.
///
/// Blocks render their children first and receive them as `content`.
/// Rendering has no side effects; the same tree and templates always give
/// the same text.
pub struct Renderer<'t> {
    templates: &'t Templates,
}

impl<'t> Renderer<'t> {
    pub fn new(templates: &'t Templates) -> Self {
        Renderer { templates }
    }

    /// Render a whole fence, wrapped in the mechanics template.
    pub fn render_document(&self, document: &MechanicsDocument) -> Result<String, RenderError> {
        if self.templates.is_suppressed(TemplateKey::Mechanics) {
            return Ok(String::new());
        }
        let content = self.render_entries(&document.entries)?;
        let mut ctx = Context::new();
        ctx.insert("content".into(), Value::from_safe_string(content));
        self.templates.render(TemplateKey::Mechanics, ctx)
    }

    pub fn render_entries(&self, entries: &[Entry]) -> Result<String, RenderError> {
        let mut out = String::new();
        for entry in entries {
            match entry {
                Entry::Block(block) => out.push_str(&self.render_block(block)?),
                Entry::Node(node) => out.push_str(&self.render_node(node)?),
            }
        }
        Ok(out)
    }

    pub fn render_block(&self, block: &Block) -> Result<String, RenderError> {
        let key = if block.matched {
            TemplateKey::Block(block.kind)
        } else {
            TemplateKey::FallbackBlock
        };
        // A suppressed block hides its whole subtree.
        if self.templates.is_suppressed(key) {
            trace!(kind = block.kind.keyword(), "block suppressed");
            return Ok(String::new());
        }

        let mut content = self.render_entries(&block.children)?;
        if let Some(outcome) = block.outcome.filter(Outcome::is_determined) {
            content.push_str(&self.render_roll_result(&outcome)?);
        }

        let mut ctx = fields_context(&block.params);
        ctx.insert("params".into(), Value::from_serialize(&block.params));
        ctx.insert("kind".into(), Value::from(block.kind.template_name()));
        ctx.insert("keyword".into(), Value::from(block.kind.keyword()));
        ctx.insert("raw".into(), Value::from(block.raw.as_str()));
        ctx.insert("force_closed".into(), Value::from(block.force_closed));
        ctx.insert("content".into(), Value::from_safe_string(content));
        if let Some(outcome) = &block.outcome {
            ctx.insert("outcome".into(), Value::from_serialize(outcome));
            ctx.insert("classes".into(), Value::from(outcome.css_classes().join(" ")));
        }

        self.templates.render(key, ctx)
    }

    pub fn render_node(&self, node: &Node) -> Result<String, RenderError> {
        let key = if node.matched {
            TemplateKey::Node(node.kind)
        } else {
            TemplateKey::FallbackNode
        };

        let mut ctx = fields_context(&node.fields);
        ctx.insert("extra".into(), Value::from_serialize(&node.extra));
        ctx.insert("kind".into(), Value::from(node.kind.template_name()));
        ctx.insert("keyword".into(), Value::from(node.kind.keyword()));
        ctx.insert("raw".into(), Value::from(node.raw.as_str()));
        if let Some(snapshot) = &node.roll {
            ctx.insert("roll_state".into(), Value::from_serialize(snapshot));
        }

        self.templates.render(key, ctx)
    }

    fn render_roll_result(&self, outcome: &Outcome) -> Result<String, RenderError> {
        let Some(roll) = &outcome.roll else {
            return Ok(String::new());
        };
        let mut ctx = Context::new();
        ctx.insert("score".into(), Value::from(roll.score));
        ctx.insert("vs1".into(), Value::from(roll.vs1));
        ctx.insert("vs2".into(), Value::from(roll.vs2));
        ctx.insert("hitmiss".into(), Value::from(roll.hitmiss.as_str()));
        ctx.insert("match".into(), Value::from(roll.is_match));
        ctx.insert("progress".into(), Value::from(roll.progress));
        ctx.insert("burned".into(), Value::from(outcome.burned));
        ctx.insert("rerolled".into(), Value::from(outcome.rerolled));
        self.templates.render(TemplateKey::RollResult, ctx)
    }
}

/// Each field as a top-level template variable.
fn fields_context(fields: &Fields) -> Context {
    fields
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from_serialize(value)))
        .collect()
}
