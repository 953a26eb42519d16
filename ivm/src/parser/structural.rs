use std::ops::Range;

use tracing::{debug, trace};

use crate::Entry;
use crate::block::{Block, BlockKind};
use crate::grammar::{self, Line};
use crate::node::{Fields, Node};
use crate::outcome::{Outcome, RollState};
use crate::parser::warning::ParseWarning;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse the lines of a fence into top-level entries.
pub fn parse_entries(
    source: &str,
    file_id: usize,
    base_offset: usize,
) -> (Vec<Entry>, Vec<ParseWarning>) {
    let mut state = ParseState::new(file_id);
    let mut offset = base_offset;

    for raw_line in source.split_inclusive('\n') {
        let content = raw_line.trim_end_matches(['\n', '\r']);
        let lead = content.len() - content.trim_start().len();
        let span = offset + lead..offset + lead + content.trim().len();
        state.process_line(content, span);
        offset += raw_line.len();
    }

    state.finalize(offset)
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState {
    file_id: usize,
    /// Stack of open blocks. Innermost = current container.
    block_stack: Vec<BlockBuilder>,
    /// Completed top-level entries.
    top_entries: Vec<Entry>,
    /// Roll state for nodes outside any block.
    root_roll: RollState,
    /// Lines of a comment still waiting for its closing quote.
    pending_comment: Option<PendingComment>,
    warnings: Vec<ParseWarning>,
}

struct BlockBuilder {
    kind: BlockKind,
    params: Fields,
    raw: String,
    matched: bool,
    children: Vec<Entry>,
    roll: RollState,
    span_start: usize,
}

struct PendingComment {
    lines: Vec<String>,
    span: Range<usize>,
}

impl BlockBuilder {
    fn into_block(self, span_end: usize, force_closed: bool) -> Block {
        let outcome = (self.kind == BlockKind::Move).then(|| Outcome::compute(&self.children));
        Block {
            kind: self.kind,
            params: self.params,
            raw: self.raw,
            matched: self.matched,
            children: self.children,
            outcome,
            force_closed,
            span: self.span_start..span_end,
        }
    }
}

impl ParseState {
    fn new(file_id: usize) -> Self {
        ParseState {
            file_id,
            block_stack: Vec::new(),
            top_entries: Vec::new(),
            root_roll: RollState::new(),
            pending_comment: None,
            warnings: Vec::new(),
        }
    }

    fn process_line(&mut self, line: &str, span: Range<usize>) {
        if self.pending_comment.is_some() {
            self.continue_comment(line, span);
            return;
        }

        match grammar::classify_line(line) {
            Some(Line::Open {
                kind,
                params,
                raw,
                matched,
            }) => {
                trace!(kind = kind.keyword(), "open block");
                if !matched {
                    self.warn(format!("unrecognized {} parameters", kind.keyword()), span.clone());
                }
                self.block_stack.push(BlockBuilder {
                    kind,
                    params,
                    raw,
                    matched,
                    children: Vec::new(),
                    roll: RollState::new(),
                    span_start: span.start,
                });
            }

            Some(Line::Close { label }) => self.close(label.as_deref(), span),

            Some(Line::Node(node)) => {
                if !node.matched {
                    self.warn(
                        format!("unrecognized {} arguments", node.kind.keyword()),
                        span.clone(),
                    );
                }
                self.push_node(node, span);
            }

            Some(Line::CommentStart(first)) => {
                self.pending_comment = Some(PendingComment {
                    lines: vec![first],
                    span,
                });
            }

            None => {
                if !line.trim().is_empty() {
                    trace!(line, "skipping unrecognized line");
                    self.warn("unrecognized line skipped", span);
                }
            }
        }
    }

    fn continue_comment(&mut self, line: &str, span: Range<usize>) {
        let Some(pending) = self.pending_comment.as_mut() else {
            return;
        };
        let line = line.trim();
        pending.span.end = span.end;
        if grammar::ends_comment(line) {
            pending.lines.push(line[..line.len() - 1].to_string());
            self.flush_comment();
        } else {
            pending.lines.push(line.to_string());
        }
    }

    fn flush_comment(&mut self) {
        if let Some(pending) = self.pending_comment.take() {
            let node = grammar::nodes::comment_node(&pending.lines.join("\n"));
            self.push_node(node, pending.span);
        }
    }

    fn push_node(&mut self, mut node: Node, span: Range<usize>) {
        node.span = span;
        match self.block_stack.last_mut() {
            Some(builder) => {
                builder.roll.annotate(&mut node);
                builder.children.push(Entry::Node(node));
            }
            None => {
                self.root_roll.annotate(&mut node);
                self.top_entries.push(Entry::Node(node));
            }
        }
    }

    fn close(&mut self, label: Option<&str>, span: Range<usize>) {
        let Some(top_kind) = self.block_stack.last().map(|b| b.kind) else {
            self.warn("closing brace without an open block", span);
            return;
        };

        let Some(label) = label else {
            self.close_blocks_to_depth(self.block_stack.len() - 1, span.end, false);
            return;
        };

        if top_kind.keyword() == label {
            self.close_blocks_to_depth(self.block_stack.len() - 1, span.end, false);
            return;
        }

        // Tolerate a closer naming an outer block: close everything down to
        // the nearest block of that kind.
        match self
            .block_stack
            .iter()
            .rposition(|b| b.kind.keyword() == label)
        {
            Some(depth) => {
                debug!(label, depth, "closing nearest matching block");
                self.warnings.push(
                    ParseWarning::new(
                        format!("closing marker `{}` does not match the innermost block", label),
                        span.clone(),
                        self.file_id,
                    )
                    .with_note("closed the nearest enclosing block of that kind"),
                );
                self.close_blocks_to_depth(depth, span.end, false);
            }
            None => self.warn(format!("no open `{}` block to close", label), span),
        }
    }

    /// Pop blocks until the stack is `depth` deep, attaching each to its parent.
    fn close_blocks_to_depth(&mut self, depth: usize, span_end: usize, force_closed: bool) {
        while self.block_stack.len() > depth {
            let Some(builder) = self.block_stack.pop() else {
                break;
            };
            let block = builder.into_block(span_end, force_closed);

            if let Some(parent) = self.block_stack.last_mut() {
                parent.children.push(Entry::Block(block));
            } else {
                self.top_entries.push(Entry::Block(block));
            }
        }
    }

    fn finalize(mut self, end: usize) -> (Vec<Entry>, Vec<ParseWarning>) {
        if let Some(pending) = &self.pending_comment {
            let span = pending.span.clone();
            self.warn("comment is missing its closing quote", span);
            self.flush_comment();
        }

        // Force-close whatever the fence left open
        for builder in self.block_stack.iter().rev() {
            let span = builder.span_start..builder.span_start;
            self.warnings.push(ParseWarning::new(
                format!("`{}` block is never closed", builder.kind.keyword()),
                span,
                self.file_id,
            ));
        }
        self.close_blocks_to_depth(0, end, true);

        (self.top_entries, self.warnings)
    }

    fn warn(&mut self, message: impl Into<String>, span: Range<usize>) {
        self.warnings.push(ParseWarning::new(message, span, self.file_id));
    }
}
