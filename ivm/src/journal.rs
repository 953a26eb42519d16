use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::MechanicsDocument;
use crate::parser::{ParseWarning, Parser};

/// Info string of the fences this crate parses.
pub const MECHANICS_FENCE: &str = "iron-vault-mechanics";
const IRON_VAULT_PREFIX: &str = "iron-vault";

/// How a fenced code block is treated during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    /// Parsed and rendered as mechanics.
    Mechanics,
    /// Another plugin block (tracks, character sheets, ...). Dropped.
    OtherIronVault,
    /// Ordinary code, left to markdown rendering.
    Code,
}

impl FenceKind {
    pub fn from_info(info: &str) -> Self {
        let lang = info.split_whitespace().next().unwrap_or_default();
        if lang == MECHANICS_FENCE {
            FenceKind::Mechanics
        } else if lang.starts_with(IRON_VAULT_PREFIX) {
            FenceKind::OtherIronVault
        } else {
            FenceKind::Code
        }
    }
}

/// A fenced block found in a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Fence {
    pub kind: FenceKind,
    pub info: String,
    pub content: String,
    /// Byte range of the whole fence, delimiters included.
    pub span: Range<usize>,
    /// Byte offset of the first content line.
    pub content_offset: usize,
}

impl Fence {
    /// Parse a mechanics fence. Spans in the result and warnings are
    /// relative to the page.
    pub fn parse(&self, file_id: usize) -> (MechanicsDocument, Vec<ParseWarning>) {
        Parser::new(self.content.as_str(), file_id)
            .with_offset(self.content_offset)
            .parse_with_warnings()
    }
}

/// Markdown extensions enabled for journal pages.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Collect all fenced code blocks in `body`. Offsets are shifted by `base`.
pub fn fences(body: &str, base: usize) -> Vec<Fence> {
    let mut found = Vec::new();
    let mut current: Option<Fence> = None;

    for (event, range) in CmarkParser::new_ext(body, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                current = Some(Fence {
                    kind: FenceKind::from_info(&info),
                    info: info.to_string(),
                    content: String::new(),
                    span: base + range.start..base + range.end,
                    content_offset: base + range.end,
                });
            }
            Event::Text(text) => {
                if let Some(fence) = current.as_mut() {
                    if fence.content.is_empty() {
                        fence.content_offset = base + range.start;
                    }
                    fence.content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(fence) = current.take() {
                    found.push(fence);
                }
            }
            _ => {}
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "# Session 3\n\n```iron-vault-mechanics\nxp from=1 to=2\n```\n\n```iron-vault-track\nname: Vow\n```\n\n```rust\nfn main() {}\n```\n";

    #[test]
    fn classifies_fences() {
        let kinds: Vec<FenceKind> = fences(PAGE, 0).iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![FenceKind::Mechanics, FenceKind::OtherIronVault, FenceKind::Code]
        );
    }

    #[test]
    fn mechanics_content_keeps_page_offsets() {
        let fence = &fences(PAGE, 0)[0];
        assert_eq!(fence.content, "xp from=1 to=2\n");
        assert_eq!(&PAGE[fence.content_offset..fence.content_offset + 14], "xp from=1 to=2");

        let (doc, warnings) = fence.parse(0);
        assert!(warnings.is_empty());
        assert_eq!(&PAGE[doc.entries[0].span()], "xp from=1 to=2");
    }

    #[test]
    fn info_string_extras_are_ignored() {
        assert_eq!(FenceKind::from_info("iron-vault-mechanics  foo"), FenceKind::Mechanics);
        assert_eq!(FenceKind::from_info(""), FenceKind::Code);
    }
}
