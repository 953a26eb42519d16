use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static WIKILINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!?\[\[(?P<reference>[^\]|#]+)(?:#(?P<anchor>[^|\]]+))?(?:\|(?P<label>[^\]]+))?\]\]")
        .unwrap()
});

/// A reference to another note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub reference: String,
    /// Heading or block anchor within the note, empty when absent.
    pub anchor: String,
    /// Display text. Falls back to the reference.
    pub label: String,
}

impl Link {
    pub fn new(reference: &str, anchor: Option<&str>, label: Option<&str>) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let label = label.map(str::trim).filter(|l| !l.is_empty()).unwrap_or(reference);
        Some(Link {
            reference: reference.to_string(),
            anchor: anchor.map(str::trim).unwrap_or_default().to_string(),
            label: label.to_string(),
        })
    }
}

/// One occurrence of link syntax in a text.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkMatch {
    /// Byte range of the whole `[[...]]`, including a leading `!`.
    pub span: Range<usize>,
    /// `None` when the reference is blank; such links render as nothing.
    pub link: Option<Link>,
}

/// Find every wiki link in `text`, in order.
pub fn find_links(text: &str) -> Vec<LinkMatch> {
    WIKILINK
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let reference = caps.name("reference")?.as_str();
            let link = Link::new(
                reference,
                caps.name("anchor").map(|m| m.as_str()),
                caps.name("label").map(|m| m.as_str()),
            );
            Some(LinkMatch {
                span: whole.range(),
                link,
            })
        })
        .collect()
}

/// Replace every wiki link in `text` with the output of `render`.
///
/// Blank links are dropped. Text between links is passed through
/// `plain` so callers can escape it.
pub fn replace_links<E>(
    text: &str,
    mut plain: impl FnMut(&str) -> String,
    mut render: impl FnMut(&Link) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in find_links(text) {
        out.push_str(&plain(&text[last..found.span.start]));
        if let Some(link) = &found.link {
            out.push_str(&render(link)?);
        }
        last = found.span.end;
    }
    out.push_str(&plain(&text[last..]));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(text: &str) -> Option<Link> {
        find_links(text).into_iter().next().and_then(|m| m.link)
    }

    #[test]
    fn label_defaults_to_reference() {
        let link = first("see [[  multi word link  ]] here");
        assert_eq!(link.map(|l| l.label), Some("multi word link".to_string()));
    }

    #[test]
    fn anchor_and_label() {
        let link = first("![[page#section| shown ]]");
        assert_eq!(
            link,
            Some(Link {
                reference: "page".into(),
                anchor: "section".into(),
                label: "shown".into(),
            })
        );
    }

    #[test]
    fn blank_reference_is_not_a_link() {
        let found = find_links("[[ | ]]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].link, None);
    }

    #[test]
    fn unclosed_links_do_not_match() {
        for text in ["[[link|label but not closed", "[[]]", "[[#]]", "not a link"] {
            assert!(find_links(text).is_empty(), "{text}");
        }
    }
}
