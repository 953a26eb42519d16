use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static LINK_MARKDOWN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?P<text>[^\]]+)\]\([^)]*\)").unwrap());
static LINK_WIKI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[(?P<text>[^\]|]+)\]\]").unwrap());
static LINK_WIKI_LABELLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[[^\]|]*\|(?P<text>[^\]]+)\]\]").unwrap());

/// Reduce link markup to its display text.
///
/// The first `[Text](url)`, `[[Page]]` or `[[Page|Label]]` is replaced by its
/// visible text, keeping whatever surrounds it. Escaped slashes are unescaped.
pub fn convert_link_name(raw: &str) -> String {
    for re in [&*LINK_MARKDOWN, &*LINK_WIKI, &*LINK_WIKI_LABELLED] {
        if let Some(caps) = re.captures(raw) {
            if let (Some(whole), Some(text)) = (caps.get(0), caps.name("text")) {
                let mut out = String::with_capacity(raw.len());
                out.push_str(&raw[..whole.start()]);
                out.push_str(text.as_str());
                out.push_str(&raw[whole.end()..]);
                return out.replace("\\/", "/");
            }
        }
    }
    raw.replace("\\/", "/")
}

/// CSS slug for an initiative state.
pub fn initiative_slug(state: &str) -> &'static str {
    match state {
        "out of combat" => "nocombat",
        "has initiative" => "initiative",
        "no initiative" => "noinitiative",
        other => {
            warn!(initiative = other, "unhandled initiative state");
            "unknown"
        }
    }
}

/// CSS slug for a combat position.
pub fn position_slug(state: &str) -> &'static str {
    match state {
        "out of combat" => "nocombat",
        "in control" => "control",
        "in a bad spot" => "badspot",
        other => {
            warn!(position = other, "unhandled position");
            "unknown"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_link_markup() {
        assert_eq!(convert_link_name("[link name](https://example.org)"), "link name");
        assert_eq!(convert_link_name("[link\\/name](https://example.org)"), "link/name");
        assert_eq!(
            convert_link_name("before[[https://example.org|link name]]after"),
            "beforelink nameafter"
        );
        assert_eq!(convert_link_name("before [[link name]] after"), "before link name after");
    }

    #[test]
    fn leaves_degenerate_links_alone() {
        assert_eq!(convert_link_name("[]()"), "[]()");
        assert_eq!(convert_link_name("[[]]"), "[[]]");
        assert_eq!(convert_link_name("[[|]]"), "[[|]]");
        assert_eq!(convert_link_name(""), "");
    }
}
