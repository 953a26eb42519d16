use std::collections::BTreeMap;

use ivm::frontmatter::Frontmatter;
use ivm::link::Link;
use pretty_assertions::assert_eq;
use renderer::{Config, Converter, RenderError};
use serde_yaml::Value;

fn converter() -> Converter {
    Converter::new(Config::default()).expect("default config")
}

fn convert(page: &str) -> String {
    converter().convert(page, None, None).expect("convert failed")
}

fn link_override(template: &str) -> Config {
    Config {
        template_path: None,
        template_overrides: BTreeMap::from([("link".to_string(), template.to_string())]),
    }
}

#[test]
fn plain_markdown_passes_through() {
    assert_eq!(convert("# Session 1\n\nWe *left* port.\n"), "<h1>Session 1</h1>\n<p>We <em>left</em> port.</p>\n");
}

#[test]
fn mechanics_fence_is_rendered() {
    let page = "```iron-vault-mechanics\nxp from=1 to=2\n```\n";
    assert_eq!(
        convert(page),
        "<div class=\"ivm-mechanics\"><div class=\"ivm-xp\">XP: 1 → 2 (+1)</div></div>\n"
    );
}

#[test]
fn other_plugin_fences_are_dropped() {
    let page = "Before\n\n```iron-vault-track\nname: Vow\n```\n\n```iron-vault-character-info\n```\n\nAfter\n";
    assert_eq!(convert(page), "<p>Before</p>\n<p>After</p>\n");
}

#[test]
fn ordinary_code_is_untouched() {
    let page = "```text\n[[not a link]]\n```\n\nInline `[[code]]` too.\n";
    assert_eq!(
        convert(page),
        "<pre><code class=\"language-text\">[[not a link]]\n</code></pre>\n<p>Inline <code>[[code]]</code> too.</p>\n"
    );
}

#[test]
fn wiki_links_in_text() {
    let mut links = Vec::new();
    let html = converter()
        .convert("Met [[People/Kira|Kira]] & [[Sam]].\n", Some(&mut links), None)
        .unwrap();
    assert_eq!(
        html,
        "<p>Met <span class=\"ivm-link\">Kira</span> &amp; <span class=\"ivm-link\">Sam</span>.</p>\n"
    );
    assert_eq!(
        links,
        vec![
            Link::new("People/Kira", None, Some("Kira")).unwrap(),
            Link::new("Sam", None, None).unwrap(),
        ]
    );
}

#[test]
fn blank_links_render_nothing_and_are_not_collected() {
    let mut links = Vec::new();
    let html = converter().convert("a [[ | ]] b\n", Some(&mut links), None).unwrap();
    assert_eq!(html, "<p>a  b</p>\n");
    assert!(links.is_empty());
}

#[test]
fn wiki_links_inside_mechanics() {
    let mut links = Vec::new();
    let page = "```iron-vault-mechanics\n- \"met [[People/Kira & Co|Kira & Co]]\"\n```\n";
    let html = converter().convert(page, Some(&mut links), None).unwrap();
    assert_eq!(
        html,
        "<div class=\"ivm-mechanics\"><div class=\"ivm-ooc\">met <span class=\"ivm-link\">Kira &amp; Co</span></div></div>\n"
    );
    assert_eq!(links, vec![Link::new("People/Kira & Co", None, Some("Kira & Co")).unwrap()]);
}

#[test]
fn link_override_applies_to_every_fence_and_run() {
    let page = "```iron-vault-mechanics\n- \"met [[Kira]]\"\n```\n\nLater.\n\n```iron-vault-mechanics\n- \"and [[People/Sam|Sam]]\"\n```\n";
    let mut converter = Converter::new(link_override("<i>{{ label }}</i>")).unwrap();

    let first = converter.convert(page, None, None).unwrap();
    assert!(first.contains("met <i>Kira</i>"), "{first}");
    assert!(first.contains("and <i>Sam</i>"), "{first}");
    assert!(!first.contains("ivm-link"));

    let second = converter.convert(page, None, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn frontmatter_is_split_off() {
    let mut frontmatter = Frontmatter::new();
    let html = converter()
        .convert("---\ntitle: Session 1\ntags: [a, b]\n---\n# Hi\n", None, Some(&mut frontmatter))
        .unwrap();
    assert_eq!(html, "<h1>Hi</h1>\n");
    assert_eq!(frontmatter.get("title"), Some(&Value::from("Session 1")));
    assert_eq!(frontmatter.len(), 2);
}

#[test]
fn frontmatter_is_stripped_even_when_not_requested() {
    assert_eq!(convert("---\ntitle: x\n---\ntext\n"), "<p>text</p>\n");
}

#[test]
fn unterminated_frontmatter_fails() {
    let err = converter().convert("---\ntitle: x\ntext\n", None, None).unwrap_err();
    assert!(matches!(err, RenderError::Frontmatter(_)));
}

#[test]
fn warnings_point_into_the_page() {
    let page = "---\ntitle: x\n---\n\n```iron-vault-mechanics\nxp from=1 to=2\nbogus line\n```\n";
    let mut converter = converter();
    converter.convert(page, None, None).unwrap();
    let warnings = converter.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(&page[warnings[0].span.clone()], "bogus line");

    converter.reset();
    assert!(converter.warnings().is_empty());
}

#[test]
fn reconfigure_switches_templates() {
    let mut converter = converter();
    let page = "See [[Kira]].\n";
    assert!(converter.convert(page, None, None).unwrap().contains("ivm-link"));

    converter.reconfigure(link_override("<b>{{ label }}</b>")).unwrap();
    assert_eq!(converter.convert(page, None, None).unwrap(), "<p>See <b>Kira</b>.</p>\n");
}

#[test]
fn failed_reconfigure_keeps_previous_templates() {
    let mut converter = Converter::new(link_override("<b>{{ label }}</b>")).unwrap();
    let err = converter.reconfigure(link_override("{% if %}")).unwrap_err();
    assert!(matches!(err, RenderError::TemplateCompile { .. }));
    assert_eq!(
        converter.config().template_overrides.get("link").map(String::as_str),
        Some("<b>{{ label }}</b>")
    );
    assert_eq!(converter.convert("[[Kira]]\n", None, None).unwrap(), "<p><b>Kira</b></p>\n");
}
