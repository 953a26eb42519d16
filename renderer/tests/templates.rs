use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ivm::node::NodeKind;
use pretty_assertions::assert_eq;
use renderer::{RenderError, Renderer, TemplateKey, Templates};
use tempfile::TempDir;

fn template_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (name, source) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create template subdir");
        }
        fs::write(&path, source).expect("write template");
    }
    dir
}

fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn render(templates: &Templates, fence: &str) -> String {
    Renderer::new(templates)
        .render_document(&ivm::parser::parse(fence))
        .expect("render failed")
}

fn build(dir: Option<&Path>, pairs: &[(&str, &str)]) -> Result<Templates, RenderError> {
    Templates::new(dir, &overrides(pairs))
}

#[test]
fn file_template_replaces_default() {
    let dir = template_dir(&[("nodes/xp.html", "<p>{{ from }}-{{ to }}</p>\n")]);
    let templates = build(Some(dir.path()), &[]).unwrap();
    assert_eq!(
        render(&templates, "xp from=1 to=2\n"),
        r#"<div class="ivm-mechanics"><p>1-2</p></div>"#
    );
}

#[test]
fn override_beats_file() {
    let dir = template_dir(&[("nodes/xp.html", "<p>file</p>")]);
    let templates = build(Some(dir.path()), &[("xp", "<b>{{ to }}</b>")]).unwrap();
    assert_eq!(
        render(&templates, "xp from=1 to=2\n"),
        r#"<div class="ivm-mechanics"><b>2</b></div>"#
    );
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let dir = template_dir(&[("blocks/mechanics.html", "<aside>{{ content }}</aside>")]);
    let templates = build(Some(dir.path()), &[]).unwrap();
    assert_eq!(
        render(&templates, "xp from=1 to=2\n"),
        r#"<aside><div class="ivm-xp">XP: 1 → 2 (+1)</div></aside>"#
    );
}

#[test]
fn nonexistent_directory_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let templates = build(Some(&missing), &[]).unwrap();
    assert_eq!(
        render(&templates, "xp from=1 to=2\n"),
        r#"<div class="ivm-mechanics"><div class="ivm-xp">XP: 1 → 2 (+1)</div></div>"#
    );
}

#[test]
fn empty_file_suppresses() {
    let dir = template_dir(&[("nodes/xp.html", "")]);
    let templates = build(Some(dir.path()), &[]).unwrap();
    assert!(templates.is_suppressed(TemplateKey::Node(NodeKind::Xp)));
    assert_eq!(
        render(&templates, "xp from=1 to=2\n"),
        r#"<div class="ivm-mechanics"></div>"#
    );
}

#[test]
fn non_empty_override_wins_over_empty_file() {
    let dir = template_dir(&[("nodes/xp.html", "")]);
    let templates = build(Some(dir.path()), &[("xp", "x")]).unwrap();
    assert!(!templates.is_suppressed(TemplateKey::Node(NodeKind::Xp)));
}

#[test]
fn link_template_from_file() {
    let dir = template_dir(&[("link.html", "<a href=\"{{ reference }}\">{{ label }}</a>")]);
    let templates = build(Some(dir.path()), &[]).unwrap();
    let link = ivm::link::Link::new("Vows/Rescue", None, Some("Rescue")).unwrap();
    assert_eq!(
        templates.render(TemplateKey::Link, &link).unwrap(),
        r#"<a href="Vows/Rescue">Rescue</a>"#
    );
}

#[test]
fn unknown_override_key_is_rejected() {
    let err = build(None, &[("bogus", "<p></p>")]).unwrap_err();
    assert!(matches!(err, RenderError::UnknownOverride(ref key) if key == "bogus"));
}

#[test]
fn compile_error_is_fatal() {
    let err = build(None, &[("xp", "{% if %}")]).unwrap_err();
    match err {
        RenderError::TemplateCompile { name, .. } => assert_eq!(name, "nodes/xp.html"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn compile_error_in_file_is_fatal() {
    let dir = template_dir(&[("blocks/move.html", "{{ content ")]);
    let err = build(Some(dir.path()), &[]).unwrap_err();
    assert!(matches!(err, RenderError::TemplateCompile { ref name, .. } if name == "blocks/move.html"));
}

#[test]
fn render_error_is_fatal() {
    let templates = build(None, &[("xp", "{{ nothing.here }}")]).unwrap();
    let result = Renderer::new(&templates).render_document(&ivm::parser::parse("xp from=1 to=2\n"));
    assert!(matches!(result, Err(RenderError::Render { ref name, .. }) if name == "nodes/xp.html"));
}

#[test]
fn unreadable_template_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("nodes/xp.html")).unwrap();
    let err = build(Some(dir.path()), &[]).unwrap_err();
    assert!(matches!(err, RenderError::TemplateRead { .. }));
}
