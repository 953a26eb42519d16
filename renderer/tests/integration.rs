use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use renderer::{Renderer, Templates};

fn render_with(templates: &Templates, fence: &str) -> String {
    let document = ivm::parser::parse(fence);
    Renderer::new(templates)
        .render_document(&document)
        .expect("render failed")
}

fn render(fence: &str) -> String {
    render_with(&Templates::builtin().expect("builtin templates"), fence)
}

fn with_overrides(pairs: &[(&str, &str)]) -> Templates {
    let overrides: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Templates::new(None, &overrides).expect("templates failed")
}

fn wrap(inner: &str) -> String {
    format!(r#"<div class="ivm-mechanics">{inner}</div>"#)
}

const FACE_DANGER: &str = r#"move "[Face Danger](datasworn:move:starforged/adventure/face_danger)" {"#;

#[test]
fn single_node() {
    assert_eq!(
        render("xp from=2 to=4\n"),
        wrap(r#"<div class="ivm-xp">XP: 2 → 4 (+2)</div>"#)
    );
}

#[test]
fn empty_fence_renders_wrapper_only() {
    assert_eq!(render(""), wrap(""));
}

#[test]
fn nodes_render_in_document_order() {
    let html = render("rolls 3 5 dice=\"1d10\"\nimpact \"Wounded\" true\nposition from=\"in control\" to=\"in a bad spot\"\n");
    assert_eq!(
        html,
        wrap(concat!(
            r#"<div class="ivm-rolls">Rolled 1d10: 3, 5</div>"#,
            r#"<div class="ivm-impact ivm-impact-marked">Wounded: marked</div>"#,
            r#"<div class="ivm-position ivm-position-badspot">Position: in control → in a bad spot</div>"#,
        ))
    );
}

#[test]
fn strong_hit_move() {
    let fence = format!(
        "{FACE_DANGER}\n  roll action=\"Face Danger\" stat=iron adds=1 vs1=4 vs2=7 total=9\n}}\n"
    );
    assert_eq!(
        render(&fence),
        wrap(concat!(
            r#"<div class="ivm-move ivm-move-result-strong">"#,
            r#"<div class="ivm-move-name">Face Danger</div>"#,
            r#"<div class="ivm-roll ivm-roll-strong">Roll for Face Danger +iron: 9 vs 4 | 7</div>"#,
            r#"<div class="ivm-roll-result ivm-roll-result-strong">Strong hit: 9 vs 4 | 7</div>"#,
            "</div>",
        ))
    );
}

#[test]
fn burned_move() {
    let fence = format!(
        "{FACE_DANGER}\n  roll action=\"Face Danger\" stat=iron adds=1 vs1=4 vs2=7 total=9\n  burn newtotal=5\n}}\n"
    );
    assert_eq!(
        render(&fence),
        wrap(concat!(
            r#"<div class="ivm-move ivm-move-result-weak ivm-move-result-burned">"#,
            r#"<div class="ivm-move-name">Face Danger</div>"#,
            r#"<div class="ivm-roll ivm-roll-strong">Roll for Face Danger +iron: 9 vs 4 | 7</div>"#,
            r#"<div class="ivm-burn ivm-roll-weak">Burn momentum: 9 → 5</div>"#,
            r#"<div class="ivm-roll-result ivm-roll-result-weak">Weak hit: 5 vs 4 | 7 (momentum burned)</div>"#,
            "</div>",
        ))
    );
}

#[test]
fn dedicated_roll_shows_its_sum() {
    let html = render("roll \"Iron\" action=4 adds=1 stat=3 vs1=9 vs2=9\n");
    assert_eq!(
        html,
        wrap(r#"<div class="ivm-roll ivm-roll-miss ivm-roll-match">Roll +Iron: 4 + 3 + 1 = 8 vs 9 | 9</div>"#)
    );
}

#[test]
fn roll_sum_defaults_missing_adds() {
    assert_eq!(
        render("roll action=4 stat=2 vs1=1 vs2=9\n"),
        wrap(r#"<div class="ivm-roll ivm-roll-weak">Roll: 4 + 2 + 0 = 6 vs 1 | 9</div>"#)
    );
}

#[test]
fn roll_sum_needs_a_numeric_stat() {
    assert_eq!(
        render("roll action=4 stat=iron vs1=1 vs2=9 total=6\n"),
        wrap(r#"<div class="ivm-roll ivm-roll-weak">Roll +iron: 6 vs 1 | 9</div>"#)
    );
}

#[test]
fn move_without_roll_has_no_outcome_classes() {
    let fence = format!("{FACE_DANGER}\n  progress track=Find the Relic delta=2\n}}\n");
    let html = render(&fence);
    assert!(
        html.starts_with(concat!(
            r#"<div class="ivm-mechanics"><div class="ivm-move">"#,
            r#"<div class="ivm-move-name">Face Danger</div>"#,
            r#"<div class="ivm-progress">Progress on Find the Relic: "#,
        )),
        "{html}"
    );
    assert!(html.ends_with("boxes</div></div></div>"), "{html}");
    assert!(!html.contains("ivm-move-result"));
    assert!(!html.contains("ivm-roll-result"));
}

#[test]
fn nested_blocks() {
    let fence = r#"actor name="[[Characters/Kira|Kira]]" {
  oracle-group name="Character" {
    oracle name="First Look" result="Scarred" roll=44
  }
  meter "Health" from=5 to=4
}
"#;
    assert_eq!(
        render(fence),
        wrap(concat!(
            r#"<div class="ivm-actor"><div class="ivm-actor-name">Kira</div>"#,
            r#"<div class="ivm-oracle-group"><div class="ivm-oracle-group-name">Character</div>"#,
            r#"<div class="ivm-oracle">First Look: Scarred (44)</div>"#,
            "</div>",
            r#"<div class="ivm-meter ivm-meter-decrease">Health: 5 → 4</div>"#,
            "</div>",
        ))
    );
}

#[test]
fn prompted_oracle() {
    let html = render("- \"Is it locked?\" {\n  oracle name=\"Yes/No\" result=\"Yes\" roll=12\n}\n");
    assert_eq!(
        html,
        wrap(concat!(
            r#"<div class="ivm-oracle-prompt"><div class="ivm-oracle-prompt-text">Is it locked?</div>"#,
            r#"<div class="ivm-oracle">Yes/No: Yes (12)</div>"#,
            "</div>",
        ))
    );
}

#[test]
fn multiline_comment_keeps_line_breaks() {
    assert_eq!(
        render("- \"first\nsecond\"\n"),
        wrap(r#"<div class="ivm-ooc">first<br>second</div>"#)
    );
}

#[test]
fn field_values_are_escaped() {
    assert_eq!(
        render(r#"- "a <b> & \"c\" / d's""#),
        wrap(r#"<div class="ivm-ooc">a &lt;b&gt; &amp; &quot;c&quot; / d's</div>"#)
    );
}

#[test]
fn unmatched_node_uses_fallback_template() {
    assert_eq!(
        render("roll nonsense\n"),
        wrap(r#"<div class="ivm-node ivm-node-roll">roll nonsense</div>"#)
    );
}

#[test]
fn unmatched_block_uses_fallback_template() {
    assert_eq!(
        render("- no quotes {\n  xp from=1 to=2\n}\n"),
        wrap(concat!(
            r#"<div class="ivm-block ivm-block-oracle_prompt"><div class="ivm-unparsed">- no quotes</div>"#,
            r#"<div class="ivm-xp">XP: 1 → 2 (+1)</div>"#,
            "</div>",
        ))
    );
}

#[test]
fn unknown_lines_render_nothing() {
    assert_eq!(
        render("xp from=1 to=2\nfoo bar=1\n"),
        wrap(r#"<div class="ivm-xp">XP: 1 → 2 (+1)</div>"#)
    );
}

#[test]
fn rendering_is_idempotent() {
    let templates = Templates::builtin().expect("builtin templates");
    let fence = format!(
        "{FACE_DANGER}\n  roll \"Edge\" action=2 adds=0 stat=2 vs1=6 vs2=3\n  reroll action=\"6\"\n}}\n"
    );
    let first = render_with(&templates, &fence);
    let second = render_with(&templates, &fence);
    assert_eq!(first, second);
    assert!(first.contains("ivm-move-result-strong ivm-move-result-rerolled"));
    assert!(first.contains(r#"<div class="ivm-reroll ivm-roll-strong">Reroll action: 2 → 6</div>"#));
}

// ---------------------------------------------------------------------------
// Suppression
// ---------------------------------------------------------------------------

#[test]
fn empty_node_template_hides_only_that_kind() {
    let templates = with_overrides(&[("xp", "")]);
    assert_eq!(
        render_with(&templates, "xp from=1 to=2\nmeter \"Health\" from=5 to=3\nxp from=2 to=3\n"),
        wrap(r#"<div class="ivm-meter ivm-meter-decrease">Health: 5 → 3</div>"#)
    );
}

#[test]
fn empty_block_template_hides_the_subtree() {
    let templates = with_overrides(&[("move_block", "")]);
    let fence = format!(
        "{FACE_DANGER}\n  roll \"Iron\" action=4 adds=1 stat=3 vs1=2 vs2=9\n}}\nxp from=1 to=2\n"
    );
    assert_eq!(
        render_with(&templates, &fence),
        wrap(r#"<div class="ivm-xp">XP: 1 → 2 (+1)</div>"#)
    );
}

#[test]
fn empty_leaf_inside_block_keeps_the_block() {
    let templates = with_overrides(&[("roll", ""), ("roll_result", "")]);
    let fence = format!("{FACE_DANGER}\n  roll \"Iron\" action=4 adds=1 stat=3 vs1=2 vs2=9\n}}\n");
    assert_eq!(
        render_with(&templates, &fence),
        wrap(concat!(
            r#"<div class="ivm-move ivm-move-result-weak">"#,
            r#"<div class="ivm-move-name">Face Danger</div>"#,
            "</div>",
        ))
    );
}

#[test]
fn empty_mechanics_template_hides_everything() {
    let templates = with_overrides(&[("mechanics_block", "")]);
    assert_eq!(render_with(&templates, "xp from=1 to=2\n"), "");
}

#[test]
fn whitespace_only_template_counts_as_empty() {
    let templates = with_overrides(&[("xp", "  \n")]);
    assert_eq!(render_with(&templates, "xp from=1 to=2\n"), wrap(""));
}

#[test]
fn override_sees_outcome_and_extra_fields() {
    let templates = with_overrides(&[
        ("move_block", "<section data-result=\"{{ outcome.hitmiss }}\">{{ content }}</section>"),
        ("track", "<p>{{ name }} {{ extra.color }}</p>"),
    ]);
    let fence = "move {\nroll \"Iron\" action=6 adds=0 stat=3 vs1=2 vs2=3\ntrack name=\"Rescue\" color=red\n}\n";
    let html = render_with(&templates, fence);
    assert!(html.contains(r#"<section data-result="strong">"#), "{html}");
    assert!(html.contains("<p>Rescue red</p>"), "{html}");
}
