use tracing::trace;

use crate::node::{FieldValue, Fields};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// One whitespace-separated piece of a parameter list.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// `key=value`, with the value as written (quotes included).
    Pair { key: String, value: String },
    /// Anything without an `=`: a bare word or a quoted string.
    Bare(String),
}

/// Split a parameter list into tokens. Quoted strings keep their spaces and
/// may contain `\"`. An unterminated quote runs to the end of the input.
pub fn tokenize(input: &str) -> Vec<Param> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '"' {
            let start = i;
            i = skip_quoted(&chars, i);
            tokens.push(Param::Bare(chars[start..i].iter().collect()));
            continue;
        }

        let start = i;
        while i < len && is_key_char(chars[i]) {
            i += 1;
        }

        if i > start && i < len && chars[i] == '=' {
            let key: String = chars[start..i].iter().collect();
            i += 1;
            let value_start = i;
            if i < len && chars[i] == '"' {
                i = skip_quoted(&chars, i);
            } else {
                while i < len && !chars[i].is_whitespace() {
                    i += 1;
                }
            }
            let value: String = chars[value_start..i].iter().collect();
            tokens.push(Param::Pair { key, value });
        } else {
            while i < len && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Param::Bare(chars[start..i].iter().collect()));
        }
    }

    tokens
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Return the index just past the closing quote of the string starting at `open`.
fn skip_quoted(chars: &[char], open: usize) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

// ---------------------------------------------------------------------------
// Generic key=value clause
// ---------------------------------------------------------------------------

/// Parse a generic `key=value ...` clause into typed fields.
///
/// Bare words directly after an unquoted value continue that value, so
/// `track=Find the Relic delta=2` yields `track = "Find the Relic"`. Other
/// bare tokens are dropped.
pub fn parse_params(input: &str) -> Fields {
    let mut fields = Fields::new();
    let mut open_key: Option<(String, String)> = None;

    for token in tokenize(input) {
        match token {
            Param::Pair { key, value } => {
                flush(&mut fields, open_key.take());
                if value.starts_with('"') {
                    fields.insert(key, FieldValue::from_raw(&value));
                } else {
                    open_key = Some((key, value));
                }
            }
            Param::Bare(word) => match open_key.as_mut() {
                Some((_, value)) if !word.starts_with('"') => {
                    value.push(' ');
                    value.push_str(&word);
                }
                _ => {
                    flush(&mut fields, open_key.take());
                    trace!(token = %word, "dropping bare token");
                }
            },
        }
    }
    flush(&mut fields, open_key);

    fields
}

fn flush(fields: &mut Fields, pending: Option<(String, String)>) {
    if let Some((key, value)) = pending {
        fields.insert(key, FieldValue::from_raw(&value));
    }
}

/// Split `fields` into the ones named in `known` and the rest.
pub fn partition(fields: Fields, known: &[&str]) -> (Fields, Fields) {
    let mut matched = Fields::new();
    let mut extra = Fields::new();
    for (key, value) in fields.iter() {
        if known.contains(&key) {
            matched.insert(key, value.clone());
        } else {
            extra.insert(key, value.clone());
        }
    }
    (matched, extra)
}
