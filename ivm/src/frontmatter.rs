use serde_yaml::{Mapping, Value};
use thiserror::Error;

pub type Frontmatter = Mapping;

const DELIMITER: &str = "---";

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("front matter is missing its closing `---` delimiter")]
    Unterminated,

    #[error("invalid front matter YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("front matter must be a key/value mapping")]
    NotAMapping,
}

/// A page split into its front matter and the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Split<'a> {
    /// Raw YAML between the delimiters, if the page has front matter.
    pub yaml: Option<&'a str>,
    pub body: &'a str,
    /// Byte offset of `body` within the page.
    pub body_offset: usize,
}

impl Split<'_> {
    /// Parse the YAML part. Pages without front matter yield `None`.
    pub fn parse(&self) -> Result<Option<Frontmatter>, FrontmatterError> {
        let Some(yaml) = self.yaml else {
            return Ok(None);
        };
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(map) => Ok(Some(map)),
            Value::Null => Ok(Some(Mapping::new())),
            _ => Err(FrontmatterError::NotAMapping),
        }
    }
}

/// Split off front matter. It is only recognized when the very first line
/// is `---`; a missing closing delimiter is an error.
pub fn split(source: &str) -> Result<Split<'_>, FrontmatterError> {
    let no_frontmatter = Split {
        yaml: None,
        body: source,
        body_offset: 0,
    };

    let mut lines = source.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == DELIMITER => {}
        _ => return Ok(no_frontmatter),
    }

    let yaml_start = source.find('\n').map_or(source.len(), |i| i + 1);
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let body_offset = offset + line.len();
            return Ok(Split {
                yaml: Some(&source[yaml_start..offset]),
                body: &source[body_offset..],
                body_offset,
            });
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unterminated)
}
