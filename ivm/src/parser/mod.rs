pub mod warning;
mod structural;

pub use warning::ParseWarning;

use crate::MechanicsDocument;

/// Parser entry point for the content of one mechanics fence.
pub struct Parser {
    source: String,
    file_id: usize,
    base_offset: usize,
}

impl Parser {
    pub fn new(source: impl Into<String>, file_id: usize) -> Self {
        Parser {
            source: source.into(),
            file_id,
            base_offset: 0,
        }
    }

    /// Shift all spans by `offset`, for fences embedded in a larger file.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.base_offset = offset;
        self
    }

    /// Parse the fence content. Unrecognized lines are skipped.
    pub fn parse(&self) -> MechanicsDocument {
        self.parse_with_warnings().0
    }

    /// Parse the fence content and report everything that was skipped or repaired.
    pub fn parse_with_warnings(&self) -> (MechanicsDocument, Vec<ParseWarning>) {
        let (entries, warnings) =
            structural::parse_entries(&self.source, self.file_id, self.base_offset);
        let document = MechanicsDocument {
            entries,
            source_id: self.file_id,
        };
        (document, warnings)
    }
}

/// Parse fence content with default settings.
pub fn parse(source: &str) -> MechanicsDocument {
    Parser::new(source, 0).parse()
}
