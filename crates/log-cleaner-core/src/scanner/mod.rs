mod locate;

pub use locate::locate_files;

use crate::error::Error;
use glob::{MatchOptions, Pattern};

/// Name pattern for archives written by earlier runs.
pub const ARCHIVE_PATTERN: &str = "*.zip";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled set of file-name globs. A name matches if any pattern matches it.
#[derive(Debug, Clone)]
pub struct NamePatterns {
    patterns: Vec<Pattern>,
}

impl NamePatterns {
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self, Error> {
        let patterns = globs
            .iter()
            .map(|glob| {
                Pattern::new(glob.as_ref()).map_err(|source| Error::Pattern {
                    pattern: glob.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn archives() -> Result<Self, Error> {
        Self::new(&[ARCHIVE_PATTERN])
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(file_name, MATCH_OPTIONS))
    }
}
