use anyhow::{Context, Result};
use regex::Regex;

/// Record-name matcher where `*` stands for any run of characters and
/// everything else is literal. Matching is always against the whole name.
#[derive(Debug, Clone)]
pub struct RecordPattern {
    regex: Regex,
}

impl RecordPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&format!("^{}$", body))
            .with_context(|| format!("Invalid record name pattern: {}", pattern))?;

        Ok(Self { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}
