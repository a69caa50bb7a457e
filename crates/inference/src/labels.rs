use crate::error::ClassifierError;
use std::fs;
use std::path::Path;

/// Ordered class names, index-aligned with the model output vector.
///
/// Built once at startup and immutable afterwards. The length is not
/// validated against the model's output dimension; a predicted index
/// beyond the table surfaces as the "Unknown" sentinel at inference
/// time instead.
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ClassifierError::Config(format!("failed to read label file {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    /// Parse newline-delimited labels. A leading integer index token
    /// ("0 Plastic Bottle") is stripped; blank lines are discarded.
    pub fn parse(raw: &str) -> Result<Self, ClassifierError> {
        let labels: Vec<String> = raw.lines().filter_map(parse_line).collect();

        if labels.is_empty() {
            return Err(ClassifierError::Config(
                "label file contains no labels".to_string(),
            ));
        }

        Ok(Self { labels })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

fn parse_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match line.split_once(char::is_whitespace) {
        Some((index, rest)) if index.parse::<u32>().is_ok() => {
            let rest = rest.trim();
            (!rest.is_empty()).then(|| rest.to_string())
        }
        _ => Some(line.to_string()),
    }
}
