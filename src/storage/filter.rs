use crate::config::StorageConfig;
use crate::error::Result;
use regex::Regex;
use std::path::Path;

/// Decides which files in a storage folder are listed as reports.
pub struct ListingFilter {
    extensions: Vec<String>,
    pattern: Option<Regex>,
}

impl ListingFilter {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: Option<&str>) -> Result<Self> {
        self.pattern = pattern.map(Regex::new).transpose()?;
        Ok(self)
    }

    pub fn is_report_file(&self, path: &Path) -> bool {
        let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
            return false;
        };

        // Partial uploads and editor lock files
        if filename.starts_with('.') || filename.starts_with("~$") {
            return false;
        }

        if !self.extensions.is_empty() {
            let matches_extension = path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()));
            if !matches_extension {
                return false;
            }
        }

        match &self.pattern {
            Some(pattern) => pattern.is_match(filename),
            None => true,
        }
    }
}
