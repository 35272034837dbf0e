//! Highlight annotations collected while revealing a document

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentError, Page, Rect};
use crate::stepper::RevealUpdate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRecord {
    pub page: usize,
    pub line: usize,
    pub text: String,
    pub rects: Vec<Rect>,
}

/// Every highlight painted so far, in reveal order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSheet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub highlights: Vec<HighlightRecord>,
}

impl AnnotationSheet {
    pub fn new(source: Option<&Path>) -> Self {
        Self {
            source: source.map(Path::to_path_buf),
            created_at: Utc::now(),
            highlights: Vec::new(),
        }
    }

    /// Record the lines of `update` found on `page`.
    ///
    /// Lines the page cannot locate are still recorded, with no rects, so the
    /// sheet keeps a complete account of what was revealed.
    pub fn record<P: Page>(&mut self, update: &RevealUpdate, page: &P) {
        for line in update.revealed.clone() {
            let Some(text) = page.lines().get(line) else {
                continue;
            };
            let rects: Vec<Rect> = page
                .find_bounding_boxes(text)
                .into_iter()
                .filter(|rect| !rect.is_empty())
                .collect();
            if rects.is_empty() {
                debug!("No bounding boxes for line {line} on page {}", update.page_index);
            }
            self.highlights.push(HighlightRecord {
                page: update.page_index,
                line,
                text: text.clone(),
                rects,
            });
        }
    }

    pub fn clear(&mut self) {
        self.highlights.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    /// Highlight rects grouped by page
    #[must_use]
    pub fn rects_by_page(&self) -> BTreeMap<usize, Vec<Rect>> {
        let mut pages: BTreeMap<usize, Vec<Rect>> = BTreeMap::new();
        for record in &self.highlights {
            pages
                .entry(record.page)
                .or_default()
                .extend(record.rects.iter().copied());
        }
        pages
    }

    /// Line indices highlighted on `page`
    pub fn lines_on_page(&self, page: usize) -> impl Iterator<Item = usize> + '_ {
        self.highlights
            .iter()
            .filter(move |record| record.page == page)
            .map(|record| record.line)
    }

    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let persist_err = |detail: String| DocumentError::Persist {
            path: path.to_path_buf(),
            detail,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| persist_err(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| persist_err(e.to_string()))?;
        fs::write(path, content).map_err(|e| persist_err(e.to_string()))?;

        info!(
            "Saved {} highlights to {}",
            self.highlights.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
