// JSON layout-dump extractor
//
// Reads grids that an OCR/layout service already produced. Field names follow
// the engine's model; the Azure Document Intelligence spellings (row_index,
// column_index, column_span, column_count, page_number, bounding_regions) are
// accepted as well so raw service dumps load unchanged.

use std::path::Path;

use gridrecon::model::{Cell, Extraction, Grid, PageConfidence};
use gridrecon::source::Document;
use gridrecon::{Extractor, ReconError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LayoutFile {
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    pages: Vec<LayoutPage>,
    #[serde(default)]
    tables: Vec<LayoutTable>,
}

#[derive(Debug, Deserialize)]
struct LayoutPage {
    #[serde(alias = "page_number")]
    page: usize,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LayoutTable {
    #[serde(default, alias = "page_number")]
    page: Option<usize>,
    #[serde(default)]
    bounding_regions: Vec<BoundingRegion>,
    row_count: usize,
    #[serde(alias = "col_count")]
    column_count: usize,
    #[serde(default)]
    cells: Vec<LayoutCell>,
}

#[derive(Debug, Deserialize)]
struct BoundingRegion {
    page_number: usize,
}

#[derive(Debug, Deserialize)]
struct LayoutCell {
    #[serde(alias = "row_index")]
    row: usize,
    #[serde(alias = "column_index")]
    col: usize,
    #[serde(default = "one")]
    row_span: usize,
    #[serde(default = "one", alias = "column_span")]
    col_span: usize,
    #[serde(default)]
    content: Option<String>,
}

fn one() -> usize {
    1
}

impl LayoutTable {
    /// Explicit page, else the first bounding region, else page 1.
    fn page(&self) -> usize {
        self.page
            .or_else(|| self.bounding_regions.first().map(|b| b.page_number))
            .unwrap_or(1)
    }
}

/// Extractor over layout dumps on disk. The document's path names the dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutExtractor;

impl LayoutExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parse a layout dump. Malformed JSON or grids that break the cell
    /// invariants are extraction failures.
    pub fn parse(document: &str, json: &str) -> Result<Extraction, ReconError> {
        let fail = |message: String| ReconError::Extraction {
            document: document.to_string(),
            message,
        };

        let file: LayoutFile = serde_json::from_str(json).map_err(|e| fail(format!("invalid layout JSON: {e}")))?;

        let mut grids = Vec::with_capacity(file.tables.len());
        for (i, table) in file.tables.into_iter().enumerate() {
            let page = table.page();
            let cells = table
                .cells
                .into_iter()
                .map(|c| Cell {
                    row: c.row,
                    col: c.col,
                    row_span: c.row_span,
                    col_span: c.col_span,
                    content: c.content,
                })
                .collect();
            let grid = Grid::new(page, table.row_count, table.column_count, cells)
                .map_err(|e| fail(format!("table {i}: {e}")))?;
            grids.push(grid);
        }

        let page_confidence = file
            .pages
            .iter()
            .filter_map(|p| {
                p.confidence.map(|confidence| PageConfidence {
                    page: p.page,
                    confidence,
                })
            })
            .collect();

        log::debug!("layout '{document}': {} table(s)", grids.len());
        Ok(Extraction {
            grids,
            confidence: file.confidence,
            page_confidence,
            document_id: file.document_id,
        })
    }

    pub fn load(path: &Path) -> Result<Extraction, ReconError> {
        let name = crate::display_name(path);
        let json = std::fs::read_to_string(path).map_err(|e| ReconError::Extraction {
            document: name.clone(),
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::parse(&name, &json)
    }
}

impl Extractor for LayoutExtractor {
    fn extract(&self, document: &Document) -> Result<Extraction, ReconError> {
        match &document.path {
            Some(path) => Self::load(path),
            None => Err(ReconError::Extraction {
                document: document.name.clone(),
                message: "layout extractor needs a file path".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const NATIVE: &str = r#"{
        "document_id": "019283",
        "confidence": 0.93,
        "pages": [{"page": 1, "confidence": 0.95}, {"page": 2}],
        "tables": [{
            "page": 1,
            "row_count": 2,
            "column_count": 3,
            "cells": [
                {"row": 0, "col": 0, "content": "Dia"},
                {"row": 0, "col": 1, "col_span": 2, "content": "Lanche"},
                {"row": 1, "col": 0, "content": "1"}
            ]
        }]
    }"#;

    const AZURE: &str = r#"{
        "tables": [{
            "bounding_regions": [{"page_number": 2, "polygon": [0, 0, 1, 1]}],
            "row_count": 1,
            "column_count": 2,
            "cells": [
                {"kind": "content", "row_index": 0, "column_index": 0, "column_span": 2, "content": ":selected:"}
            ]
        }]
    }"#;

    #[test]
    fn parse_native_dump() {
        let ex = LayoutExtractor::parse("scan", NATIVE).unwrap();
        assert_eq!(ex.document_id.as_deref(), Some("019283"));
        assert_eq!(ex.confidence, Some(0.93));
        assert_eq!(ex.page_confidence, vec![PageConfidence { page: 1, confidence: 0.95 }]);

        let g = &ex.grids[0];
        assert_eq!((g.page(), g.row_count(), g.col_count()), (1, 2, 3));
        assert_eq!(g.covering(0, 2).unwrap().content.as_deref(), Some("Lanche"));
    }

    #[test]
    fn parse_azure_spellings() {
        let ex = LayoutExtractor::parse("scan", AZURE).unwrap();
        let g = &ex.grids[0];
        assert_eq!(g.page(), 2);
        assert_eq!(g.cell_at(0, 0).unwrap().col_span, 2);
        assert_eq!(ex.confidence, None);
    }

    #[test]
    fn malformed_grid_is_an_extraction_error() {
        let bad = r#"{"tables": [{"row_count": 1, "column_count": 1,
            "cells": [{"row": 0, "col": 0}, {"row": 0, "col": 0}]}]}"#;
        let err = LayoutExtractor::parse("scan", bad).unwrap_err();
        assert!(matches!(err, ReconError::Extraction { .. }));
        assert!(err.to_string().contains("table 0"));

        assert!(LayoutExtractor::parse("scan", "not json").is_err());
    }

    #[test]
    fn span_past_the_table_edge_is_an_extraction_error() {
        let bad = r#"{"tables": [{"row_count": 2, "column_count": 4, "cells": [
            {"row": 0, "col": 0, "content": "Dia"},
            {"row": 0, "col": 1, "col_span": 18446744073709551615, "content": "Lanche"},
            {"row": 1, "col": 0, "content": "1"}
        ]}]}"#;
        let err = LayoutExtractor::parse("scan", bad).unwrap_err();
        assert!(matches!(err, ReconError::Extraction { .. }));
        assert!(err.to_string().contains("past the edge"));
    }

    #[test]
    fn extract_reads_document_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.json");
        fs::write(&path, NATIVE).unwrap();

        let ex = LayoutExtractor::new().extract(&Document::from_path(&path)).unwrap();
        assert_eq!(ex.grids.len(), 1);

        let err = LayoutExtractor::new().extract(&Document::named("memo")).unwrap_err();
        assert!(err.to_string().contains("needs a file path"));
    }
}
