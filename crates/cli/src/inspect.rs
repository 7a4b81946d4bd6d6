//! `gridrecon inspect`: list the grids in a layout dump.

use std::path::PathBuf;

use gridrecon::model::Grid;
use gridrecon_io::LayoutExtractor;
use serde_json::json;

use crate::exit_codes::EXIT_RECON_RUNTIME;
use crate::CliError;

/// Characters of the first non-empty cell shown per grid.
const PREVIEW_CHARS: usize = 32;

fn preview(grid: &Grid) -> String {
    grid.cells()
        .iter()
        .filter_map(|c| c.content.as_deref())
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(|t| t.chars().take(PREVIEW_CHARS).collect())
        .unwrap_or_default()
}

pub fn cmd_inspect(layout: PathBuf, json_output: bool) -> Result<(), CliError> {
    let extraction = LayoutExtractor::load(&layout)?;

    if json_output {
        let grids: Vec<_> = extraction
            .grids
            .iter()
            .enumerate()
            .map(|(i, g)| {
                json!({
                    "index": i,
                    "page": g.page(),
                    "rows": g.row_count(),
                    "cols": g.col_count(),
                    "cells": g.cells().len(),
                    "preview": preview(g),
                })
            })
            .collect();
        let out = json!({
            "document_id": extraction.document_id,
            "confidence": extraction.confidence,
            "grids": grids,
        });
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::new(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    println!("{:>5}  {:>4}  {:>5}  {:>5}  {:>5}  preview", "index", "page", "rows", "cols", "cells");
    for (i, g) in extraction.grids.iter().enumerate() {
        println!(
            "{:>5}  {:>4}  {:>5}  {:>5}  {:>5}  {}",
            i,
            g.page(),
            g.row_count(),
            g.col_count(),
            g.cells().len(),
            preview(g)
        );
    }
    if let Some(ref id) = extraction.document_id {
        eprintln!("document id: {id}");
    }
    if let Some(confidence) = extraction.confidence {
        eprintln!("confidence: {confidence:.3}");
    }
    Ok(())
}
