//! Tolerant parser for the delimited location dataset.
//!
//! The dataset is a text payload containing zero or more named blocks.
//! A block's name follows the `<string-array name="` marker and ends at the
//! next quote; each block holds `<item>…</item>` records of the form
//! `latitude,longitude[,title[,url]]`.
//!
//! The payload may contain unrelated blocks, so parsing is deliberately
//! tolerant: blocks without a name terminator or without a single
//! well-formed record are skipped silently, and a malformed record is
//! dropped without failing its block. Do not tighten this into a
//! schema-validating parser; the tolerance is load-bearing.
//!
//! A parse therefore never fails. The only reportable error is a source
//! that cannot be read at all ([`DatasetError::Unreadable`]), and even that
//! is non-fatal to callers: the registry is simply left untouched.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::area::PointOfInterest;
use crate::geo::Coordinate;

/// Marker introducing a named block.
const BLOCK_NAME_MARKER: &str = "<string-array name=\"";
/// Marker opening a location record.
const ITEM_START: &str = "<item>";
/// Marker closing a location record.
const ITEM_END: &str = "</item>";

/// Errors that can occur when loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset source is missing or unreadable.
    #[error("Dataset source unreadable: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// A parsed dataset: area names with their points, in payload order.
pub type ParsedDataset = Vec<(String, Vec<PointOfInterest>)>;

/// Read a dataset file and parse it.
///
/// # Errors
///
/// Returns [`DatasetError::Unreadable`] when the file is missing or cannot
/// be read. An unreadable dataset is "no data", not a fatal condition.
pub fn load_file(path: &Path) -> Result<ParsedDataset, DatasetError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(parse(&raw))
}

/// Parse a raw dataset payload into named areas.
///
/// Absence of any named block is not an error; it yields an empty dataset.
pub fn parse(raw: &str) -> ParsedDataset {
    let mut dataset = ParsedDataset::new();

    let mut blocks = raw.split(BLOCK_NAME_MARKER);
    // Content before the first marker is not a block.
    blocks.next();

    for block in blocks {
        // A block without a name terminator is skipped silently.
        let Some((name, body)) = block.split_once('"') else {
            continue;
        };

        let mut points = Vec::new();
        let mut items = body.split(ITEM_START);
        items.next();
        for item in items {
            let Some((record, _)) = item.split_once(ITEM_END) else {
                continue;
            };
            match parse_record(record) {
                Some(point) => points.push(point),
                None => {
                    debug!(area = name, record, "Skipping malformed location record");
                }
            }
        }

        // Blocks with zero well-formed records are unrelated; skip them.
        if points.is_empty() {
            continue;
        }

        dataset.push((name.to_string(), points));
    }

    dataset
}

/// Parse one `latitude,longitude[,title[,url]]` record.
///
/// Latitude and longitude are mandatory and must be finite, in-range
/// numbers. Title and url default to empty strings when absent. Returns
/// `None` for a malformed record.
fn parse_record(record: &str) -> Option<PointOfInterest> {
    let mut fields = record.split(',');

    let latitude: f64 = fields.next()?.trim().parse().ok()?;
    let longitude: f64 = fields.next()?.trim().parse().ok()?;
    let coordinate = Coordinate::new(latitude, longitude).ok()?;

    let title = fields.next().unwrap_or("");
    let url = fields.next().unwrap_or("");
    Some(PointOfInterest::new(coordinate, title, url))
}
