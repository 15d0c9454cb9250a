//! Row-oriented JSON staging of track collections
//!
//! A staged file is a JSON array of objects. `title` and `artist` are
//! required; `id`, the eight feature columns and `label` are optional.
//! Columns are matched by name, so key order in a row is irrelevant.

use crate::models::{FeatureColumn, FeatureSet, MoodLabel, Track};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed staging JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Row {row} is missing required column '{column}'")]
    MissingColumn { row: usize, column: &'static str },

    #[error("Row {row} has invalid value for '{column}': {detail}")]
    InvalidValue {
        row: usize,
        column: String,
        detail: String,
    },
}

const ID_COLUMN: &str = "id";
const LABEL_COLUMN: &str = "label";

/// Parse staged rows; `position` follows row order
pub fn parse_tracks(json: &str) -> Result<Vec<Track>, StagingError> {
    let rows: Vec<Map<String, Value>> = serde_json::from_str(json)?;
    rows.iter()
        .enumerate()
        .map(|(row, fields)| parse_row(row, fields))
        .collect()
}

pub fn load_tracks(path: &Path) -> Result<Vec<Track>, StagingError> {
    let contents = fs::read_to_string(path).map_err(|source| StagingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tracks = parse_tracks(&contents)?;
    tracing::debug!(path = %path.display(), tracks = tracks.len(), "Loaded staged tracks");
    Ok(tracks)
}

/// Serialise tracks to staged rows
pub fn to_rows(tracks: &[Track]) -> Vec<Value> {
    tracks
        .iter()
        .map(|track| {
            let mut row = Map::new();
            row.insert("title".to_string(), Value::from(track.title.clone()));
            row.insert("artist".to_string(), Value::from(track.artist.clone()));
            if let Some(id) = &track.external_id {
                row.insert(ID_COLUMN.to_string(), Value::from(id.clone()));
            }
            if let Some(features) = &track.features {
                for column in FeatureColumn::ALL {
                    if let Some(value) = features.get(column) {
                        row.insert(column.name().to_string(), Value::from(value));
                    }
                }
            }
            if let Some(label) = track.mood {
                row.insert(LABEL_COLUMN.to_string(), Value::from(label.index()));
            }
            Value::Object(row)
        })
        .collect()
}

/// Write tracks atomically (temp file then rename)
pub fn save_tracks(path: &Path, tracks: &[Track]) -> Result<(), StagingError> {
    let json = serde_json::to_string_pretty(&Value::Array(to_rows(tracks)))?;
    let io_err = |source: std::io::Error| StagingError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, json).map_err(io_err)?;
    fs::rename(&temp_path, path).map_err(io_err)?;

    tracing::debug!(path = %path.display(), tracks = tracks.len(), "Saved staged tracks");
    Ok(())
}

fn parse_row(row: usize, fields: &Map<String, Value>) -> Result<Track, StagingError> {
    let title = required_str(row, fields, "title")?;
    let artist = required_str(row, fields, "artist")?;
    let mut track = Track::new(row, title, artist);

    match fields.get(ID_COLUMN) {
        None | Some(Value::Null) => {}
        Some(Value::String(id)) if !id.trim().is_empty() => track.external_id = Some(id.trim().to_string()),
        Some(Value::String(_)) => {}
        Some(other) => return Err(invalid(row, ID_COLUMN, format!("expected string, got {}", other))),
    }

    let mut features = FeatureSet::new();
    for column in FeatureColumn::ALL {
        match fields.get(column.name()) {
            None | Some(Value::Null) => {}
            Some(value) => {
                let number = value
                    .as_f64()
                    .ok_or_else(|| invalid(row, column.name(), format!("expected number, got {}", value)))?;
                features.insert(column, number);
            }
        }
    }
    if !features.is_empty() {
        track.features = Some(features);
    }

    match fields.get(LABEL_COLUMN) {
        None | Some(Value::Null) => {}
        Some(value) => {
            let raw = value
                .as_i64()
                .ok_or_else(|| invalid(row, LABEL_COLUMN, format!("expected integer, got {}", value)))?;
            let label = MoodLabel::try_from(raw).map_err(|e| invalid(row, LABEL_COLUMN, e.to_string()))?;
            track.mood = Some(label);
        }
    }

    Ok(track)
}

fn required_str(row: usize, fields: &Map<String, Value>, column: &'static str) -> Result<String, StagingError> {
    match fields.get(column) {
        Some(Value::String(value)) => Ok(value.clone()),
        None | Some(Value::Null) => Err(StagingError::MissingColumn { row, column }),
        Some(other) => Err(invalid(row, column, format!("expected string, got {}", other))),
    }
}

fn invalid(row: usize, column: &str, detail: String) -> StagingError {
    StagingError::InvalidValue {
        row,
        column: column.to_string(),
        detail,
    }
}
