//! JSON rendering of recovered outlines.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::DocumentOutline;

/// Suffix appended to the input's base name for outline files.
pub const OUTLINE_SUFFIX: &str = "_outline.json";

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert an outline to JSON.
///
/// Non-ASCII text is written as-is, not escaped.
pub fn to_json(outline: &DocumentOutline, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(outline),
        JsonFormat::Compact => serde_json::to_string(outline),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Output file name for an input document: `<basename>_outline.json`.
pub fn outline_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}{}", stem, OUTLINE_SUFFIX)
}

/// Whether `path` looks like an outline written by [`write_outline`].
pub fn is_outline_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(OUTLINE_SUFFIX))
}

/// Write `outline` for `input` into `out_dir`, creating the directory if needed.
///
/// Returns the path written.
pub fn write_outline(
    outline: &DocumentOutline,
    input: &Path,
    out_dir: &Path,
    format: JsonFormat,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(outline_file_name(input));
    let mut json = to_json(outline, format)?;
    json.push('\n');
    fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Level, OutlineEntry};
    use tempfile::TempDir;

    fn outline() -> DocumentOutline {
        DocumentOutline::new(
            "Über Report",
            vec![OutlineEntry::new(Level::H1, "1 Einführung", 0)],
        )
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&outline(), JsonFormat::Pretty).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("  \"title\": \"Über Report\""));
        assert!(json.contains("\"level\": \"H1\""));
        assert!(json.contains("Einführung"));
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&DocumentOutline::new("T", vec![]), JsonFormat::Compact).unwrap();
        assert_eq!(json, r#"{"title":"T","outline":[]}"#);
    }

    #[test]
    fn test_outline_file_name() {
        assert_eq!(outline_file_name(Path::new("in/report.pdf")), "report_outline.json");
        assert_eq!(outline_file_name(Path::new("a.b.json")), "a.b_outline.json");
        assert!(is_outline_file(Path::new("out/report_outline.json")));
        assert!(!is_outline_file(Path::new("out/report.json")));
    }

    #[test]
    fn test_write_outline_creates_dir() {
        let tmp = TempDir::new().unwrap();
        let out_dir = tmp.path().join("nested").join("out");
        let path = write_outline(&outline(), Path::new("doc.pdf"), &out_dir, JsonFormat::Pretty)
            .unwrap();

        assert_eq!(path, out_dir.join("doc_outline.json"));
        let written = fs::read_to_string(&path).unwrap();
        let parsed: DocumentOutline = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, outline());
    }
}
