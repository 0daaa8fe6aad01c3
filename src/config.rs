use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use chrono::NaiveDate;

use crate::{
    caption::{Annotation, DATE_FORMAT},
    error::{MaplapseError, MaplapseResult},
};

/// Persistent settings from `config.json`, complementing the CLI flags.
/// A missing file is created with defaults so there is always something to
/// edit by hand.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Browser profile directory (an authenticated session).
    pub profile: Option<PathBuf>,
    /// Default output directory for the image sequence.
    pub dir: Option<PathBuf>,
    /// Locale identifier for date label parsing, e.g. "en_US" or "pl_PL".
    /// Falls back to the LANG environment when unset.
    pub locale: Option<String>,
    pub font: Option<PathBuf>,
    pub font_size: Option<f32>,
    pub annotation_font: Option<PathBuf>,
    pub annotation_size: Option<f32>,
    /// "text" or "icon"; anything else is a configuration error.
    pub annotations_type: Option<String>,
    /// Directory icon filenames in `annotations` are resolved against.
    pub icon_dir: Option<PathBuf>,
    /// `YYYY-MM-DD` to inline text or icon filename.
    pub annotations: BTreeMap<String, String>,
    pub ffmpeg_arguments: Vec<String>,
    pub ffmpeg_override_arguments: bool,
}

impl Config {
    pub fn load_or_init(path: &Path) -> MaplapseResult<Self> {
        if !path.exists() {
            let text = serde_json::to_string_pretty(&Self::default())
                .context("failed to serialize default config")?;
            std::fs::write(path, text)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("'{}' is not valid config JSON", path.display()))?;
        Ok(config)
    }

    /// Resolve the raw table into typed annotations. Icon filenames are
    /// joined with the configured icon directory; unknown kinds and malformed
    /// date keys fail here rather than mid-run.
    pub fn annotation_table(&self) -> MaplapseResult<Option<HashMap<String, Annotation>>> {
        // The kind is validated even when the table is empty, so a typo in
        // `annotations_type` never sits dormant in the file.
        let kind = self.annotations_type.as_deref().unwrap_or("text");
        if !matches!(kind, "text" | "icon") {
            return Err(MaplapseError::annotation(format!(
                "unsupported annotation kind '{kind}' (expected \"text\" or \"icon\")"
            )));
        }

        if self.annotations.is_empty() {
            return Ok(None);
        }

        let mut table = HashMap::with_capacity(self.annotations.len());
        for (key, value) in &self.annotations {
            NaiveDate::parse_from_str(key, DATE_FORMAT).map_err(|_| {
                MaplapseError::annotation(format!(
                    "annotation key '{key}' is not a YYYY-MM-DD date"
                ))
            })?;
            let annotation = if kind == "text" {
                Annotation::Text(value.clone())
            } else {
                let dir = self.icon_dir.as_deref().unwrap_or(Path::new("emoji"));
                Annotation::Icon(dir.join(value))
            };
            table.insert(key.clone(), annotation);
        }
        Ok(Some(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(kind: Option<&str>) -> Config {
        let mut config = Config {
            annotations_type: kind.map(String::from),
            icon_dir: Some(PathBuf::from("icons")),
            ..Config::default()
        };
        config
            .annotations
            .insert("2021-01-09".to_string(), "plane.png".to_string());
        config
    }

    #[test]
    fn load_or_init_creates_a_default_file() {
        let dir = PathBuf::from("target").join("config_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        let _ = std::fs::remove_file(&path);

        let config = Config::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert!(config.profile.is_none());
        assert!(!config.ffmpeg_override_arguments);

        // A second load round-trips the file it just wrote.
        let again = Config::load_or_init(&path).unwrap();
        assert!(again.annotations.is_empty());
    }

    #[test]
    fn icon_annotations_resolve_against_icon_dir() {
        let table = config_with(Some("icon")).annotation_table().unwrap().unwrap();
        assert_eq!(
            table.get("2021-01-09"),
            Some(&Annotation::Icon(PathBuf::from("icons").join("plane.png")))
        );
    }

    #[test]
    fn text_annotations_keep_the_value_inline() {
        let table = config_with(Some("text")).annotation_table().unwrap().unwrap();
        assert_eq!(
            table.get("2021-01-09"),
            Some(&Annotation::Text("plane.png".to_string()))
        );
    }

    #[test]
    fn unknown_annotation_kind_is_a_config_error() {
        let err = config_with(Some("emoji")).annotation_table().unwrap_err();
        assert!(matches!(err, MaplapseError::Annotation(_)));
    }

    #[test]
    fn malformed_date_key_is_a_config_error() {
        let mut config = config_with(Some("text"));
        config
            .annotations
            .insert("January 9th".to_string(), "x".to_string());
        let err = config.annotation_table().unwrap_err();
        assert!(matches!(err, MaplapseError::Annotation(_)));
    }

    #[test]
    fn empty_table_means_no_annotations() {
        assert!(Config::default().annotation_table().unwrap().is_none());
    }

    #[test]
    fn unknown_kind_fails_even_with_an_empty_table() {
        let config = Config {
            annotations_type: Some("emoji".to_string()),
            ..Config::default()
        };
        let err = config.annotation_table().unwrap_err();
        assert!(matches!(err, MaplapseError::Annotation(_)));
    }
}
