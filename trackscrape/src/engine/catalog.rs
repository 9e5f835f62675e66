use std::path::Path;

use include_dir::{Dir, include_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Embedded selector catalogs.
static CATALOGS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/catalogs");

const DEFAULT_CATALOG: &str = "default.yaml";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("candidate list must contain at least one selector")]
    EmptyCandidateList,
    #[error("catalog defines no track row families")]
    NoRowFamilies,
    #[error("embedded catalog '{0}' not found")]
    Missing(String),
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Ordered selector candidates for one logical target. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CandidateList(Vec<String>);

impl CandidateList {
    pub fn new<I, S>(selectors: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selectors: Vec<String> = selectors
            .into_iter()
            .map(Into::into)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if selectors.is_empty() {
            return Err(CatalogError::EmptyCandidateList);
        }
        Ok(Self(selectors))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl TryFrom<Vec<String>> for CandidateList {
    type Error = CatalogError;

    fn try_from(selectors: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(selectors)
    }
}

impl From<CandidateList> for Vec<String> {
    fn from(list: CandidateList) -> Self {
        list.0
    }
}

/**
    Ranked selector candidates for every logical target on an artist page.

    Markup drifts between front-end rollouts, so each target carries several
    alternatives ordered by how reliable they have proven. Catalogs are plain
    YAML so they can be updated without touching the pipeline.
*/
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectorCatalog {
    pub track_container: CandidateList,
    /// Row selector families, tried in order.
    pub track_rows: Vec<CandidateList>,
    pub track_name: CandidateList,
    pub row_links: CandidateList,
    pub row_leaves: CandidateList,
    pub row_cells: CandidateList,
    pub track_image: CandidateList,
    pub track_link: CandidateList,
    pub expand: CandidateList,
    pub artist_name: CandidateList,
    pub monthly_listeners: CandidateList,
    pub listener_text_scan: CandidateList,
    pub generic_track_links: CandidateList,
}

impl SelectorCatalog {
    /// The catalog shipped with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::embedded(DEFAULT_CATALOG)
    }

    pub fn embedded(name: &str) -> Result<Self, CatalogError> {
        let content = CATALOGS_DIR
            .get_file(name)
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| CatalogError::Missing(name.to_string()))?;
        Self::from_yaml(content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, CatalogError> {
        let catalog: SelectorCatalog = serde_yaml::from_str(content)?;
        if catalog.track_rows.is_empty() {
            return Err(CatalogError::NoRowFamilies);
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load `path` if given, otherwise the built-in catalog.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = SelectorCatalog::builtin().expect("Failed to load builtin catalog");

        assert_eq!(
            catalog.track_container.iter().next(),
            Some(r#"[data-testid="track-list"]"#)
        );
        assert_eq!(catalog.track_rows.len(), 3);
        assert!(catalog.expand.len() >= 1);
        assert!(catalog.artist_name.iter().any(|s| s == "h1"));
    }

    #[test]
    fn test_empty_candidate_list_rejected() {
        assert!(matches!(
            CandidateList::new(Vec::<String>::new()),
            Err(CatalogError::EmptyCandidateList)
        ));
        assert!(matches!(
            CandidateList::new(["  ", ""]),
            Err(CatalogError::EmptyCandidateList)
        ));
    }

    #[test]
    fn test_candidate_order_preserved() {
        let list = CandidateList::new(["b", "a", "c"]).unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_yaml_with_empty_target_fails() {
        let mut yaml = String::from(include_str!("../../catalogs/default.yaml"));
        yaml = yaml.replace("row_links:\n  - 'a'", "row_links: []");

        let err = SelectorCatalog::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("at least one selector"));
    }

    #[test]
    fn test_yaml_without_row_families_fails() {
        let yaml = include_str!("../../catalogs/default.yaml");
        let mut value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        value["track_rows"] = serde_yaml::Value::Sequence(vec![]);
        let yaml = serde_yaml::to_string(&value).unwrap();

        assert!(matches!(
            SelectorCatalog::from_yaml(&yaml),
            Err(CatalogError::NoRowFamilies)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(include_str!("../../catalogs/default.yaml").as_bytes())
            .unwrap();

        let catalog = SelectorCatalog::load_or_builtin(Some(file.path())).unwrap();
        assert_eq!(catalog.generic_track_links.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SelectorCatalog::load(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
