//! Document categories and the category → folder registry.
//!
//! The category set is closed. Every category maps to exactly one backend
//! folder; the mapping is built once at startup and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::constants::{IMAGE_CONTENT_TYPE_PREFIX, PDF_CONTENT_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Category {
    Photos,
    #[serde(rename = "SWL")]
    Swl,
    #[serde(rename = "WID")]
    Wid,
    #[serde(rename = "CAR")]
    Car,
    #[serde(rename = "CAS")]
    Cas,
    #[serde(rename = "PRS")]
    Prs,
    #[serde(rename = "INZ")]
    Inz,
    #[serde(rename = "ICT")]
    Ict,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Photos,
        Category::Swl,
        Category::Wid,
        Category::Car,
        Category::Cas,
        Category::Prs,
        Category::Inz,
        Category::Ict,
    ];

    /// Identifier used in URLs and configuration (e.g. `SWL`).
    pub fn id(self) -> &'static str {
        match self {
            Category::Photos => "Photos",
            Category::Swl => "SWL",
            Category::Wid => "WID",
            Category::Car => "CAR",
            Category::Cas => "CAS",
            Category::Prs => "PRS",
            Category::Inz => "INZ",
            Category::Ict => "ICT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Photos => "Photos",
            Category::Swl => "Switchboard Layout",
            Category::Wid => "Wiring Diagram",
            Category::Car => "Cable Routing",
            Category::Cas => "Cable Schedule",
            Category::Prs => "Protection Schedule",
            Category::Inz => "Installation Zones",
            Category::Ict => "ICT",
        }
    }

    /// Folder used when no override is configured.
    pub fn default_folder(self) -> &'static str {
        match self {
            Category::Photos => "img",
            Category::Swl => "swl",
            Category::Wid => "wid",
            Category::Car => "car",
            Category::Cas => "cas",
            Category::Prs => "prs",
            Category::Inz => "inz",
            Category::Ict => "ict",
        }
    }

    pub fn is_photo(self) -> bool {
        self == Category::Photos
    }

    /// Content types a file picker should offer for this category.
    pub fn accept_hint(self) -> &'static str {
        if self.is_photo() {
            "image/*"
        } else {
            PDF_CONTENT_TYPE
        }
    }

    /// Whether a content type may be stored in this category.
    pub fn accepts_content_type(self, content_type: &str) -> bool {
        if self.is_photo() {
            content_type.starts_with(IMAGE_CONTENT_TYPE_PREFIX)
        } else {
            content_type == PDF_CONTENT_TYPE
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.id())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    /// Parses either the identifier (`SWL`) or the default folder (`swl`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.id().eq_ignore_ascii_case(needle) || c.default_folder().eq_ignore_ascii_case(needle))
            .ok_or_else(|| anyhow::anyhow!("Unknown category: {}", s))
    }
}

/// Immutable category → folder mapping.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    folders: HashMap<Category, String>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        let folders = Category::ALL
            .into_iter()
            .map(|c| (c, c.default_folder().to_string()))
            .collect();
        Self { folders }
    }
}

impl CategoryRegistry {
    /// Build a registry from the defaults plus explicit overrides.
    ///
    /// Fails if any folder is empty, absolute, contains `..`, or is shared by two
    /// categories.
    pub fn with_overrides(
        overrides: impl IntoIterator<Item = (Category, String)>,
    ) -> Result<Self, anyhow::Error> {
        let mut registry = Self::default();
        for (category, folder) in overrides {
            registry
                .folders
                .insert(category, folder.trim().trim_end_matches('/').to_string());
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Parse `CATEGORY_FOLDERS` style overrides: `Photos=img,SWL=swl`.
    pub fn parse_overrides(spec: &str) -> Result<Vec<(Category, String)>, anyhow::Error> {
        spec.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (category, folder) = entry.split_once('=').ok_or_else(|| {
                    anyhow::anyhow!("Invalid category folder entry '{}', expected CATEGORY=folder", entry)
                })?;
                Ok((category.parse::<Category>()?, folder.trim().to_string()))
            })
            .collect()
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        let mut seen = HashSet::new();
        for category in Category::ALL {
            let folder = self
                .folders
                .get(&category)
                .ok_or_else(|| anyhow::anyhow!("No folder configured for category {}", category))?;
            if folder.is_empty() {
                return Err(anyhow::anyhow!("Folder for category {} must not be empty", category));
            }
            if folder.starts_with('/') || folder.split('/').any(|segment| segment == "..") {
                return Err(anyhow::anyhow!(
                    "Folder '{}' for category {} must be a relative path without '..'",
                    folder,
                    category
                ));
            }
            if !seen.insert(folder.as_str()) {
                return Err(anyhow::anyhow!(
                    "Folder '{}' is mapped to more than one category",
                    folder
                ));
            }
        }
        Ok(())
    }

    /// Backend folder for a category. Total over the closed set.
    pub fn resolve_folder(&self, category: Category) -> &str {
        match self.folders.get(&category) {
            Some(folder) => folder,
            // Construction validates completeness, so this is unreachable for any
            // registry built through `default` or `with_overrides`.
            None => category.default_folder(),
        }
    }

    /// Reverse lookup used when a client addresses a category by its folder.
    pub fn category_for_folder(&self, folder: &str) -> Option<Category> {
        let folder = folder.trim().trim_end_matches('/');
        self.folders
            .iter()
            .find(|(_, f)| f.as_str() == folder)
            .map(|(c, _)| *c)
    }

    /// Resolve a path segment that may be a category id or a configured folder.
    pub fn lookup(&self, segment: &str) -> Option<Category> {
        self.category_for_folder(segment)
            .or_else(|| segment.parse::<Category>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_folder_is_total_and_stable() {
        let registry = CategoryRegistry::default();
        for category in Category::ALL {
            let first = registry.resolve_folder(category).to_string();
            assert!(!first.is_empty());
            assert_eq!(first, registry.resolve_folder(category));
        }
        assert_eq!(registry.resolve_folder(Category::Photos), "img");
        assert_eq!(registry.resolve_folder(Category::Prs), "prs");
    }

    #[test]
    fn test_category_parses_id_and_folder() {
        assert_eq!("SWL".parse::<Category>().unwrap(), Category::Swl);
        assert_eq!("swl".parse::<Category>().unwrap(), Category::Swl);
        assert_eq!("photos".parse::<Category>().unwrap(), Category::Photos);
        assert_eq!("img".parse::<Category>().unwrap(), Category::Photos);
        assert!("XYZ".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_uses_identifiers() {
        let json = serde_json::to_string(&Category::Wid).unwrap();
        assert_eq!(json, "\"WID\"");
        let parsed: Category = serde_json::from_str("\"Photos\"").unwrap();
        assert_eq!(parsed, Category::Photos);
    }

    #[test]
    fn test_accepts_content_type() {
        assert!(Category::Photos.accepts_content_type("image/png"));
        assert!(!Category::Photos.accepts_content_type("application/pdf"));
        assert!(Category::Cas.accepts_content_type("application/pdf"));
        assert!(!Category::Cas.accepts_content_type("application/pdf; charset=binary"));
        assert!(!Category::Cas.accepts_content_type("image/png"));
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let overrides = CategoryRegistry::parse_overrides("Photos=pictures, SWL = layouts/").unwrap();
        let registry = CategoryRegistry::with_overrides(overrides).unwrap();
        assert_eq!(registry.resolve_folder(Category::Photos), "pictures");
        assert_eq!(registry.resolve_folder(Category::Swl), "layouts");
        assert_eq!(registry.resolve_folder(Category::Wid), "wid");
        assert_eq!(registry.category_for_folder("layouts"), Some(Category::Swl));
        assert_eq!(registry.lookup("WID"), Some(Category::Wid));
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        assert!(CategoryRegistry::parse_overrides("Photos").is_err());
        assert!(CategoryRegistry::parse_overrides("Nope=x").is_err());
        assert!(CategoryRegistry::with_overrides(vec![(Category::Swl, "img".to_string())]).is_err());
        assert!(CategoryRegistry::with_overrides(vec![(Category::Swl, "".to_string())]).is_err());
        assert!(CategoryRegistry::with_overrides(vec![(Category::Swl, "../etc".to_string())]).is_err());
        assert!(CategoryRegistry::with_overrides(vec![(Category::Swl, "/abs".to_string())]).is_err());
    }
}
