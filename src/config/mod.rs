use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::LayoutError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemConfig {
    pub id: u32,
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub current_quantity: f64,
    #[serde(default)]
    pub min_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    /// Overrides the page-wide quick steps for this card
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_steps: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

/// An unresolved low-stock notice as rendered by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoticeConfig {
    pub item: String,
    pub threshold: f64,
    pub quantity: f64,
}

/// Optional hex colors (`#RRGGBB` or `#RGB`) overriding the built-in palette
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ThemeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_dim: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_selected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_stock: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Seconds before a flash message disappears
    #[serde(default = "default_flash_secs")]
    pub flash_secs: u64,

    /// Quick-adjust steps shown on every card
    #[serde(default = "default_quick_steps")]
    pub quick_steps: Vec<f64>,

    /// Choices for the stock-change reason selector
    #[serde(default = "default_reasons")]
    pub reasons: Vec<String>,

    #[serde(default)]
    pub categories: Vec<CategoryConfig>,

    #[serde(default)]
    pub notices: Vec<NoticeConfig>,

    #[serde(default)]
    pub theme: ThemeConfig,
}

fn default_flash_secs() -> u64 {
    3
}

fn default_quick_steps() -> Vec<f64> {
    vec![-10.0, -1.0, -0.5, 0.5, 1.0, 10.0]
}

fn default_reasons() -> Vec<String> {
    ["Received", "Used", "Discarded", "Stocktake correction"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn item(id: u32, name: &str, unit: &str, current: f64, threshold: f64) -> ItemConfig {
    ItemConfig {
        id,
        name: name.to_string(),
        unit: unit.to_string(),
        current_quantity: current,
        min_threshold: threshold,
        supplier: None,
        quick_steps: None,
    }
}

impl Default for AppConfig {
    // Demo page written on first start
    fn default() -> Self {
        Self {
            flash_secs: default_flash_secs(),
            quick_steps: default_quick_steps(),
            reasons: default_reasons(),
            categories: vec![
                CategoryConfig {
                    name: "Vegetables".to_string(),
                    items: vec![
                        item(1, "Onion", "kg", 12.5, 5.0),
                        item(2, "Cabbage", "head", 3.0, 4.0),
                    ],
                },
                CategoryConfig {
                    name: "Dairy".to_string(),
                    items: vec![
                        ItemConfig {
                            quick_steps: Some(vec![-1.0, -0.1, 0.1, 1.0]),
                            ..item(3, "Milk", "L", 1.2, 2.0)
                        },
                        item(4, "Butter", "pack", 6.0, 2.0),
                    ],
                },
                CategoryConfig {
                    name: "Dry goods".to_string(),
                    items: vec![ItemConfig {
                        supplier: Some("Hokuriku Mills".to_string()),
                        ..item(5, "Rice", "kg", 20.0, 10.0)
                    }],
                },
            ],
            notices: vec![NoticeConfig {
                item: "Milk".to_string(),
                threshold: 2.0,
                quantity: 1.2,
            }],
            theme: ThemeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default layout path: `<config dir>/zaiko/page.toml`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("zaiko");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("page.toml"))
    }

    /// Load the page layout. An explicit path must exist; the default path
    /// is seeded with the demo page when missing.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read page layout {}", path.display()))?;
            return toml::from_str(&content)
                .with_context(|| format!("Failed to parse page layout {}", path.display()));
        }

        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse page layout: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read page layout: {}", e),
            }
            return Ok(AppConfig::default());
        }

        let config = AppConfig::default();
        if let Err(e) = config.save_to(&path) {
            tracing::warn!("Could not write demo page: {}", e);
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!("Wrote page layout to {}", path.display());
        Ok(())
    }

    /// Check the layout before any controls get bound to it
    pub fn validate(&self) -> std::result::Result<(), LayoutError> {
        if self.reasons.iter().all(|r| r.trim().is_empty()) {
            return Err(LayoutError::NoReasons);
        }

        let mut seen = HashSet::new();
        for item in self.items() {
            if !seen.insert(item.id) {
                return Err(LayoutError::DuplicateItem(item.id));
            }
            if item.name.trim().is_empty() {
                return Err(LayoutError::EmptyName(item.id));
            }
            if let Some(&step) = self
                .steps_for(item)
                .iter()
                .find(|s| !s.is_finite() || **s == 0.0)
            {
                return Err(LayoutError::InvalidStep { item: item.id, step });
            }
        }
        Ok(())
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemConfig> {
        self.categories.iter().flat_map(|c| c.items.iter())
    }

    pub fn steps_for<'a>(&'a self, item: &'a ItemConfig) -> &'a [f64] {
        item.quick_steps.as_deref().unwrap_or(&self.quick_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_minimal_layout_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [[categories]]
            name = "Spices"

            [[categories.items]]
            id = 7
            name = "Pepper"
            unit = "g"
            "#,
        )
        .unwrap();

        assert_eq!(config.flash_secs, 3);
        assert_eq!(config.reasons.len(), 4);
        let pepper = config.items().next().unwrap();
        assert_eq!(config.steps_for(pepper), default_quick_steps().as_slice());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_item_steps_override() {
        let config = AppConfig::default();
        let milk = config.items().find(|i| i.name == "Milk").unwrap();
        assert_eq!(config.steps_for(milk), &[-1.0, -0.1, 0.1, 1.0]);
    }

    #[test]
    fn test_validate_rejects_bad_layouts() {
        let mut dup = AppConfig::default();
        dup.categories[1].items[0].id = 1;
        assert_eq!(dup.validate(), Err(LayoutError::DuplicateItem(1)));

        let mut zero_step = AppConfig::default();
        zero_step.categories[0].items[1].quick_steps = Some(vec![1.0, 0.0]);
        assert_eq!(
            zero_step.validate(),
            Err(LayoutError::InvalidStep { item: 2, step: 0.0 })
        );

        let mut unnamed = AppConfig::default();
        unnamed.categories[2].items[0].name = "  ".to_string();
        assert_eq!(unnamed.validate(), Err(LayoutError::EmptyName(5)));

        let mut no_reasons = AppConfig::default();
        no_reasons.reasons.clear();
        assert_eq!(no_reasons.validate(), Err(LayoutError::NoReasons));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.toml");
        AppConfig::default().save_to(&path).unwrap();

        let loaded = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(loaded, AppConfig::default());

        assert!(AppConfig::load(Some(dir.path().join("missing.toml").as_path())).is_err());

        std::fs::write(&path, "categories = 5").unwrap();
        assert!(AppConfig::load(Some(path.as_path())).is_err());
    }
}
