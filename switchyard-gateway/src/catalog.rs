//! Keyword-based model categorization and search.
//!
//! Categories come from configuration (falling back to a built-in set); a
//! model lands in the first non-default category whose keyword appears in
//! its id, name, or description, else in the default text-generation
//! bucket.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use switchyard_core::ModelDescriptor;
use switchyard_store::CategoryConfig;

/// Category every unmatched model falls into.
pub const DEFAULT_CATEGORY: &str = "text_generation";

/// One model category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Stable category id.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Keywords matched case-insensitively.
    pub keywords: Vec<String>,
}

/// The configured category set.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    categories: Vec<Category>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::from_config(&HashMap::new())
    }
}

impl ModelCatalog {
    /// Builds the catalog from configured filters.
    ///
    /// The default text-generation category is always present and always
    /// first; configured categories follow sorted by id so categorization
    /// order is deterministic. An empty configuration yields the built-in
    /// category set.
    pub fn from_config(filters: &HashMap<String, CategoryConfig>) -> Self {
        let mut categories = vec![Category {
            id: DEFAULT_CATEGORY.to_string(),
            display_name: "Text Generation".to_string(),
            keywords: lowercase(&["gpt", "claude", "gemini", "llama", "chat", "completion"]),
        }];

        if filters.is_empty() {
            categories.extend(builtin_categories());
        } else {
            let mut configured: Vec<(&String, &CategoryConfig)> = filters
                .iter()
                .filter(|(id, _)| id.as_str() != DEFAULT_CATEGORY)
                .collect();
            configured.sort_by_key(|(id, _)| id.clone());

            for (id, config) in configured {
                categories.push(Category {
                    id: id.clone(),
                    display_name: config
                        .display_name
                        .clone()
                        .unwrap_or_else(|| title_case(id)),
                    keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
                });
            }
        }

        Self { categories }
    }

    /// Returns the configured categories, default first.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns the category id for a model.
    pub fn categorize(&self, model: &ModelDescriptor) -> &str {
        let id = model.id.to_lowercase();
        let name = model.name.to_lowercase();
        let description = model.description.as_deref().unwrap_or("").to_lowercase();

        for category in &self.categories {
            if category.id == DEFAULT_CATEGORY {
                continue;
            }
            for keyword in &category.keywords {
                if id.contains(keyword) || name.contains(keyword) || description.contains(keyword)
                {
                    return &category.id;
                }
            }
        }
        DEFAULT_CATEGORY
    }

    /// Case-insensitive substring match over id, name, and description.
    pub fn matches_query(model: &ModelDescriptor, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        model.id.to_lowercase().contains(&query)
            || model.name.to_lowercase().contains(&query)
            || model
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }
}

fn builtin_categories() -> Vec<Category> {
    vec![
        Category {
            id: "audio".to_string(),
            display_name: "Audio".to_string(),
            keywords: lowercase(&["whisper", "audio", "speech", "tts"]),
        },
        Category {
            id: "code_generation".to_string(),
            display_name: "Code Generation".to_string(),
            keywords: lowercase(&["code", "codex", "copilot", "programming"]),
        },
        Category {
            id: "embedding".to_string(),
            display_name: "Embedding".to_string(),
            keywords: lowercase(&["embedding", "embed", "vector"]),
        },
        Category {
            id: "image_generation".to_string(),
            display_name: "Image Generation".to_string(),
            keywords: lowercase(&["image", "dall-e", "imagen", "midjourney", "stable-diffusion"]),
        },
    ]
}

fn lowercase(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

fn title_case(id: &str) -> String {
    id.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, name: &str, description: Option<&str>) -> ModelDescriptor {
        let mut m = ModelDescriptor::new(id, name);
        m.description = description.map(String::from);
        m
    }

    #[test]
    fn test_unmatched_model_defaults_to_text_generation() {
        let catalog = ModelCatalog::default();
        let m = model("mystery-7b", "Mystery", None);
        assert_eq!(catalog.categorize(&m), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_keyword_matches_id_name_and_description() {
        let catalog = ModelCatalog::default();

        assert_eq!(
            catalog.categorize(&model("dall-e-3", "DALL-E 3", None)),
            "image_generation"
        );
        assert_eq!(
            catalog.categorize(&model("x-1", "Whisper Large", None)),
            "audio"
        );
        assert_eq!(
            catalog.categorize(&model("x-2", "X2", Some("vector embedding model"))),
            "embedding"
        );
    }

    #[test]
    fn test_gpt_stays_in_default_category() {
        // "gpt" is a default-category keyword; the default bucket is only
        // assigned by fallthrough, so a plain GPT model lands there.
        let catalog = ModelCatalog::default();
        assert_eq!(
            catalog.categorize(&model("gpt-4", "GPT-4", None)),
            DEFAULT_CATEGORY
        );
    }

    #[test]
    fn test_configured_categories_replace_builtins() {
        let mut filters = HashMap::new();
        filters.insert(
            "vision".to_string(),
            CategoryConfig {
                display_name: None,
                keywords: vec!["VISION".to_string()],
            },
        );
        let catalog = ModelCatalog::from_config(&filters);

        assert_eq!(
            catalog.categorize(&model("gemini-pro-vision", "Gemini Vision", None)),
            "vision"
        );
        // Builtins are gone when config is present.
        assert_eq!(
            catalog.categorize(&model("dall-e-3", "DALL-E 3", None)),
            DEFAULT_CATEGORY
        );
        assert_eq!(catalog.categories()[1].display_name, "Vision");
    }

    #[test]
    fn test_search_matches_across_fields() {
        let m = model("gpt-4", "GPT-4", Some("flagship model"));
        assert!(ModelCatalog::matches_query(&m, "GPT"));
        assert!(ModelCatalog::matches_query(&m, "flagship"));
        assert!(ModelCatalog::matches_query(&m, ""));
        assert!(!ModelCatalog::matches_query(&m, "claude"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("image_generation"), "Image Generation");
        assert_eq!(title_case("audio"), "Audio");
    }
}
