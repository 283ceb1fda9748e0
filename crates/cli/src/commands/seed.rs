//! Seed the catalog through the admin API.
//!
//! Reads a YAML catalog (the bundled DreamCollections sample by default),
//! validates it, then creates top-level categories, sub-categories under
//! their parent, and each product followed by its variants.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use dream_collections_client::{AuthSession, CatalogClient};
use dream_collections_core::CategoryId;
use dream_collections_core::api::{CategoryRequest, NewVariantRequest, ProductRequest};

/// The sample catalog shipped with the CLI.
pub const BUNDLED_CATALOG: &str = include_str!("../../data/catalog.yaml");

/// Size and stock given to products that list no variants.
const DEFAULT_VARIANT: (&str, i32) = ("One Size", 10);

#[derive(Debug, Deserialize)]
pub struct SeedCatalog {
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<SeedSubcategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSubcategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Name of the (sub-)category the product belongs to.
    pub category: String,
    #[serde(default)]
    pub variants: Vec<SeedVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedVariant {
    pub size: String,
    pub stock: i32,
}

impl SeedProduct {
    /// Listed variants, or the single default variant.
    fn variants_or_default(&self) -> Vec<SeedVariant> {
        if self.variants.is_empty() {
            vec![SeedVariant {
                size: DEFAULT_VARIANT.0.to_string(),
                stock: DEFAULT_VARIANT.1,
            }]
        } else {
            self.variants.clone()
        }
    }
}

impl SeedCatalog {
    /// Parse a catalog from YAML.
    ///
    /// # Errors
    ///
    /// Returns error if the YAML does not match the catalog layout.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    fn subcategory_count(&self) -> usize {
        self.categories.iter().map(|c| c.subcategories.len()).sum()
    }

    /// Problems that would stop seeding part-way through.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();

        let all_names = self.categories.iter().flat_map(|c| {
            std::iter::once(c.name.as_str()).chain(c.subcategories.iter().map(|s| s.name.as_str()))
        });
        for name in all_names {
            if name.trim().is_empty() {
                errors.push("category with an empty name".to_string());
            } else if !names.insert(name) {
                errors.push(format!("duplicate category: {name}"));
            }
        }

        for product in &self.products {
            if !names.contains(product.category.as_str()) {
                errors.push(format!(
                    "product '{}' refers to unknown category '{}'",
                    product.name, product.category
                ));
            }
            if product.price <= Decimal::ZERO {
                errors.push(format!("product '{}' has a non-positive price", product.name));
            }
            if product.variants.iter().any(|v| v.stock < 0) {
                errors.push(format!("product '{}' has negative stock", product.name));
            }
        }
        errors
    }
}

/// Counts of everything created.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub subcategories: usize,
    pub products: usize,
    pub variants: usize,
}

/// Seed the catalog.
///
/// Signs in first when `login` is given; otherwise the stored session must
/// belong to an admin.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the catalog is invalid,
/// sign-in fails, or the API rejects a request.
pub async fn catalog(
    session: &AuthSession,
    catalog: &CatalogClient,
    file_path: Option<&str>,
    login: Option<(&str, &str)>,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let content = match file_path {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(format!("File not found: {file_path}").into());
            }
            info!(path = %file_path, "Loading catalog from file");
            tokio::fs::read_to_string(path).await?
        }
        None => {
            info!("Loading bundled catalog");
            BUNDLED_CATALOG.to_string()
        }
    };

    let seed = SeedCatalog::from_yaml(&content)?;
    info!(
        categories = seed.categories.len(),
        subcategories = seed.subcategory_count(),
        products = seed.products.len(),
        "Parsed catalog"
    );

    let errors = seed.validate();
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    if let Some((login_id, password)) = login {
        session.login(login_id, password).await?;
    }
    if !session.current_user().is_some_and(|user| user.is_admin()) {
        return Err("Seeding needs an admin session; pass --login and --password".into());
    }

    let summary = populate(catalog, &seed).await?;

    info!("Seeding complete!");
    info!("  Top-level categories created: {}", summary.categories);
    info!("  Sub-categories created: {}", summary.subcategories);
    info!("  Products created: {}", summary.products);
    info!("  Variants created: {}", summary.variants);
    Ok(summary)
}

async fn populate(
    catalog: &CatalogClient,
    seed: &SeedCatalog,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let mut summary = SeedSummary::default();
    let mut created: HashMap<&str, CategoryId> = HashMap::new();

    info!("Creating top-level categories...");
    for category in &seed.categories {
        let response = catalog
            .create_category(&CategoryRequest {
                name: category.name.clone(),
                description: category.description.clone(),
                parent_id: None,
            })
            .await?;
        info!("Created category: {} (ID: {})", category.name, response.id);
        created.insert(&category.name, response.id);
        summary.categories += 1;
    }

    info!("Creating sub-categories...");
    for category in &seed.categories {
        let Some(&parent_id) = created.get(category.name.as_str()) else {
            continue;
        };
        for sub in &category.subcategories {
            let response = catalog
                .create_category(&CategoryRequest {
                    name: sub.name.clone(),
                    description: sub.description.clone(),
                    parent_id: Some(parent_id),
                })
                .await?;
            info!("Created sub-category: {} (ID: {})", sub.name, response.id);
            created.insert(&sub.name, response.id);
            summary.subcategories += 1;
        }
    }

    info!("Creating products...");
    for product in &seed.products {
        let Some(&category_id) = created.get(product.category.as_str()) else {
            continue;
        };
        let response = catalog
            .create_product(&ProductRequest {
                name: product.name.clone(),
                description: product.description.clone(),
                price: product.price,
                image_url: product.image_url.clone(),
                video_url: None,
                category_id,
                variants: Vec::new(),
            })
            .await?;
        info!(
            "Created product: {} (ID: {}) - INR {}",
            product.name, response.id, product.price
        );
        summary.products += 1;

        for variant in product.variants_or_default() {
            catalog
                .add_variant(&NewVariantRequest {
                    product_id: response.id,
                    size: variant.size.clone(),
                    stock_quantity: variant.stock,
                })
                .await?;
            info!("  Added variant: {} (Stock: {})", variant.size, variant.stock);
            summary.variants += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let seed = SeedCatalog::from_yaml(BUNDLED_CATALOG).unwrap();
        assert_eq!(seed.categories.len(), 5);
        assert_eq!(seed.subcategory_count(), 17);
        assert_eq!(seed.products.len(), 11);
        assert!(seed.validate().is_empty(), "{:?}", seed.validate());

        let ring = seed
            .products
            .iter()
            .find(|p| p.name == "Solitaire Diamond Ring")
            .unwrap();
        assert_eq!(ring.price, Decimal::new(20_829_900, 2));
        assert_eq!(ring.variants.len(), 5);
    }

    #[test]
    fn test_default_variant() {
        let yaml = r#"
categories:
  - name: Anklets
products:
  - name: Silver Anklet
    price: "899.00"
    category: Anklets
"#;
        let seed = SeedCatalog::from_yaml(yaml).unwrap();
        assert!(seed.validate().is_empty());
        let product = seed.products.first().unwrap();
        assert_eq!(
            product.variants_or_default(),
            vec![SeedVariant {
                size: "One Size".to_string(),
                stock: 10
            }]
        );
    }

    #[test]
    fn test_validation_errors() {
        let yaml = r#"
categories:
  - name: Rings
    subcategories:
      - name: Rings
products:
  - name: Toe Ring
    price: "0"
    category: Toe Rings
    variants:
      - { size: "Free", stock: -1 }
"#;
        let errors = SeedCatalog::from_yaml(yaml).unwrap().validate();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("duplicate category: Rings")));
        assert!(errors.iter().any(|e| e.contains("unknown category 'Toe Rings'")));
    }
}
