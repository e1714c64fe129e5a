//! Seed the catalog from a YAML file.
//!
//! Categories are matched by name and products by owner and name, so the
//! command can be re-run after editing the file.
//!
//! ```yaml
//! owner: seller@example.com
//! categories:
//!   - name: Shoes
//!     description: Everything for your feet
//! products:
//!   - name: Canvas sneaker
//!     price: "49.90"
//!     stock: 12
//!     category: Shoes
//!     sizes: ["40", "41", "42"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use marketplace_api::db::catalog::{CategoryRepository, ProductRepository};
use marketplace_api::db::users::UserRepository;
use marketplace_api::models::catalog::{ProductDraft, ProductPatch};
use marketplace_core::{CategoryId, Email, Role};

use super::connect;

/// Top-level YAML document.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    /// Email of the seller or admin that owns every product.
    pub owner: String,
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Category name; must exist in the database or in `categories`.
    pub category: Option<String>,
}

/// Problems that make a file unsafe to apply. Categories referenced but not
/// declared are only checked against the database later.
#[must_use]
pub fn validate_catalog(file: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();

    if Email::parse(&file.owner).is_err() {
        errors.push(format!("owner '{}' is not a valid email", file.owner));
    }

    let mut categories = HashSet::new();
    for category in &file.categories {
        if category.name.trim().is_empty() {
            errors.push("category with empty name".to_owned());
        } else if !categories.insert(category.name.trim()) {
            errors.push(format!("category '{}' declared twice", category.name));
        }
    }

    let mut products = HashSet::new();
    for product in &file.products {
        let name = product.name.trim();
        if name.is_empty() {
            errors.push("product with empty name".to_owned());
            continue;
        }
        if !products.insert(name) {
            errors.push(format!("product '{name}' declared twice"));
        }
        if product.price.is_sign_negative() {
            errors.push(format!("product '{name}' has a negative price"));
        }
        if product.stock < 0 {
            errors.push(format!("product '{name}' has negative stock"));
        }
    }

    errors
}

/// Upsert the categories and products described in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, the owner
/// is unknown or a buyer, or a database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate_catalog(&file);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = connect().await?;

    let owner_email = Email::parse(&file.owner)?;
    let owner = UserRepository::new(&pool)
        .get_by_email(&owner_email)
        .await?
        .ok_or_else(|| format!("No user with email: {owner_email}"))?;
    if owner.role == Role::Buyer {
        return Err(format!("{owner_email} is a buyer and cannot own products").into());
    }

    let categories = CategoryRepository::new(&pool);
    let mut categories_created = 0_usize;
    for entry in &file.categories {
        let name = entry.name.trim();
        if categories.get_by_name(name).await?.is_none() {
            categories.create(name, entry.description.as_deref()).await?;
            categories_created += 1;
        }
    }

    let products = ProductRepository::new(&pool);
    let (mut inserted, mut updated) = (0_usize, 0_usize);
    for entry in file.products {
        let category_id = match entry.category.as_deref().map(str::trim) {
            Some(name) => Some(category_id(&categories, name).await?),
            None => None,
        };
        let name = entry.name.trim().to_owned();

        if let Some(existing) = products.get_by_owner_and_name(owner.id, &name).await? {
            let patch = ProductPatch {
                name: None,
                description: Some(entry.description),
                price: Some(entry.price),
                stock: Some(entry.stock),
                cover_image: entry.cover_image,
                colors: Some(entry.colors),
                sizes: Some(entry.sizes),
                category_id,
            };
            products.update(existing.id, &patch).await?;
            updated += 1;
        } else {
            let draft = ProductDraft {
                name,
                description: entry.description,
                price: entry.price,
                stock: entry.stock,
                cover_image: entry.cover_image,
                colors: entry.colors,
                sizes: entry.sizes,
                category_id,
            };
            products.create(owner.id, &draft, owner.is_active).await?;
            inserted += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Categories created: {categories_created}");
    info!("  Products inserted: {inserted}");
    info!("  Products updated: {updated}");

    Ok(())
}

async fn category_id(
    categories: &CategoryRepository<'_>,
    name: &str,
) -> Result<CategoryId, Box<dyn std::error::Error>> {
    categories
        .get_by_name(name)
        .await?
        .map(|c| c.id)
        .ok_or_else(|| format!("Unknown category: {name}").into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
owner: seller@example.com
categories:
  - name: Shoes
    description: Everything for your feet
  - name: Bags
products:
  - name: Canvas sneaker
    price: "49.90"
    stock: 12
    category: Shoes
    sizes: ["40", "41"]
  - name: Tote
    price: "15.00"
"#;

    #[test]
    fn test_parse_sample() {
        let file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(file.categories.len(), 2);
        assert_eq!(file.products.len(), 2);
        assert_eq!(file.products[0].price, Decimal::new(4990, 2));
        assert_eq!(file.products[1].stock, 0);
        assert!(file.products[1].category.is_none());
        assert!(validate_catalog(&file).is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_entries() {
        let file = CatalogFile {
            owner: "not-an-email".to_owned(),
            categories: vec![
                CategoryEntry {
                    name: "Shoes".to_owned(),
                    description: None,
                },
                CategoryEntry {
                    name: " Shoes ".to_owned(),
                    description: None,
                },
            ],
            products: vec![ProductEntry {
                name: "Broken".to_owned(),
                description: String::new(),
                price: Decimal::new(-1, 0),
                stock: -2,
                cover_image: None,
                colors: vec![],
                sizes: vec![],
                category: None,
            }],
        };

        let errors = validate_catalog(&file);
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("not a valid email")));
        assert!(errors.iter().any(|e| e.contains("declared twice")));
        assert!(errors.iter().any(|e| e.contains("negative price")));
        assert!(errors.iter().any(|e| e.contains("negative stock")));
    }
}
