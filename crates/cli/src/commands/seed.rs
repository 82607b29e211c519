//! Seed the database with demo stores and products.
//!
//! Reads a YAML file of stores, validates every entry with the same rules the
//! storefront applies to user input, then completes onboarding for each
//! seller and creates their products. Re-running is safe: a product whose
//! title the seller already uses is skipped.
//!
//! ```yaml
//! stores:
//!   - owner: 8d3c2f4e-6a51-4b7e-9c1d-2f0a9e5b7c31
//!     name: Clay Co
//!     slug: clay-co
//!     products:
//!       - title: Tall vase
//!         description: "Wheel thrown **stoneware**"
//!         tags: [vases, stoneware]
//!         stock: 3
//!         price: "45.00"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use bazaar_core::{Price, TagList, UserId};
use bazaar_storefront::db::{self, ProductStore, ProfileStore, Stores};
use bazaar_storefront::models::NewProduct;
use bazaar_storefront::services::catalog::ProductDraft;
use bazaar_storefront::services::onboarding;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub stores: Vec<SeedStore>,
}

#[derive(Debug, Deserialize)]
pub struct SeedStore {
    /// Auth provider user id of the seller.
    pub owner: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub stock: i64,
    pub price: String,
}

/// A store entry that passed validation.
#[derive(Debug)]
pub struct PlannedStore {
    pub owner: UserId,
    pub name: String,
    pub slug: String,
    pub products: Vec<NewProduct>,
}

/// Counts reported after seeding.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub stores: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Validate a seed file, collecting every problem rather than stopping at the first.
///
/// # Errors
///
/// Returns one message per invalid field.
pub fn plan(file: &SeedFile) -> Result<Vec<PlannedStore>, Vec<String>> {
    let mut errors = Vec::new();
    let mut slugs = HashSet::new();
    let mut planned = Vec::with_capacity(file.stores.len());

    for (i, store) in file.stores.iter().enumerate() {
        let label = format!("stores[{i}]");

        let name = onboarding::validate_store_name(Some(store.name.as_str()))
            .map_err(|e| errors.push(format!("{label}.name: {e}")))
            .ok();
        let slug = onboarding::validate_slug(Some(store.slug.as_str()))
            .map_err(|e| errors.push(format!("{label}.slug: {e}")))
            .ok();
        if let Some(slug) = &slug
            && !slugs.insert(slug.as_str().to_owned())
        {
            errors.push(format!("{label}.slug: '{slug}' is used by another store"));
        }

        let mut products = Vec::with_capacity(store.products.len());
        for (j, product) in store.products.iter().enumerate() {
            match plan_product(product) {
                Ok(p) => products.push(p),
                Err(e) => errors.push(format!("{label}.products[{j}]: {e}")),
            }
        }

        if let (Some(name), Some(slug)) = (name, slug) {
            planned.push(PlannedStore {
                owner: UserId::new(store.owner),
                name,
                slug: slug.into_inner(),
                products,
            });
        }
    }

    if errors.is_empty() {
        Ok(planned)
    } else {
        Err(errors)
    }
}

fn plan_product(product: &SeedProduct) -> Result<NewProduct, String> {
    let price = Price::parse(&product.price).map_err(|e| format!("price: {e}"))?;
    let changes = ProductDraft {
        title: Some(product.title.clone()),
        description: Some(product.description.clone()),
        tags: Some(TagList::new(&product.tags)),
        stock: Some(product.stock),
        price: Some(price),
    }
    .validate()
    .map_err(|e| e.to_string())?;

    Ok(NewProduct {
        title: changes.title,
        description: changes.description.unwrap_or_default(),
        tags: changes.tags.unwrap_or_default(),
        stock: changes.stock,
        price: changes.price,
        image_path: None,
    })
}

/// Write planned stores through the store seams.
///
/// # Errors
///
/// Returns the first store or onboarding error; earlier stores stay seeded.
pub async fn apply(
    profiles: &dyn ProfileStore,
    products: &dyn ProductStore,
    planned: &[PlannedStore],
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let mut summary = SeedSummary::default();

    for store in planned {
        profiles.ensure(store.owner).await?;
        onboarding::complete_setup(
            profiles,
            store.owner,
            Some(store.name.as_str()),
            Some(store.slug.as_str()),
        )
        .await
        .map_err(|e| format!("{}: {e}", store.slug))?;
        summary.stores += 1;

        let existing: HashSet<String> = products
            .list_by_owner(store.owner)
            .await?
            .into_iter()
            .map(|p| p.title)
            .collect();

        for product in &store.products {
            if existing.contains(&product.title) {
                summary.skipped += 1;
                continue;
            }
            products.create(store.owner, product).await?;
            summary.inserted += 1;
        }
        info!(slug = %store.slug, products = store.products.len(), "Seeded store");
    }

    Ok(summary)
}

/// Seed stores and products from a YAML file.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or fails validation, or a database operation fails.
pub async fn stores(file_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    if !file_path.exists() {
        return Err(format!("File not found: {}", file_path.display()).into());
    }
    info!(path = %file_path.display(), "Loading seed file");

    // Validate before connecting to the database
    let content = tokio::fs::read_to_string(file_path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;
    let planned = match plan(&file) {
        Ok(planned) => planned,
        Err(errors) => {
            error!("Seed file validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(stores = planned.len(), "Seed file validated");

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");
    let stores = Stores::postgres(&pool);

    let summary = apply(stores.profiles.as_ref(), stores.products.as_ref(), &planned).await?;

    info!("Seeding complete!");
    info!("  Stores onboarded: {}", summary.stores);
    info!("  Products inserted: {}", summary.inserted);
    info!("  Products skipped (already exist): {}", summary.skipped);

    Ok(())
}
