//! Demo catalog seeding.
//!
//! Idempotent: categories are upserted by slug and products that already
//! exist are left alone.

use rust_decimal::Decimal;

use shop_core::Price;
use shop_storefront::db::{PgStore, RepositoryError};

use super::{CommandError, connect};

/// `(category name, category slug, products)` where each product is
/// `(name, slug, description, price in cents)`.
type CategorySeed = (
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str, &'static str, i64)],
);

const CATALOG: &[CategorySeed] = &[
    (
        "Electronics",
        "electronics",
        &[
            ("Laptop", "laptop", "14-inch laptop with 16 GB of memory.", 100_000),
            ("Headphones", "headphones", "Closed-back wireless headphones.", 12_999),
        ],
    ),
    (
        "Tea",
        "tea",
        &[
            ("Green Tea", "green-tea", "Loose-leaf sencha, 100 g.", 850),
            ("Black Tea", "black-tea", "Assam breakfast blend, 100 g.", 725),
        ],
    ),
];

/// Insert the demo catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    let store = PgStore::new(connect().await?);

    let mut created = 0_usize;
    for (category_name, category_slug, products) in CATALOG {
        let category = store.upsert_category(category_name, category_slug).await?;

        for (name, slug, description, cents) in *products {
            let price = Price::new(Decimal::new(*cents, 2)).map_err(|e| {
                RepositoryError::DataCorruption(format!("seed price for {slug}: {e}"))
            })?;

            match store
                .create_product(category.id, name, slug, description, price, true)
                .await
            {
                Ok(product) => {
                    created += 1;
                    tracing::info!(id = %product.id, %slug, "Created product");
                }
                Err(RepositoryError::Conflict(_)) => {
                    tracing::debug!(%slug, "Product already exists, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    tracing::info!(created, "Seeding complete");
    Ok(())
}
