//! Products, their options and values, and their variants.
//!
//! Every write that touches variants runs in one transaction and locks the
//! product row first, so concurrent edits of one product serialize.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::cart::Purchasable;
use crate::domain::aggregates::category::Category;
use crate::domain::aggregates::product::{
    CategoryAttributes, Product, ProductDetail, ProductDetails, ProductError, ProductKind, ProductVariant, VariantOption, VariantValue,
};
use crate::domain::aggregates::wizard::WizardCommit;
use crate::domain::events::{log_events, DomainEvent, ProductEvent};
use crate::domain::services::catalog::ProductListing;
use crate::domain::services::combinations::{expand, Axis, CombinationKey};
use crate::domain::services::pricing::PricingRules;
use crate::domain::services::reconciliation::{collect_submissions, reconcile, NewVariant, ReconcilePlan, VariantInput, VariantUpdate};
use crate::domain::services::sku::{generate_unique_sku, sku_stem};
use crate::domain::services::structure::{plan_structure, OptionInput};
use crate::domain::value_objects::{Sku, SkuError};
use crate::{Result, ShopError};

const PRODUCT_COLUMNS: &str =
    "id, category_id, name, description, image_ref, is_variant_parent, sku, price, environmental_impact, stock, attributes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    category_id: Option<Uuid>,
    name: String,
    description: String,
    image_ref: Option<String>,
    is_variant_parent: bool,
    sku: Option<String>,
    price: Option<Decimal>,
    environmental_impact: Option<Decimal>,
    stock: Option<i32>,
    attributes: Option<Json<CategoryAttributes>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Result<Product> {
        let kind = if self.is_variant_parent {
            ProductKind::VariantParent
        } else {
            match (self.sku, self.price, self.environmental_impact, self.stock) {
                (Some(sku), Some(price), Some(impact), Some(stock)) => ProductKind::Simple { sku: Sku::new(sku)?, price, impact, stock },
                _ => return Err(corrupt("simple product without SKU, price, impact or stock")),
            }
        };
        let details = ProductDetails {
            name: self.name,
            description: self.description,
            image_ref: self.image_ref,
            category_id: self.category_id,
            attributes: self.attributes.map(|a| a.0),
        };
        Ok(Product::restore(self.id, details, kind, self.created_at, self.updated_at))
    }
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    position: i32,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    sku: String,
    price: Decimal,
    environmental_impact: Decimal,
    stock: i32,
    value_ids: Vec<Uuid>,
}

/// What the cart needs to know about a variant or simple product.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Purchase {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub impact: Decimal,
    pub stock: i32,
}

fn corrupt(what: &str) -> ShopError { ShopError::Database(sqlx::Error::Protocol(what.to_string())) }

fn axes_of(options: &[VariantOption]) -> Vec<Axis<VariantValue>> {
    options.iter().map(|o| Axis::new(o.name.clone(), o.values.clone())).collect()
}

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
    sku_max_attempts: u32,
}

impl ProductRepository {
    pub fn new(pool: PgPool, sku_max_attempts: u32) -> Self { Self { pool, sku_max_attempts } }

    /// One row per product with effective (minimum variant) price and impact.
    pub async fn listings(&self) -> Result<Vec<ProductListing>> {
        let rows = sqlx::query_as::<_, ProductListing>(
            "SELECT p.id, p.name, p.description, p.image_ref, p.category_id, p.is_variant_parent, \
                    CASE WHEN p.is_variant_parent THEN MIN(v.price) ELSE p.price END AS effective_price, \
                    CASE WHEN p.is_variant_parent THEN MIN(v.environmental_impact) ELSE p.environmental_impact END AS effective_impact, \
                    (CASE WHEN p.is_variant_parent THEN COALESCE(SUM(v.stock), 0) ELSE COALESCE(p.stock, 0) END)::BIGINT AS total_stock \
             FROM products p LEFT JOIN product_variants v ON v.product_id = p.id \
             GROUP BY p.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn detail(&self, id: Uuid) -> Result<ProductDetail> {
        let mut conn = self.pool.acquire().await?;
        let product = fetch_product(&mut conn, id, false).await?;
        let options = fetch_options(&mut conn, id).await?;
        let variants = fetch_variants(&mut conn, id).await?;
        Ok(ProductDetail { product, options, variants })
    }

    pub async fn create_simple(&self, details: ProductDetails, price: Decimal, impact: Decimal, stock: i32) -> Result<Product> {
        details.validate()?;
        let mut tx = self.pool.begin().await?;
        let category = fetch_category(&mut tx, details.category_id).await?;
        let stem = sku_stem::<&str>(category.as_ref(), &details.name, &[]);
        let taken = fetch_taken_skus(&mut tx, &[stem.as_str()]).await?;
        let sku = generate_unique_sku(&stem, &mut rand::thread_rng(), self.sku_max_attempts, |s| taken.contains(s.as_str()))?;
        let mut product = Product::create_simple(details, sku, price, impact, stock)?;
        insert_product(&mut tx, &product).await?;
        tx.commit().await?;
        log_events(product.take_events());
        Ok(product)
    }

    /// Persists a finished wizard draft: product, options, values and variants.
    /// The result is built from what was written, so nothing is read back
    /// after the commit.
    pub async fn create_from_wizard(&self, commit: WizardCommit) -> Result<ProductDetail> {
        let WizardCommit { mut product, options, plan } = commit;
        let mut tx = self.pool.begin().await?;
        let category = fetch_category(&mut tx, product.category_id()).await?;
        let skus = self.mint_skus(&mut tx, category.as_ref(), product.name(), &plan.to_create).await?;
        insert_product(&mut tx, &product).await?;
        upsert_options(&mut tx, &options).await?;
        let variants = create_variants(&mut tx, product.id(), &plan.to_create, skus).await?;
        tx.commit().await?;

        let mut events = product.take_events();
        events.push(plan.event(product.id()));
        log_events(events);
        Ok(ProductDetail { product, options, variants })
    }

    pub async fn update_details(&self, id: Uuid, details: ProductDetails) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let mut product = fetch_product(&mut tx, id, true).await?;
        product.update_details(details)?;
        sqlx::query(
            "UPDATE products SET name = $2, description = $3, image_ref = $4, category_id = $5, attributes = $6, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(product.name())
        .bind(product.description())
        .bind(product.image_ref())
        .bind(product.category_id())
        .bind(product.attributes().map(Json))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(product)
    }

    pub async fn update_stock_keeping(&self, id: Uuid, price: Decimal, impact: Decimal, stock: i32) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let mut product = fetch_product(&mut tx, id, true).await?;
        product.update_stock_keeping(price, impact, stock)?;
        if let ProductKind::Simple { price, impact, stock, .. } = product.kind() {
            sqlx::query("UPDATE products SET price = $2, environmental_impact = $3, stock = $4, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(price)
                .bind(impact)
                .bind(stock)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(product)
    }

    /// Replaces the option structure of a variant parent and reconciles its
    /// variants to match. New combinations take `rules` defaults.
    pub async fn replace_options(&self, id: Uuid, desired: &[OptionInput], rules: &PricingRules) -> Result<ReconcilePlan> {
        let mut tx = self.pool.begin().await?;
        let product = fetch_product(&mut tx, id, true).await?;
        if !product.is_variant_parent() { return Err(ProductError::NotVariantParent.into()); }
        let current = fetch_options(&mut tx, id).await?;
        let existing = fetch_variants(&mut tx, id).await?;

        let change = plan_structure(id, &current, desired)?;
        let axes = axes_of(&change.options);
        rules.validate(&axes)?;
        let combinations = expand(&axes)?.into_combinations();
        let plan = reconcile(&combinations, &existing, &HashMap::new(), rules)?;
        if change.is_unchanged(&current) && plan.is_noop() {
            return Ok(plan);
        }

        let category = fetch_category(&mut tx, product.category_id()).await?;
        let skus = self.mint_skus(&mut tx, category.as_ref(), product.name(), &plan.to_create).await?;
        delete_variants(&mut tx, &plan.to_delete).await?;
        sqlx::query("DELETE FROM variant_values WHERE id = ANY($1)").bind(&change.removed_values).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM variant_options WHERE id = ANY($1)").bind(&change.removed_options).execute(&mut *tx).await?;
        upsert_options(&mut tx, &change.options).await?;
        apply_updates(&mut tx, &plan.to_update).await?;
        create_variants(&mut tx, id, &plan.to_create, skus).await?;
        tx.commit().await?;

        tracing::info!(
            product_id = %id,
            new_options = change.new_options.len(),
            new_values = change.new_values.len(),
            removed_options = change.removed_options.len(),
            removed_values = change.removed_values.len(),
            "variant options replaced"
        );
        log_events([plan.event(id)]);
        Ok(plan)
    }

    /// Applies admin edits of price, impact and stock per combination.
    pub async fn update_variants(&self, id: Uuid, submissions: Vec<(CombinationKey, VariantInput)>) -> Result<ReconcilePlan> {
        let mut tx = self.pool.begin().await?;
        let product = fetch_product(&mut tx, id, true).await?;
        if !product.is_variant_parent() { return Err(ProductError::NotVariantParent.into()); }
        let options = fetch_options(&mut tx, id).await?;
        let existing = fetch_variants(&mut tx, id).await?;

        let combinations = expand(&axes_of(&options))?.into_combinations();
        let submissions = collect_submissions(submissions)?;
        let plan = reconcile(&combinations, &existing, &submissions, &PricingRules::default())?;
        if plan.is_noop() {
            return Ok(plan);
        }

        let category = fetch_category(&mut tx, product.category_id()).await?;
        let skus = self.mint_skus(&mut tx, category.as_ref(), product.name(), &plan.to_create).await?;
        delete_variants(&mut tx, &plan.to_delete).await?;
        apply_updates(&mut tx, &plan.to_update).await?;
        create_variants(&mut tx, id, &plan.to_create, skus).await?;
        tx.commit().await?;
        log_events([plan.event(id)]);
        Ok(plan)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        fetch_product(&mut tx, id, true).await?;
        sqlx::query("DELETE FROM variant_combinations WHERE variant_id IN (SELECT id FROM product_variants WHERE product_id = $1)")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM product_variants WHERE product_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM variant_values WHERE option_id IN (SELECT id FROM variant_options WHERE product_id = $1)")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM variant_options WHERE product_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        log_events([DomainEvent::Product(ProductEvent::Deleted { product_id: id })]);
        Ok(())
    }

    /// Current price, impact and stock of a cart target.
    pub async fn purchasable(&self, item: Purchasable) -> Result<Purchase> {
        let found = match item {
            Purchasable::Variant(id) => {
                sqlx::query_as::<_, Purchase>(
                    "SELECT p.id AS product_id, \
                            p.name || ' (' || COALESCE(string_agg(vv.value, ' / ' ORDER BY vo.position), '') || ')' AS name, \
                            pv.sku, pv.price, pv.environmental_impact AS impact, pv.stock \
                     FROM product_variants pv \
                     JOIN products p ON p.id = pv.product_id \
                     LEFT JOIN variant_combinations vc ON vc.variant_id = pv.id \
                     LEFT JOIN variant_values vv ON vv.id = vc.value_id \
                     LEFT JOIN variant_options vo ON vo.id = vv.option_id \
                     WHERE pv.id = $1 \
                     GROUP BY p.id, pv.id",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            Purchasable::Product(id) => {
                sqlx::query_as::<_, Purchase>(
                    "SELECT id AS product_id, name, sku, price, environmental_impact AS impact, stock \
                     FROM products WHERE id = $1 AND NOT is_variant_parent",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        found.ok_or(ShopError::NotFound("product"))
    }

    /// SKUs for every variant a plan creates. They are all drawn before the
    /// pass writes anything, so a collision leaves the product untouched.
    async fn mint_skus(&self, conn: &mut PgConnection, category: Option<&Category>, product_name: &str, to_create: &[NewVariant]) -> Result<Vec<Sku>> {
        if to_create.is_empty() {
            return Ok(Vec::new());
        }
        let stems: Vec<String> = to_create.iter().map(|new| sku_stem(category, product_name, &new.labels)).collect();
        let mut taken = fetch_taken_skus(conn, &stems).await?;
        let skus = assign_skus(&stems, &mut taken, &mut rand::thread_rng(), self.sku_max_attempts)?;
        Ok(skus)
    }
}

/// Draws one SKU per stem, avoiding `taken` and each other. Fails as a whole
/// on the first stem that cannot be given a free SKU.
fn assign_skus<R: Rng + ?Sized>(stems: &[String], taken: &mut HashSet<String>, rng: &mut R, max_attempts: u32) -> std::result::Result<Vec<Sku>, SkuError> {
    let mut skus = Vec::with_capacity(stems.len());
    for stem in stems {
        let sku = generate_unique_sku(stem, rng, max_attempts, |s| taken.contains(s.as_str()))?;
        taken.insert(sku.as_str().to_string());
        skus.push(sku);
    }
    Ok(skus)
}

/// Stored SKUs, among products and variants, that start with any of `stems`.
async fn fetch_taken_skus<S: AsRef<str>>(conn: &mut PgConnection, stems: &[S]) -> Result<HashSet<String>> {
    let patterns: Vec<String> = stems.iter().map(|stem| format!("{}-%", stem.as_ref())).collect();
    let taken = sqlx::query_scalar::<_, String>(
        "SELECT sku FROM product_variants WHERE sku LIKE ANY($1) UNION SELECT sku FROM products WHERE sku LIKE ANY($1)",
    )
    .bind(&patterns)
    .fetch_all(&mut *conn)
    .await?;
    Ok(taken.into_iter().collect())
}

async fn create_variants(conn: &mut PgConnection, product_id: Uuid, to_create: &[NewVariant], skus: Vec<Sku>) -> Result<Vec<ProductVariant>> {
    let mut created = Vec::with_capacity(to_create.len());
    for (new, sku) in to_create.iter().zip(skus) {
        let variant_id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO product_variants (id, product_id, sku, price, environmental_impact, stock) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(variant_id)
        .bind(product_id)
        .bind(sku.as_str())
        .bind(new.fields.price)
        .bind(new.fields.impact)
        .bind(new.fields.stock)
        .execute(&mut *conn)
        .await?;
        sqlx::query("INSERT INTO variant_combinations (variant_id, value_id) SELECT $1, UNNEST($2::uuid[])")
            .bind(variant_id)
            .bind(&new.value_ids)
            .execute(&mut *conn)
            .await?;
        tracing::debug!(%variant_id, %sku, "variant created");
        created.push(written_variant(variant_id, product_id, new, sku));
    }
    Ok(created)
}

/// The variant row as `create_variants` wrote it.
fn written_variant(id: Uuid, product_id: Uuid, new: &NewVariant, sku: Sku) -> ProductVariant {
    ProductVariant {
        id,
        product_id,
        sku,
        price: new.fields.price,
        impact: new.fields.impact,
        stock: new.fields.stock,
        value_ids: new.value_ids.clone(),
    }
}

async fn fetch_product(conn: &mut PgConnection, id: Uuid, lock: bool) -> Result<Product> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1{}", if lock { " FOR UPDATE" } else { "" });
    sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(ShopError::NotFound("product"))?
        .into_product()
}

async fn fetch_category(conn: &mut PgConnection, id: Option<Uuid>) -> Result<Option<Category>> {
    let Some(id) = id else { return Ok(None) };
    let category = sqlx::query_as::<_, Category>("SELECT id, name, slug, parent_id, sku_code FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(ShopError::NotFound("category"))?;
    Ok(Some(category))
}

async fn fetch_options(conn: &mut PgConnection, product_id: Uuid) -> Result<Vec<VariantOption>> {
    let options = sqlx::query_as::<_, OptionRow>("SELECT id, product_id, name, position FROM variant_options WHERE product_id = $1 ORDER BY position")
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    let values = sqlx::query_as::<_, VariantValue>(
        "SELECT vv.id, vv.option_id, vv.value, vv.position FROM variant_values vv \
         JOIN variant_options vo ON vo.id = vv.option_id \
         WHERE vo.product_id = $1 ORDER BY vv.position",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_option: HashMap<Uuid, Vec<VariantValue>> = HashMap::new();
    for value in values {
        by_option.entry(value.option_id).or_default().push(value);
    }
    Ok(options
        .into_iter()
        .map(|o| VariantOption { values: by_option.remove(&o.id).unwrap_or_default(), id: o.id, product_id: o.product_id, name: o.name, position: o.position })
        .collect())
}

async fn fetch_variants(conn: &mut PgConnection, product_id: Uuid) -> Result<Vec<ProductVariant>> {
    let rows = sqlx::query_as::<_, VariantRow>(
        "SELECT pv.id, pv.product_id, pv.sku, pv.price, pv.environmental_impact, pv.stock, \
                COALESCE(array_agg(vc.value_id ORDER BY vo.position) FILTER (WHERE vc.value_id IS NOT NULL), '{}') AS value_ids \
         FROM product_variants pv \
         LEFT JOIN variant_combinations vc ON vc.variant_id = pv.id \
         LEFT JOIN variant_values vv ON vv.id = vc.value_id \
         LEFT JOIN variant_options vo ON vo.id = vv.option_id \
         WHERE pv.product_id = $1 \
         GROUP BY pv.id \
         ORDER BY pv.id",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter()
        .map(|r| {
            Ok(ProductVariant {
                id: r.id,
                product_id: r.product_id,
                sku: Sku::new(r.sku)?,
                price: r.price,
                impact: r.environmental_impact,
                stock: r.stock,
                value_ids: r.value_ids,
            })
        })
        .collect()
}

async fn insert_product(conn: &mut PgConnection, product: &Product) -> Result<()> {
    let (sku, price, impact, stock) = match product.kind() {
        ProductKind::Simple { sku, price, impact, stock } => (Some(sku.as_str()), Some(*price), Some(*impact), Some(*stock)),
        ProductKind::VariantParent => (None, None, None, None),
    };
    sqlx::query(
        "INSERT INTO products (id, category_id, name, description, image_ref, is_variant_parent, sku, price, environmental_impact, stock, attributes, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)",
    )
    .bind(product.id())
    .bind(product.category_id())
    .bind(product.name())
    .bind(product.description())
    .bind(product.image_ref())
    .bind(product.is_variant_parent())
    .bind(sku)
    .bind(price)
    .bind(impact)
    .bind(stock)
    .bind(product.attributes().map(Json))
    .bind(product.created_at())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Inserts options and values, or moves and renames the ones that exist.
async fn upsert_options(conn: &mut PgConnection, options: &[VariantOption]) -> Result<()> {
    for option in options {
        sqlx::query(
            "INSERT INTO variant_options (id, product_id, name, position) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, position = EXCLUDED.position",
        )
        .bind(option.id)
        .bind(option.product_id)
        .bind(&option.name)
        .bind(option.position)
        .execute(&mut *conn)
        .await?;
        for value in &option.values {
            sqlx::query(
                "INSERT INTO variant_values (id, option_id, value, position) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (id) DO UPDATE SET position = EXCLUDED.position",
            )
            .bind(value.id)
            .bind(value.option_id)
            .bind(&value.value)
            .bind(value.position)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

/// Join rows first, then the variants.
async fn delete_variants(conn: &mut PgConnection, ids: &[Uuid]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM variant_combinations WHERE variant_id = ANY($1)").bind(ids).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM product_variants WHERE id = ANY($1)").bind(ids).execute(&mut *conn).await?;
    Ok(())
}

async fn apply_updates(conn: &mut PgConnection, updates: &[VariantUpdate]) -> Result<()> {
    for update in updates {
        sqlx::query("UPDATE product_variants SET price = $2, environmental_impact = $3, stock = $4 WHERE id = $1")
            .bind(update.id)
            .bind(update.fields.price)
            .bind(update.fields.impact)
            .bind(update.fields.stock)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stems(names: &[&str]) -> Vec<String> { names.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn skus_in_one_pass_avoid_stored_ones_and_each_other() {
        let mut taken: HashSet<String> = ["GLV-FG-M-R-AAAA".to_string()].into();
        let mut rng = StdRng::seed_from_u64(11);
        let skus = assign_skus(&stems(&["GLV-FG-M-R", "GLV-FG-M-R", "GLV-FG-L-R"]), &mut taken, &mut rng, 8).unwrap();
        assert_eq!(skus.len(), 3);
        assert_ne!(skus[0], skus[1]);
        assert!(skus[2].as_str().starts_with("GLV-FG-L-R-"));
        assert!(skus.iter().all(|s| s.as_str() != "GLV-FG-M-R-AAAA"));
        assert_eq!(taken.len(), 4);
    }

    #[test]
    fn one_unplaceable_sku_fails_the_whole_pass() {
        // Always draws the suffix "AAAA".
        let mut rng = StepRng::new(0, 0);
        let mut taken: HashSet<String> = ["GLV-FG-M-AAAA".to_string()].into();
        let err = assign_skus(&stems(&["GLV-FG-S", "GLV-FG-M"]), &mut taken, &mut rng, 3).unwrap_err();
        assert_eq!(err, SkuError::Exhausted(3));

        let mut taken = HashSet::new();
        let err = assign_skus(&stems(&["GLV-FG-S", "GLV-FG-S"]), &mut taken, &mut rng, 3).unwrap_err();
        assert_eq!(err, SkuError::Exhausted(3));
    }

    #[test]
    fn written_variant_mirrors_the_planned_one() {
        let (size, hand) = (Uuid::now_v7(), Uuid::now_v7());
        let new = NewVariant {
            key: [size, hand].into_iter().collect(),
            value_ids: vec![size, hand],
            labels: vec!["Large".into(), "Left".into()],
            fields: VariantInput { price: Decimal::new(55, 0), impact: Decimal::new(2, 0), stock: 3 },
        };
        let (id, product_id) = (Uuid::now_v7(), Uuid::now_v7());
        let sku = Sku::new("GLV-FG-L-L-7K2Q").unwrap();
        let variant = written_variant(id, product_id, &new, sku.clone());
        assert_eq!((variant.id, variant.product_id, variant.sku), (id, product_id, sku));
        assert_eq!((variant.price, variant.impact, variant.stock), (Decimal::new(55, 0), Decimal::new(2, 0), 3));
        assert_eq!(variant.value_ids, vec![size, hand]);
    }

    #[test]
    fn empty_pass_needs_no_skus() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(assign_skus(&[], &mut HashSet::new(), &mut rng, 8).unwrap().is_empty());
    }
}
