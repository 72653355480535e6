use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::category::{default_categories, validate_sku_code, Category, CategoryTree};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>("SELECT id, name, slug, parent_id, sku_code FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn tree(&self) -> Result<CategoryTree> { Ok(CategoryTree::new(self.list().await?)) }

    pub async fn get(&self, id: Uuid) -> Result<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug, parent_id, sku_code FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ShopError::NotFound("category"))
    }

    pub async fn create(&self, category: Category) -> Result<Category> {
        self.tree().await?.check_parent(category.id, category.parent_id)?;
        sqlx::query("INSERT INTO categories (id, name, slug, parent_id, sku_code) VALUES ($1, $2, $3, $4, $5)")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(category.parent_id)
            .bind(&category.sku_code)
            .execute(&self.pool)
            .await?;
        tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    /// Renames or moves a category. Moving it under its own subtree is rejected.
    pub async fn update(&self, id: Uuid, name: &str, slug: Option<&str>, parent_id: Option<Uuid>, sku_code: Option<&str>) -> Result<Category> {
        let tree = self.tree().await?;
        if tree.get(id).is_none() { return Err(ShopError::NotFound("category")); }
        tree.check_parent(id, parent_id)?;
        let updated = Category { id, ..Category::new(name, slug, parent_id, sku_code)? };
        sqlx::query("UPDATE categories SET name = $2, slug = $3, parent_id = $4, sku_code = $5 WHERE id = $1")
            .bind(id)
            .bind(&updated.name)
            .bind(&updated.slug)
            .bind(updated.parent_id)
            .bind(&updated.sku_code)
            .execute(&self.pool)
            .await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let tree = self.tree().await?;
        if tree.get(id).is_none() { return Err(ShopError::NotFound("category")); }
        let (products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        tree.check_deletable(id, products)?;
        sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.pool).await?;
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }

    /// Inserts the default forest into an empty table. Returns how many rows were added.
    pub async fn seed_defaults(&self) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories").fetch_one(&mut *tx).await?;
        if existing > 0 {
            tracing::info!(existing, "categories already present, skipping seed");
            return Ok(0);
        }
        let categories = default_categories();
        for category in &categories {
            let sku_code = category.sku_code.as_deref().map(validate_sku_code).transpose()?;
            sqlx::query("INSERT INTO categories (id, name, slug, parent_id, sku_code) VALUES ($1, $2, $3, $4, $5)")
                .bind(category.id)
                .bind(&category.name)
                .bind(&category.slug)
                .bind(category.parent_id)
                .bind(sku_code)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        tracing::info!(count = categories.len(), "default categories seeded");
        Ok(categories.len())
    }
}
