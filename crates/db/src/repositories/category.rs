//! Category repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::categories;

/// Error types for category operations.
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    /// Category not found (or owned by someone else).
    #[error("Category not found: {0}")]
    NotFound(Uuid),

    /// Name must not be blank.
    #[error("Category name must not be empty")]
    EmptyName,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for updating a category.
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    /// New name.
    pub name: Option<String>,
    /// New group; `Some(None)` clears it.
    pub group_name: Option<Option<String>>,
}

/// Category repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    /// Creates a new category repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a category for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::EmptyName` for a blank name, or a database
    /// error.
    pub async fn create_category(
        &self,
        owner: Uuid,
        name: &str,
        group_name: Option<String>,
    ) -> Result<categories::Model, CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }

        let txn = self.db.begin().await?;
        let now = chrono::Utc::now().into();
        let category = categories::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(owner),
            name: Set(name.to_string()),
            group_name: Set(group_name.filter(|g| !g.trim().is_empty())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        Ok(category)
    }

    /// Lists the owner's categories by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_categories(&self, owner: Uuid) -> Result<Vec<categories::Model>, CategoryError> {
        Ok(categories::Entity::find()
            .filter(categories::Column::UserId.eq(owner))
            .order_by_asc(categories::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Finds one of the owner's categories.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::NotFound` if the category is not the owner's.
    pub async fn find_category(
        &self,
        owner: Uuid,
        id: Uuid,
    ) -> Result<categories::Model, CategoryError> {
        categories::Entity::find_by_id(id)
            .filter(categories::Column::UserId.eq(owner))
            .one(&self.db)
            .await?
            .ok_or(CategoryError::NotFound(id))
    }

    /// Deletes one of the owner's categories.
    ///
    /// Its allocations go with it; transactions and bills keep their rows
    /// and lose the category.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::NotFound` if the category is not the owner's.
    pub async fn delete_category(&self, owner: Uuid, id: Uuid) -> Result<(), CategoryError> {
        let txn = self.db.begin().await?;
        let result = categories::Entity::delete_many()
            .filter(categories::Column::Id.eq(id))
            .filter(categories::Column::UserId.eq(owner))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(CategoryError::NotFound(id));
        }
        txn.commit().await?;
        Ok(())
    }

    /// Renames or regroups one of the owner's categories.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::NotFound` if the category is not the owner's.
    pub async fn update_category(
        &self,
        owner: Uuid,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<categories::Model, CategoryError> {
        let txn = self.db.begin().await?;
        let category = categories::Entity::find_by_id(id)
            .filter(categories::Column::UserId.eq(owner))
            .one(&txn)
            .await?
            .ok_or(CategoryError::NotFound(id))?;

        let mut active: categories::ActiveModel = category.into();
        if let Some(name) = input.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(CategoryError::EmptyName);
            }
            active.name = Set(name.to_string());
        }
        if let Some(group_name) = input.group_name {
            active.group_name = Set(group_name.filter(|g| !g.trim().is_empty()));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }
}
