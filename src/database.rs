use crate::model::{Item, ItemImage, Swap, SwapMessage, User, ACTIVE_STATUSES};
use crate::{ItemId, Result, RewearError, SwapId, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sizes: Vec<String>,
    pub conditions: Vec<String>,
    pub brand: Option<String>,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::from_str(database_url)?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .foreign_keys(true),
        )
        .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                brand TEXT NOT NULL DEFAULT '',
                size TEXT NOT NULL DEFAULT '',
                color TEXT NOT NULL DEFAULT '',
                condition TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                points INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS item_images (
                id TEXT PRIMARY KEY,
                item_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS swaps (
                id TEXT PRIMARY KEY,
                proposer_id TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                proposer_item_id TEXT NOT NULL,
                receiver_item_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                is_read BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                FOREIGN KEY (proposer_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (receiver_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (proposer_item_id) REFERENCES items(id) ON DELETE CASCADE,
                FOREIGN KEY (receiver_item_id) REFERENCES items(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS swap_messages (
                id TEXT PRIMARY KEY,
                swap_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (swap_id) REFERENCES swaps(id) ON DELETE CASCADE,
                FOREIGN KEY (sender_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id);
            CREATE INDEX IF NOT EXISTS idx_items_category ON items(category);
            CREATE INDEX IF NOT EXISTS idx_items_created ON items(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_images_item ON item_images(item_id);
            CREATE INDEX IF NOT EXISTS idx_swaps_proposer ON swaps(proposer_id);
            CREATE INDEX IF NOT EXISTS idx_swaps_receiver ON swaps(receiver_id);
            CREATE INDEX IF NOT EXISTS idx_swaps_status ON swaps(status);
            CREATE INDEX IF NOT EXISTS idx_messages_swap ON swap_messages(swap_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>(0) > 0)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, full_name, password_hash, created_at
            FROM users WHERE id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, full_name, password_hash, created_at
            FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn create_item_with_images(&self, item: &Item, images: &[ItemImage]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO items (id, owner_id, title, description, category, brand, size, color, condition, tags, status, points, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.owner_id.to_string())
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(&item.brand)
        .bind(&item.size)
        .bind(&item.color)
        .bind(item.condition.as_str())
        .bind(&item.tags)
        .bind(&item.status)
        .bind(item.points)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await?;

        for image in images {
            sqlx::query(
                r#"
                INSERT INTO item_images (id, item_id, file_name, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(image.id.to_string())
            .bind(image.item_id.to_string())
            .bind(&image.file_name)
            .bind(image.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_item(&self, item_id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ITEM))
            .bind(item_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    pub async fn get_item_owned_by(&self, item_id: ItemId, owner: UserId) -> Result<Option<Item>> {
        let row = sqlx::query(&format!("{} WHERE id = ? AND owner_id = ?", SELECT_ITEM))
            .bind(item_id.to_string())
            .bind(owner.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    // Clauses are collected first and the binds follow in the same order.
    pub async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(search) = &filter.search {
            clauses.push(
                r"(title LIKE ? ESCAPE '\' OR description LIKE ? ESCAPE '\' OR brand LIKE ? ESCAPE '\' OR category LIKE ? ESCAPE '\' OR tags LIKE ? ESCAPE '\')"
                    .to_string(),
            );
            let needle = format!("%{}%", escape_like(search));
            for _ in 0..5 {
                binds.push(needle.clone());
            }
        }
        if let Some(category) = &filter.category {
            clauses.push("LOWER(category) = LOWER(?)".to_string());
            binds.push(category.clone());
        }
        if !filter.sizes.is_empty() {
            clauses.push(format!("size IN ({})", placeholders(filter.sizes.len())));
            binds.extend(filter.sizes.iter().cloned());
        }
        if !filter.conditions.is_empty() {
            clauses.push(format!(
                "condition IN ({})",
                placeholders(filter.conditions.len())
            ));
            binds.extend(filter.conditions.iter().cloned());
        }
        if let Some(brand) = &filter.brand {
            clauses.push("LOWER(brand) = LOWER(?)".to_string());
            binds.push(brand.clone());
        }

        let mut sql = SELECT_ITEM.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut items = Vec::new();
        for row in &rows {
            items.push(item_from_row(row)?);
        }
        Ok(items)
    }

    pub async fn list_items_by_owner(&self, owner: UserId) -> Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "{} WHERE owner_id = ? ORDER BY created_at DESC",
            SELECT_ITEM
        ))
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::new();
        for row in &rows {
            items.push(item_from_row(row)?);
        }
        Ok(items)
    }

    pub async fn list_available_items(&self, owner: UserId) -> Result<Vec<Item>> {
        let sql = format!(
            r#"
            {} WHERE owner_id = ?
            AND NOT EXISTS (
                SELECT 1 FROM swaps
                WHERE swaps.status IN ({})
                  AND (swaps.proposer_item_id = items.id OR swaps.receiver_item_id = items.id)
            )
            ORDER BY created_at DESC
            "#,
            SELECT_ITEM,
            placeholders(ACTIVE_STATUSES.len())
        );

        let mut query = sqlx::query(&sql).bind(owner.to_string());
        for status in ACTIVE_STATUSES {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut items = Vec::new();
        for row in &rows {
            items.push(item_from_row(row)?);
        }
        Ok(items)
    }

    pub async fn get_items_by_ids(&self, item_ids: &[ItemId]) -> Result<HashMap<ItemId, Item>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "{} WHERE id IN ({})",
            SELECT_ITEM,
            placeholders(item_ids.len())
        );

        let mut query = sqlx::query(&sql);
        for id in item_ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut by_id = HashMap::new();
        for row in &rows {
            let item = item_from_row(row)?;
            by_id.insert(item.id, item);
        }
        Ok(by_id)
    }

    pub async fn get_images_for_item(&self, item_id: ItemId) -> Result<Vec<ItemImage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, item_id, file_name, created_at
            FROM item_images WHERE item_id = ? ORDER BY created_at
            "#,
        )
        .bind(item_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut images = Vec::new();
        for row in &rows {
            images.push(image_from_row(row)?);
        }
        Ok(images)
    }

    pub async fn get_images_for_items(
        &self,
        item_ids: &[ItemId],
    ) -> Result<HashMap<ItemId, Vec<ItemImage>>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"
            SELECT id, item_id, file_name, created_at
            FROM item_images WHERE item_id IN ({}) ORDER BY created_at
            "#,
            placeholders(item_ids.len())
        );

        let mut query = sqlx::query(&sql);
        for id in item_ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut by_item: HashMap<ItemId, Vec<ItemImage>> = HashMap::new();
        for row in &rows {
            let image = image_from_row(row)?;
            by_item.entry(image.item_id).or_default().push(image);
        }
        Ok(by_item)
    }

    // The insert only lands if neither item is held by an active swap,
    // checked and written in the same statement.
    pub async fn create_swap(&self, swap: &Swap) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO swaps (id, proposer_id, receiver_id, proposer_item_id, receiver_item_id, status, is_read, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM swaps
                WHERE status IN ({})
                  AND (proposer_item_id IN (?, ?) OR receiver_item_id IN (?, ?))
            )
            "#,
            placeholders(ACTIVE_STATUSES.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(swap.id.to_string())
            .bind(swap.proposer_id.to_string())
            .bind(swap.receiver_id.to_string())
            .bind(swap.proposer_item_id.to_string())
            .bind(swap.receiver_item_id.to_string())
            .bind(swap.status.as_str())
            .bind(swap.is_read)
            .bind(swap.created_at)
            .bind(swap.updated_at);
        for status in ACTIVE_STATUSES {
            query = query.bind(status.as_str());
        }
        let result = query
            .bind(swap.proposer_item_id.to_string())
            .bind(swap.receiver_item_id.to_string())
            .bind(swap.proposer_item_id.to_string())
            .bind(swap.receiver_item_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RewearError::Validation(
                "One of the items is already part of an active swap.".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn get_swap_for_user(&self, swap_id: SwapId, user: UserId) -> Result<Option<Swap>> {
        let row = sqlx::query(&format!(
            "{} WHERE id = ? AND (proposer_id = ? OR receiver_id = ?)",
            SELECT_SWAP
        ))
        .bind(swap_id.to_string())
        .bind(user.to_string())
        .bind(user.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(swap_from_row).transpose()
    }

    pub async fn list_swaps_for_user(&self, user: UserId) -> Result<Vec<Swap>> {
        let rows = sqlx::query(&format!(
            "{} WHERE proposer_id = ? OR receiver_id = ? ORDER BY created_at DESC",
            SELECT_SWAP
        ))
        .bind(user.to_string())
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut swaps = Vec::new();
        for row in &rows {
            swaps.push(swap_from_row(row)?);
        }
        Ok(swaps)
    }

    pub async fn update_swap(&self, swap: &Swap) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE swaps SET status = ?, is_read = ?, updated_at = ? WHERE id = ?
            "#,
        )
        .bind(swap.status.as_str())
        .bind(swap.is_read)
        .bind(swap.updated_at)
        .bind(swap.id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Messages go with the swap through the foreign key cascade.
    pub async fn delete_swap(&self, swap_id: SwapId, user: UserId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM swaps WHERE id = ? AND (proposer_id = ? OR receiver_id = ?)
            "#,
        )
        .bind(swap_id.to_string())
        .bind(user.to_string())
        .bind(user.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count_for(&self, user: UserId) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FROM swaps WHERE receiver_id = ? AND is_read = 0
            "#,
        )
        .bind(user.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get(0))
    }

    pub async fn create_swap_message(&self, message: &SwapMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO swap_messages (id, swap_id, sender_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.swap_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_messages_for_swap(
        &self,
        swap_id: SwapId,
    ) -> Result<Vec<(SwapMessage, String)>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.swap_id, m.sender_id, m.content, m.created_at, u.full_name
            FROM swap_messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.swap_id = ?
            ORDER BY m.created_at
            "#,
        )
        .bind(swap_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::new();
        for row in &rows {
            messages.push((message_from_row(row)?, row.get("full_name")));
        }
        Ok(messages)
    }
}

const SELECT_ITEM: &str = "SELECT id, owner_id, title, description, category, brand, size, color, condition, tags, status, points, created_at FROM items";

const SELECT_SWAP: &str = "SELECT id, proposer_id, receiver_id, proposer_item_id, receiver_item_id, status, is_read, created_at, updated_at FROM swaps";

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

// LIKE treats % and _ as wildcards; search input has to match literally.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_")
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        email: row.get("email"),
        full_name: row.get("full_name"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    })
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    Ok(Item {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        owner_id: Uuid::parse_str(&row.get::<String, _>("owner_id"))?,
        title: row.get("title"),
        description: row.get("description"),
        category: row.get::<String, _>("category").parse()?,
        brand: row.get("brand"),
        size: row.get("size"),
        color: row.get("color"),
        condition: row.get::<String, _>("condition").parse()?,
        tags: row.get("tags"),
        status: row.get("status"),
        points: row.get("points"),
        created_at: row.get("created_at"),
    })
}

fn image_from_row(row: &SqliteRow) -> Result<ItemImage> {
    Ok(ItemImage {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        item_id: Uuid::parse_str(&row.get::<String, _>("item_id"))?,
        file_name: row.get("file_name"),
        created_at: row.get("created_at"),
    })
}

fn swap_from_row(row: &SqliteRow) -> Result<Swap> {
    Ok(Swap {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        proposer_id: Uuid::parse_str(&row.get::<String, _>("proposer_id"))?,
        receiver_id: Uuid::parse_str(&row.get::<String, _>("receiver_id"))?,
        proposer_item_id: Uuid::parse_str(&row.get::<String, _>("proposer_item_id"))?,
        receiver_item_id: Uuid::parse_str(&row.get::<String, _>("receiver_item_id"))?,
        status: row.get::<String, _>("status").parse()?,
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn message_from_row(row: &SqliteRow) -> Result<SwapMessage> {
    Ok(SwapMessage {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        swap_id: Uuid::parse_str(&row.get::<String, _>("swap_id"))?,
        sender_id: Uuid::parse_str(&row.get::<String, _>("sender_id"))?,
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}
