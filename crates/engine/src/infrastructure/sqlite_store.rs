//! SQLite-backed character store.
//!
//! The aggregate is one JSON document row. Every natural grant key goes into
//! `character_grant_keys`, whose `UNIQUE` constraint is the storage-level
//! guard against duplicate classes, spells, languages, slot rows, counters
//! and feature selections. A save rewrites both inside one transaction.

use async_trait::async_trait;
use sheetsmith_domain::{Character, CharacterId};
use sqlx::{Row, SqlitePool};

use crate::infrastructure::ports::{CharacterStore, RepoError};

pub struct SqliteCharacterStore {
    pool: SqlitePool,
}

impl SqliteCharacterStore {
    /// Open (creating if needed) the database at `db_path` and its schema.
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                document TEXT NOT NULL,
                updated_at TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("migrate", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS character_grant_keys (
                character_id TEXT NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                grant_key TEXT NOT NULL,
                UNIQUE (character_id, kind, grant_key)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("migrate", e))?;

        Ok(Self { pool })
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}

fn decode(document: &str) -> Result<Character, RepoError> {
    serde_json::from_str(document).map_err(RepoError::serialization)
}

#[async_trait]
impl CharacterStore for SqliteCharacterStore {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        let row = sqlx::query("SELECT document FROM characters WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get", e))?;

        match row {
            Some(row) => {
                let document: String = row.get("document");
                decode(&document).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, character: &Character) -> Result<(), RepoError> {
        let document = serde_json::to_string(character).map_err(RepoError::serialization)?;
        let id = character.id().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("save", e))?;

        sqlx::query(
            r#"
            INSERT INTO characters (id, name, document, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                document = excluded.document,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(character.name().as_str())
        .bind(&document)
        .bind(character.updated_at().map(|t| t.to_rfc3339()))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("save", e))?;

        sqlx::query("DELETE FROM character_grant_keys WHERE character_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("save", e))?;

        for key in character.grant_keys() {
            let inserted = sqlx::query(
                "INSERT INTO character_grant_keys (character_id, kind, grant_key) VALUES (?, ?, ?)",
            )
            .bind(&id)
            .bind(key.kind)
            .bind(&key.key)
            .execute(&mut *tx)
            .await;

            if let Err(e) = inserted {
                tx.rollback()
                    .await
                    .map_err(|e| RepoError::database("save", e))?;
                return Err(if is_unique_violation(&e) {
                    tracing::warn!(
                        character_id = %character.id(),
                        kind = key.kind,
                        key = %key.key,
                        "Rejected save with duplicate grant"
                    );
                    RepoError::conflict(format!("duplicate {} '{}'", key.kind, key.key))
                } else {
                    RepoError::database("save", e)
                });
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("save", e))?;
        Ok(())
    }

    async fn delete(&self, id: CharacterId) -> Result<(), RepoError> {
        let id = id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("delete", e))?;
        sqlx::query("DELETE FROM character_grant_keys WHERE character_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("delete", e))?;
        sqlx::query("DELETE FROM characters WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("delete", e))?;
        tx.commit()
            .await
            .map_err(|e| RepoError::database("delete", e))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Character>, RepoError> {
        let rows = sqlx::query("SELECT document FROM characters ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list", e))?;

        rows.iter()
            .map(|row| decode(&row.get::<String, _>("document")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{duplicate_language_character, level_one};

    async fn store(dir: &tempfile::TempDir) -> SqliteCharacterStore {
        let path = dir.path().join("characters.db");
        SqliteCharacterStore::new(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn round_trips_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let character = level_one("Vex", "cleric");

        store.save(&character).await.unwrap();
        store.save(&character).await.unwrap();

        assert_eq!(store.get(character.id()).await.unwrap(), Some(character.clone()));
        assert_eq!(store.list().await.unwrap(), vec![character]);
    }

    #[tokio::test]
    async fn reopening_keeps_characters() {
        let dir = tempfile::tempdir().unwrap();
        let character = level_one("Vex", "wizard");
        store(&dir).await.save(&character).await.unwrap();

        let reopened = store(&dir).await;
        assert_eq!(reopened.get(character.id()).await.unwrap(), Some(character));
    }

    #[tokio::test]
    async fn duplicate_grant_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let original = level_one("Vex", "cleric");
        store.save(&original).await.unwrap();

        let err = store
            .save(&duplicate_language_character(original.clone()))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get(original.id()).await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn delete_cascades() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let character = level_one("Vex", "cleric");
        store.save(&character).await.unwrap();
        store.delete(character.id()).await.unwrap();

        assert!(store.get(character.id()).await.unwrap().is_none());
        let keys: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM character_grant_keys")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(keys, 0);
    }
}
