//! 로컬 영속 저장소 (SQLite 키-값 테이블)
//!
//! 각 컬렉션을 JSON 으로 직렬화해 고정된 키로 저장합니다.
//! 프로세스를 재시작해도 데이터가 유지됩니다.

use crate::error::{AppError, AppResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

// 컬렉션 키
pub const KEY_CURRENT_USER: &str = "currentUser";
pub const KEY_USERS: &str = "users";
pub const KEY_DOCTORS: &str = "doctors";
pub const KEY_APPOINTMENTS: &str = "appointments";
pub const KEY_RESOURCE_REQUESTS: &str = "resourceRequests";
pub const KEY_HOSPITAL_RESOURCES: &str = "hospitalResources";

/// 키-값 저장소 인터페이스
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// SQLite 기반 저장소
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// 파일 DB 열기 (상위 디렉토리가 없으면 생성)
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        log::info!("[DB] opened {:?}", path);
        Self::init(conn)
    }

    /// 메모리 DB (테스트 및 임시 세션용)
    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn get_conn(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Custom("Database lock error".to_string()))
    }
}

fn create_tables(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// 컬렉션 읽기. 키가 없으면 `None`
pub fn load_collection<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> AppResult<Option<Vec<T>>> {
    match storage.get(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// 컬렉션 전체를 덮어쓰기
pub fn save_collection<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    items: &[T],
) -> AppResult<()> {
    let json = serde_json::to_string(items)?;
    storage.set(key, &json)?;
    log::debug!("[DB] saved {} ({} items)", key, items.len());
    Ok(())
}

/// 단일 값 읽기 (JSON `null` 은 `None`)
pub fn load_value<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> AppResult<Option<T>> {
    match storage.get(key)? {
        Some(json) => Ok(serde_json::from_str::<Option<T>>(&json)?),
        None => Ok(None),
    }
}

pub fn save_value<T: Serialize>(storage: &dyn Storage, key: &str, value: Option<&T>) -> AppResult<()> {
    let json = serde_json::to_string(&value)?;
    storage.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_get_remove() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.get("users").unwrap(), None);

        storage.set("users", "[]").unwrap();
        assert_eq!(storage.get("users").unwrap().as_deref(), Some("[]"));

        storage.set("users", "[1]").unwrap();
        assert_eq!(storage.get("users").unwrap().as_deref(), Some("[1]"));

        storage.remove("users").unwrap();
        assert_eq!(storage.get("users").unwrap(), None);
    }

    #[test]
    fn collection_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("medicore.db");

        {
            let storage = SqliteStorage::open(&path).unwrap();
            save_collection(&storage, KEY_DOCTORS, &["a".to_string(), "b".to_string()]).unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        let loaded: Option<Vec<String>> = load_collection(&storage, KEY_DOCTORS).unwrap();
        assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn null_value_reads_as_none() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        save_value::<String>(&storage, KEY_CURRENT_USER, None).unwrap();
        assert_eq!(storage.get(KEY_CURRENT_USER).unwrap().as_deref(), Some("null"));
        let loaded: Option<String> = load_value(&storage, KEY_CURRENT_USER).unwrap();
        assert_eq!(loaded, None);
    }
}
