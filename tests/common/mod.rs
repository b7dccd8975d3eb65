#![allow(dead_code)]

use async_trait::async_trait;
use medicore::db::SqliteStorage;
use medicore::remote::{Filter, RemoteStore, RemoteTable};
use medicore::{AppError, AppResult, NewUser, Portal, Role};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 프로세스 내 원격 저장소
///
/// `id` 가 없는 행에는 bigint identity 처럼 숫자 id 를 붙임.
/// profiles 외 테이블을 숫자가 아닌 `id` 로 거르면 PostgREST 처럼 거부.
#[derive(Default)]
pub struct MemoryRemote {
    tables: Mutex<HashMap<RemoteTable, Vec<Value>>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn rows(&self, table: RemoteTable) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed(&self, table: RemoteTable, row: Value) {
        self.tables
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .push(row);
    }

    pub fn clear(&self, table: RemoteTable) {
        self.tables.lock().unwrap().remove(&table);
    }

    fn check(&self, table: RemoteTable, filters: &[Filter]) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Remote("remote unavailable".to_string()));
        }
        let bad_id = filters
            .iter()
            .any(|f| f.column == "id" && f.value.parse::<u64>().is_err());
        if table != RemoteTable::Profiles && bad_id {
            return Err(AppError::Remote(format!("{}: invalid input syntax for type bigint", table)));
        }
        Ok(())
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn select(&self, table: RemoteTable, filters: &[Filter]) -> AppResult<Vec<Value>> {
        self.check(table, filters)?;
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|row| matches_all(row, filters))
            .collect())
    }

    async fn insert(&self, table: RemoteTable, row: &Value) -> AppResult<Value> {
        self.check(table, &[])?;
        let mut row = row.clone();
        if row.get("id").is_none() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            row["id"] = json!(id);
        }
        self.seed(table, row.clone());
        Ok(row)
    }

    async fn update(&self, table: RemoteTable, filters: &[Filter], patch: &Value) -> AppResult<Vec<Value>> {
        self.check(table, filters)?;
        let mut tables = self.tables.lock().unwrap();
        let mut updated = Vec::new();
        for row in tables.entry(table).or_default().iter_mut() {
            if !matches_all(row, filters) {
                continue;
            }
            if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: RemoteTable, filters: &[Filter]) -> AppResult<Vec<Value>> {
        self.check(table, filters)?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table).or_default();
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|row| matches_all(row, filters));
        *rows = kept;
        Ok(removed)
    }
}

pub fn admin_profile() -> Value {
    json!({
        "id": "admin1",
        "name": "Super Admin",
        "email": "admin@medicore.com",
        "password": "admin",
        "role": "admin"
    })
}

pub fn doctor_row(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "specialty": "Cardiology",
        "bio": "",
        "image": "",
        "experience": 15,
        "available_days": ["Mon", "Wed"],
        "time_slots": ["09:00", "10:00"]
    })
}

pub fn patient_draft(email: &str, password: &str) -> NewUser {
    NewUser {
        name: "Xavier Young".to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role: Role::Patient,
        avatar: None,
        phone: Some("9876543210".to_string()),
        address: Some("12 Park Street".to_string()),
    }
}

pub fn local_portal() -> Portal {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    Portal::new(storage, None, std::env::temp_dir()).unwrap()
}

pub fn remote_portal(remote: &Arc<MemoryRemote>) -> Portal {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let remote: Arc<dyn RemoteStore> = remote.clone();
    Portal::new(storage, Some(remote), std::env::temp_dir()).unwrap()
}

/// `check` 가 참이 되거나 시간이 다 될 때까지 반복 확인
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
