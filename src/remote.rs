//! 원격 관계형 저장소 (Supabase PostgREST)
//!
//! 테이블 단위의 select/insert/update/delete 만 제공합니다.
//! id 재조정과 대체 조회는 `sync` 모듈이 담당합니다.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Supabase 설정
#[derive(Clone, Debug, PartialEq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }
}

/// 미러링 대상 테이블
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteTable {
    Profiles,
    Doctors,
    Appointments,
    Resources,
}

impl RemoteTable {
    pub const ALL: [RemoteTable; 4] = [
        RemoteTable::Profiles,
        RemoteTable::Doctors,
        RemoteTable::Appointments,
        RemoteTable::Resources,
    ];

    /// 변경 알림을 구독하는 테이블
    pub const WATCHED: [RemoteTable; 3] = [
        RemoteTable::Profiles,
        RemoteTable::Appointments,
        RemoteTable::Resources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteTable::Profiles => "profiles",
            RemoteTable::Doctors => "doctors",
            RemoteTable::Appointments => "appointments",
            RemoteTable::Resources => "resources",
        }
    }
}

impl fmt::Display for RemoteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 동등 비교 필터 (`column = value`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// 행이 필터를 만족하는지 (숫자 id 도 문자열로 비교)
    pub fn matches(&self, row: &Value) -> bool {
        match row.get(&self.column) {
            Some(Value::String(s)) => s == &self.value,
            Some(Value::Number(n)) => n.to_string() == self.value,
            Some(Value::Bool(b)) => b.to_string() == self.value,
            _ => false,
        }
    }
}

/// 원격 저장소 인터페이스
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, table: RemoteTable, filters: &[Filter]) -> AppResult<Vec<Value>>;

    /// 삽입된 행 반환 (서버가 부여한 id 포함)
    async fn insert(&self, table: RemoteTable, row: &Value) -> AppResult<Value>;

    /// 변경된 행 목록 반환. 빈 목록이면 일치하는 행이 없었음
    async fn update(&self, table: RemoteTable, filters: &[Filter], patch: &Value)
        -> AppResult<Vec<Value>>;

    /// 삭제된 행 목록 반환
    async fn delete(&self, table: RemoteTable, filters: &[Filter]) -> AppResult<Vec<Value>>;
}

/// PostgREST 기반 구현
pub struct SupabaseRemote {
    config: SupabaseConfig,
    client: Client,
}

impl SupabaseRemote {
    pub fn new(config: SupabaseConfig, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn request(&self, method: Method, table: RemoteTable, filters: &[Filter]) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.config.url, table);
        let query: Vec<(String, String)> = filters
            .iter()
            .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
            .collect();

        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", &self.config.anon_key))
            .query(&query)
    }

    async fn send(table: RemoteTable, request: RequestBuilder) -> AppResult<Vec<Value>> {
        let res = request.send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            log::warn!("[Remote] {} request failed: {} {}", table, status, body);
            return Err(AppError::Remote(format!("{} {}: {}", table, status, body)));
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl RemoteStore for SupabaseRemote {
    async fn select(&self, table: RemoteTable, filters: &[Filter]) -> AppResult<Vec<Value>> {
        let request = self
            .request(Method::GET, table, filters)
            .query(&[("select", "*")]);
        Self::send(table, request).await
    }

    async fn insert(&self, table: RemoteTable, row: &Value) -> AppResult<Value> {
        let request = self
            .request(Method::POST, table, &[])
            .header("Prefer", "return=representation")
            .json(row);
        Self::send(table, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Remote(format!("{}: insert returned no row", table)))
    }

    async fn update(
        &self,
        table: RemoteTable,
        filters: &[Filter],
        patch: &Value,
    ) -> AppResult<Vec<Value>> {
        let request = self
            .request(Method::PATCH, table, filters)
            .header("Prefer", "return=representation")
            .json(patch);
        Self::send(table, request).await
    }

    async fn delete(&self, table: RemoteTable, filters: &[Filter]) -> AppResult<Vec<Value>> {
        let request = self
            .request(Method::DELETE, table, filters)
            .header("Prefer", "return=representation");
        Self::send(table, request).await
    }
}

// ============ 원격 행 타입 ============

/// 서버에 따라 id 가 문자열 또는 숫자로 옴
fn flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("unexpected id value: {}", other))),
    }
}

/// 행에서 id 컬럼 추출
pub fn row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    #[serde(default, deserialize_with = "flexible_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorRow {
    #[serde(default, deserialize_with = "flexible_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub available_days: Vec<String>,
    #[serde(default)]
    pub time_slots: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRow {
    #[serde(default, deserialize_with = "flexible_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub doctor_name: String,
    pub appointment_date: String,
    pub appointment_time: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRow {
    #[serde(default, deserialize_with = "flexible_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    pub resource_selected: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub status: String,
}
