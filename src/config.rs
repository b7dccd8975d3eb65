//! 실행 설정
//!
//! `.env` 파일과 프로세스 환경 변수에서 읽습니다.

use crate::remote::SupabaseConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DB_FILENAME: &str = "medicore.db";

/// 원격 변경 조회 기본 주기
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// 로컬 DB 및 CSV 내보내기 위치
    pub data_dir: PathBuf,
    /// 원격 저장소 (URL 과 anon key 가 모두 있을 때만)
    pub supabase: Option<SupabaseConfig>,
    pub sync_enabled: bool,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            supabase: None,
            sync_enabled: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// 환경 변수에서 설정 구성
    ///
    /// - `MEDICORE_DATA_DIR` (기본: 로컬 데이터 디렉토리/medicore)
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`
    /// - `MEDICORE_SYNC_ENABLED` (기본: true)
    /// - `MEDICORE_POLL_INTERVAL_SECS` (기본: 15)
    /// - `MEDICORE_HTTP_TIMEOUT_SECS` (기본: 30)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(dir) = read_env::<PathBuf>("MEDICORE_DATA_DIR") {
            config.data_dir = dir;
        }
        if let Some(enabled) = read_env_bool("MEDICORE_SYNC_ENABLED") {
            config.sync_enabled = enabled;
        }
        if let Some(secs) = read_env::<u64>("MEDICORE_POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = read_env::<u64>("MEDICORE_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(secs.max(1));
        }

        let url = read_env::<String>("SUPABASE_URL").filter(|v| !v.trim().is_empty());
        let key = read_env::<String>("SUPABASE_ANON_KEY").filter(|v| !v.trim().is_empty());
        config.supabase = match (url, key) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig::new(url, anon_key)),
            (None, None) => None,
            _ => {
                log::warn!("SUPABASE_URL and SUPABASE_ANON_KEY must both be set; remote sync disabled");
                None
            }
        };

        config
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILENAME)
    }

    /// 원격 동기화 사용 여부
    pub fn remote_enabled(&self) -> bool {
        self.sync_enabled && self.supabase.is_some()
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medicore")
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_remote() {
        let config = AppConfig::default();
        assert!(config.supabase.is_none());
        assert!(!config.remote_enabled());
        assert!(config.db_path().ends_with("medicore/medicore.db"));
        assert_eq!(config.poll_interval, Duration::from_secs(15));
    }

    #[test]
    fn sync_flag_gates_remote() {
        let config = AppConfig {
            supabase: Some(SupabaseConfig::new("http://localhost:54321", "anon")),
            sync_enabled: false,
            ..AppConfig::default()
        };
        assert!(!config.remote_enabled());
    }
}
