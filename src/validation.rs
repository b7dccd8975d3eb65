//! 입력 유효성 검사
//!
//! 저장소를 변경하기 전에 호출되며, 실패 시 아무 상태도 바뀌지 않습니다.

use crate::error::{AppError, AppResult};
use chrono::{NaiveDate, NaiveTime};

/// 국가 번호 접두어 (가입 시 전화번호 정규화)
pub const PHONE_PREFIX: &str = "+91";

pub fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn email(value: &str) -> AppResult<()> {
    require("Email", value)?;
    if !value.contains('@') {
        return Err(AppError::validation("Email address is malformed"));
    }
    Ok(())
}

/// 숫자 외 문자를 제거하고 정확히 10자리인지 확인 후 `+91 XXXXXXXXXX` 형태로 반환
pub fn normalize_phone(value: &str) -> AppResult<String> {
    let digits: String = value
        .strip_prefix(PHONE_PREFIX)
        .unwrap_or(value)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    if digits.len() != 10 {
        return Err(AppError::validation(
            "Invalid number: Phone number must be exactly 10 digits.",
        ));
    }

    Ok(format!("{} {}", PHONE_PREFIX, digits))
}

/// YYYY-MM-DD
pub fn date(value: &str) -> AppResult<()> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| AppError::validation(format!("Invalid date: {}", value)))
}

/// HH:MM
pub fn time(value: &str) -> AppResult<()> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|_| ())
        .map_err(|_| AppError::validation(format!("Invalid time: {}", value)))
}

pub fn price(value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation("Price must be a non-negative amount"));
    }
    Ok(())
}
