use serde::{Deserialize, Serialize};
use std::fmt;

/// 사용자 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Patient,
}

impl Role {
    /// 원격 profiles 테이블에 저장되는 값 (소문자)
    pub fn as_remote_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Patient => "patient",
        }
    }

    pub fn from_remote_str(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Patient
        }
    }
}

/// 사용자 계정 (관리자/환자)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    // 평문 비교. 운영 환경에서는 솔트 해시로 교체해야 함
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }
}

/// 회원가입 입력
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// 의사 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub bio: String,
    pub image: String,
    pub experience: u32,
    pub available_days: Vec<String>, // 예: ["Mon", "Wed", "Fri"]
    pub time_slots: Vec<String>,     // 예: ["09:00", "10:00"]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub name: String,
    pub specialty: String,
    pub bio: String,
    pub image: String,
    pub experience: u32,
    pub available_days: Vec<String>,
    pub time_slots: Vec<String>,
}

/// 예약 상태
///
/// `pending → {upcoming, cancelled}`, `upcoming → {completed, cancelled}`.
/// `completed` 와 `cancelled` 는 종료 상태입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Upcoming,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Upcoming => "upcoming",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "upcoming" => AppointmentStatus::Upcoming,
            "completed" => AppointmentStatus::Completed,
            "cancelled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// 상태 전이 허용 여부 (같은 상태로의 전이는 허용)
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Upcoming) | (Pending, Cancelled) | (Upcoming, Completed) | (Upcoming, Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 진료 예약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String, // 예약 시점 스냅샷
    pub doctor_id: String,
    pub doctor_name: String, // 예약 시점 스냅샷
    pub date: String,        // YYYY-MM-DD
    pub time: String,        // HH:MM
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

/// 예약 요청 입력 (이름 스냅샷은 저장소에서 채움)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: String,
    pub doctor_id: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 병원 자원 (병상, 산소, 장비 등) 카탈로그 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub price: f64, // 1일 가격
    pub total_stock: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHospitalResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub price: f64,
    pub total_stock: u32,
}

/// 자원 요청 상태: `pending → {paid, cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceRequestStatus {
    Pending,
    Paid,
    Cancelled,
}

impl ResourceRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceRequestStatus::Pending => "pending",
            ResourceRequestStatus::Paid => "paid",
            ResourceRequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "paid" => ResourceRequestStatus::Paid,
            "cancelled" => ResourceRequestStatus::Cancelled,
            _ => ResourceRequestStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResourceRequestStatus::Pending)
    }
}

impl fmt::Display for ResourceRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 환자의 자원 요청
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub resource_id: String, // HospitalResource.id
    pub price: f64,          // 요청 시점 가격
    pub date: String,
    pub status: ResourceRequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResourceRequest {
    pub patient_id: String,
    pub resource_id: String,
    pub date: String,
}

/// 상태 변경 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Applied,
    Unchanged,
    NotFound,
}

/// 사용자 삭제 결과 (연쇄 취소 건수 포함)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDeletion {
    pub removed: Option<User>,
    pub cancelled_appointments: usize,
}
