//! 조회 모델 (매번 다시 계산되는 파생 뷰)

use crate::error::AppResult;
use crate::models::*;
use crate::repository::Repository;
use crate::store::Store;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const PATIENTS_CSV_FILENAME: &str = "MediCore_Patients_List.csv";
const PATIENTS_CSV_HEADER: [&str; 4] = ["Name", "Email", "Phone", "Address"];

/// 환자 목록. 검색어가 있으면 이름/이메일/전화번호 부분 일치 (대소문자 무시)
pub fn patients<'a>(
    users: &'a Repository<User>,
    search: Option<&'a str>,
) -> impl Iterator<Item = &'a User> + 'a {
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    users.iter().filter(|u| u.is_patient()).filter(move |user| {
        let needle = match &needle {
            Some(n) => n,
            None => return true,
        };
        user.name.to_lowercase().contains(needle.as_str())
            || user.email.to_lowercase().contains(needle.as_str())
            || user
                .phone
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(needle.as_str()))
    })
}

pub fn appointments_for_patient<'a>(
    appointments: &'a Repository<Appointment>,
    patient_id: &'a str,
) -> impl Iterator<Item = &'a Appointment> + 'a {
    appointments.iter().filter(move |a| a.patient_id == patient_id)
}

pub fn resource_requests_for_patient<'a>(
    requests: &'a Repository<ResourceRequest>,
    patient_id: &'a str,
) -> impl Iterator<Item = &'a ResourceRequest> + 'a {
    requests.iter().filter(move |r| r.patient_id == patient_id)
}

/// 자원 점유 현황
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupancy {
    pub resource_id: String,
    pub name: String,
    pub occupied: usize,
    pub total_stock: u32,
    pub percentage: u32,
}

/// `min(100, round(100 * occupied / total))`. 재고가 0 이면 점유 시 100, 아니면 0
pub fn occupancy_percentage(occupied: usize, total_stock: u32) -> u32 {
    if total_stock == 0 {
        return if occupied > 0 { 100 } else { 0 };
    }
    let pct = (100.0 * occupied as f64 / total_stock as f64).round();
    pct.min(100.0) as u32
}

/// 결제 완료(`paid`) 요청만 점유로 계산
pub fn occupancy(store: &Store, resource_id: &str) -> Option<Occupancy> {
    let resource = store.hospital_resources().get(resource_id)?;
    let occupied = store
        .resource_requests()
        .iter()
        .filter(|r| r.resource_id == resource.id && r.status == ResourceRequestStatus::Paid)
        .count();

    Some(Occupancy {
        resource_id: resource.id.clone(),
        name: resource.name.clone(),
        occupied,
        total_stock: resource.total_stock,
        percentage: occupancy_percentage(occupied, resource.total_stock),
    })
}

pub fn resource_occupancy(store: &Store) -> Vec<Occupancy> {
    store
        .hospital_resources()
        .iter()
        .filter_map(|r| occupancy(store, &r.id))
        .collect()
}

/// 자원 요청의 표시 이름 (카탈로그에서 삭제된 경우 `None`)
pub fn resource_display_name<'a>(store: &'a Store, request: &ResourceRequest) -> Option<&'a str> {
    store
        .hospital_resources()
        .get(&request.resource_id)
        .map(|r| r.name.as_str())
}

/// 관리자 대시보드 요약
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_patients: usize,
    pub total_doctors: usize,
    pub pending_appointments: usize,
    pub upcoming_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
    pub pending_resource_requests: usize,
    pub paid_revenue: f64,
}

pub fn dashboard_stats(store: &Store) -> DashboardStats {
    let mut stats = DashboardStats {
        total_patients: patients(store.users(), None).count(),
        total_doctors: store.doctors().len(),
        ..Default::default()
    };

    for appointment in store.appointments() {
        match appointment.status {
            AppointmentStatus::Pending => stats.pending_appointments += 1,
            AppointmentStatus::Upcoming => stats.upcoming_appointments += 1,
            AppointmentStatus::Completed => stats.completed_appointments += 1,
            AppointmentStatus::Cancelled => stats.cancelled_appointments += 1,
        }
    }

    for request in store.resource_requests() {
        match request.status {
            ResourceRequestStatus::Pending => stats.pending_resource_requests += 1,
            ResourceRequestStatus::Paid => stats.paid_revenue += request.price,
            ResourceRequestStatus::Cancelled => {}
        }
    }

    stats
}

// ============ CSV 내보내기 ============

/// RFC 4180 방식: 큰따옴표로 감싸고 내부 따옴표는 두 번
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// 환자 목록 CSV (헤더 포함, 행 구분은 `\n`)
pub fn patients_csv(users: &Repository<User>) -> String {
    let mut lines = vec![PATIENTS_CSV_HEADER.join(",")];
    for p in patients(users, None) {
        let fields = [
            p.name.as_str(),
            p.email.as_str(),
            p.phone.as_deref().unwrap_or_default(),
            p.address.as_deref().unwrap_or_default(),
        ];
        lines.push(
            fields
                .iter()
                .map(|f| csv_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

/// `dir/MediCore_Patients_List.csv` 로 저장하고 경로 반환
pub fn export_patients_csv(users: &Repository<User>, dir: &Path) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(PATIENTS_CSV_FILENAME);
    std::fs::write(&path, patients_csv(users))?;
    log::info!("Patients exported to {:?}", path);
    Ok(path)
}
