//! 원격 동기화 어댑터
//!
//! 로컬 변경을 원격 저장소에 미러링합니다. 로컬 변경은 항상 먼저 확정되며
//! 원격 실패는 경고로만 보고되고 재시도 대기열에 들어갑니다.
//!
//! id 재조정: 삽입 시 로컬 id 는 임시값이고, 원격이 돌려준 id 를 로컬 레코드의
//! `remoteId` 에 기록합니다. 수정/삭제는 원격 id(없으면 로컬 id)로 먼저 찾고,
//! 못 찾으면 자연 키로 다시 찾습니다.

use crate::error::{AppError, AppResult};
use crate::feed::ChangeFeed;
use crate::models::*;
use crate::remote::{
    row_id, AppointmentRow, DoctorRow, Filter, ProfileRow, RemoteStore, RemoteTable, ResourceRow,
};
use crate::repository::Entity;
use crate::store::{self, RemoteSnapshot, Store};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// 대기 항목 최대 재시도 횟수
pub const MAX_RETRIES: u32 = 5;

/// 미러링 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// 원격 미설정 또는 동기화 꺼짐
    Disabled,
    Synced { remote_id: Option<String> },
    /// 로컬 변경은 유지됨
    LocalOnly { warning: String },
}

impl SyncOutcome {
    pub fn warning(&self) -> Option<&str> {
        match self {
            SyncOutcome::LocalOnly { warning } => Some(warning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorOp {
    Insert,
    Update,
    Delete,
}

/// 원격으로 보낼 레코드
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub table: RemoteTable,
    pub local_id: String,
    pub remote_id: Option<String>,
    pub row: Value,
    /// id 로 못 찾을 때 쓰는 자연 키
    pub natural_key: Vec<Filter>,
}

impl RemoteRecord {
    fn primary_filter(&self) -> Filter {
        Filter::eq("id", self.remote_id.as_deref().unwrap_or(&self.local_id))
    }
}

/// 원격 테이블에 미러링되는 엔티티
pub trait Mirror: Entity {
    const TABLE: RemoteTable;

    /// 다른 컬렉션 조회가 필요할 수 있어 저장소 잠금 안에서 호출
    fn to_record(&self, store: &Store) -> RemoteRecord;
}

fn to_row<T: Serialize>(row: &T) -> Value {
    serde_json::to_value(row).unwrap_or(Value::Null)
}

impl Mirror for User {
    const TABLE: RemoteTable = RemoteTable::Profiles;

    fn to_record(&self, _store: &Store) -> RemoteRecord {
        // profiles 는 로컬 id 를 기본 키로 그대로 사용
        let id = self.remote_id.clone().unwrap_or_else(|| self.id.clone());
        let row = ProfileRow {
            id: Some(id.clone()),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: Some(self.role.as_remote_str().to_string()),
            address: self.address.clone(),
            avatar_url: self.avatar.clone(),
            password: Some(self.password.clone()),
        };
        RemoteRecord {
            table: Self::TABLE,
            local_id: self.id.clone(),
            remote_id: Some(id),
            row: to_row(&row),
            natural_key: vec![Filter::eq("email", &self.email)],
        }
    }
}

impl Mirror for Doctor {
    const TABLE: RemoteTable = RemoteTable::Doctors;

    fn to_record(&self, _store: &Store) -> RemoteRecord {
        let row = DoctorRow {
            id: None,
            name: self.name.clone(),
            specialty: self.specialty.clone(),
            bio: self.bio.clone(),
            image: self.image.clone(),
            experience: self.experience,
            available_days: self.available_days.clone(),
            time_slots: self.time_slots.clone(),
        };
        RemoteRecord {
            table: Self::TABLE,
            local_id: self.id.clone(),
            remote_id: self.remote_id.clone(),
            row: to_row(&row),
            natural_key: vec![Filter::eq("name", &self.name)],
        }
    }
}

/// 원격 profiles 기준 환자 id 와 이메일
fn remote_patient(store: &Store, patient_id: &str) -> (String, Option<String>) {
    match store.users().get(patient_id) {
        Some(user) => (
            user.remote_id.clone().unwrap_or_else(|| user.id.clone()),
            Some(user.email.clone()),
        ),
        None => (patient_id.to_string(), None),
    }
}

impl Mirror for Appointment {
    const TABLE: RemoteTable = RemoteTable::Appointments;

    fn to_record(&self, store: &Store) -> RemoteRecord {
        let (patient_id, patient_email) = remote_patient(store, &self.patient_id);
        let row = AppointmentRow {
            id: None,
            patient_id: Some(patient_id.clone()),
            patient_email,
            patient_name: self.patient_name.clone(),
            doctor_name: self.doctor_name.clone(),
            appointment_date: self.date.clone(),
            appointment_time: self.time.clone(),
            status: self.status.as_str().to_string(),
            notes: self.notes.clone(),
        };
        RemoteRecord {
            table: Self::TABLE,
            local_id: self.id.clone(),
            remote_id: self.remote_id.clone(),
            row: to_row(&row),
            natural_key: vec![
                Filter::eq("patient_id", patient_id),
                Filter::eq("appointment_date", &self.date),
                Filter::eq("appointment_time", &self.time),
            ],
        }
    }
}

impl Mirror for ResourceRequest {
    const TABLE: RemoteTable = RemoteTable::Resources;

    fn to_record(&self, store: &Store) -> RemoteRecord {
        let (patient_id, patient_email) = remote_patient(store, &self.patient_id);
        // 원격에는 자원 이름으로 저장됨
        let resource_name = store
            .hospital_resources()
            .get(&self.resource_id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| self.resource_id.clone());
        let row = ResourceRow {
            id: None,
            patient_id: Some(patient_id.clone()),
            patient_email,
            patient_name: self.patient_name.clone(),
            resource_selected: resource_name.clone(),
            date: self.date.clone(),
            time: None,
            price: self.price,
            status: self.status.as_str().to_string(),
        };
        RemoteRecord {
            table: Self::TABLE,
            local_id: self.id.clone(),
            remote_id: self.remote_id.clone(),
            row: to_row(&row),
            natural_key: vec![
                Filter::eq("patient_id", patient_id),
                Filter::eq("resource_selected", resource_name),
                Filter::eq("date", &self.date),
            ],
        }
    }
}

/// 재시도 대기 항목
#[derive(Debug, Clone)]
pub struct PendingMirror {
    pub op: MirrorOp,
    pub record: RemoteRecord,
    pub created_at: String,
    pub retry_count: u32,
}

/// 전체 재조회 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    pub users: usize,
    pub doctors: usize,
    pub appointments: usize,
    pub resource_requests: usize,
    /// 로컬 레코드로 변환하지 못해 건너뛴 행
    pub skipped: usize,
}

enum Applied {
    Written(Option<String>),
    Missing,
    /// 자연 키에 여러 행이 걸림
    Ambiguous(usize),
}

/// 재조회 후 호출되는 훅 (세션 재검증 등)
pub type ReloadHook = Arc<dyn Fn(&ReloadSummary) + Send + Sync>;

pub struct SyncAdapter {
    remote: Arc<dyn RemoteStore>,
    store: Weak<Mutex<Store>>,
    enabled: AtomicBool,
    pending: Mutex<Vec<PendingMirror>>,
}

impl SyncAdapter {
    pub fn new(remote: Arc<dyn RemoteStore>, store: &Arc<Mutex<Store>>) -> Self {
        log::info!("Sync adapter initialized");
        Self {
            remote,
            store: Arc::downgrade(store),
            enabled: AtomicBool::new(true),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        log::info!("Sync enabled: {}", enabled);
    }

    fn queue(&self) -> AppResult<MutexGuard<'_, Vec<PendingMirror>>> {
        self.pending
            .lock()
            .map_err(|_| AppError::Custom("Sync queue lock error".to_string()))
    }

    /// 로컬 변경 하나를 원격에 반영
    pub async fn mirror(&self, op: MirrorOp, record: RemoteRecord) -> SyncOutcome {
        if !self.is_enabled() {
            log::debug!("Sync is disabled, skipping {} {}", record.table, record.local_id);
            return SyncOutcome::Disabled;
        }

        match self.fold_into_queue(op, &record) {
            Ok(Some(outcome)) => return outcome,
            Ok(None) => {}
            Err(e) => log::warn!("Failed to inspect sync queue: {}", e),
        }

        match self.apply(op, &record).await {
            Ok(Applied::Written(remote_id)) => {
                if op != MirrorOp::Delete {
                    if let Some(id) = &remote_id {
                        self.reconcile(record.table, &record.local_id, id);
                    }
                }
                log::info!("{} {} synced ({:?})", record.table, record.local_id, op);
                SyncOutcome::Synced { remote_id }
            }
            Ok(Applied::Missing) => {
                let warning = format!(
                    "{} {} not found remotely; change kept locally",
                    record.table, record.local_id
                );
                log::warn!("{}", warning);
                SyncOutcome::LocalOnly { warning }
            }
            Ok(Applied::Ambiguous(count)) => {
                let warning = format!(
                    "{} {} matched {} remote rows by natural key; change kept locally",
                    record.table, record.local_id, count
                );
                log::warn!("{}", warning);
                SyncOutcome::LocalOnly { warning }
            }
            Err(e) => {
                log::warn!("Sync failed, queuing for retry: {}", e);
                let warning = e.to_string();
                if let Err(e) = self.enqueue(op, record) {
                    log::error!("Failed to queue mirror: {}", e);
                }
                SyncOutcome::LocalOnly { warning }
            }
        }
    }

    async fn apply(&self, op: MirrorOp, record: &RemoteRecord) -> AppResult<Applied> {
        match op {
            MirrorOp::Insert => {
                let inserted = self.remote.insert(record.table, &record.row).await?;
                Ok(Applied::Written(row_id(&inserted)))
            }
            MirrorOp::Update | MirrorOp::Delete => self.apply_with_fallback(op, record).await,
        }
    }

    async fn run(&self, op: MirrorOp, record: &RemoteRecord, filters: &[Filter]) -> AppResult<Vec<Value>> {
        match op {
            MirrorOp::Delete => self.remote.delete(record.table, filters).await,
            _ => self.remote.update(record.table, filters, &record.row).await,
        }
    }

    /// id 로 시도 후 자연 키로 조회. 정확히 한 행일 때만 그 행의 id 로 실행
    async fn apply_with_fallback(&self, op: MirrorOp, record: &RemoteRecord) -> AppResult<Applied> {
        let primary = [record.primary_filter()];
        match self.run(op, record, &primary).await {
            Ok(rows) if !rows.is_empty() => return Ok(Applied::Written(rows.first().and_then(row_id))),
            Ok(_) => log::debug!("{} {}: no row by id", record.table, record.local_id),
            // id 형식이 달라 거부되는 경우도 미스로 취급
            Err(e) => log::debug!("{} {}: id lookup failed: {}", record.table, record.local_id, e),
        }

        if record.natural_key.is_empty() {
            return Ok(Applied::Missing);
        }

        let candidates = self.remote.select(record.table, &record.natural_key).await?;
        let remote_id = match candidates.as_slice() {
            [] => return Ok(Applied::Missing),
            [row] => match row_id(row) {
                Some(id) => id,
                None => return Ok(Applied::Missing),
            },
            rows => return Ok(Applied::Ambiguous(rows.len())),
        };

        log::debug!(
            "{} {}: matched remote row {} by natural key",
            record.table, record.local_id, remote_id
        );
        let rows = self.run(op, record, &[Filter::eq("id", &remote_id)]).await?;
        match rows.first() {
            Some(row) => Ok(Applied::Written(row_id(row).or(Some(remote_id)))),
            None => Ok(Applied::Missing),
        }
    }

    /// 원격 id 를 로컬 레코드에 기록. 저장소가 이미 사라졌으면 무시
    fn reconcile(&self, table: RemoteTable, local_id: &str, remote_id: &str) {
        let Some(shared) = self.store.upgrade() else {
            log::debug!("Store dropped, ignoring remote id for {}", local_id);
            return;
        };

        let result = store::lock(&shared).and_then(|mut store| match table {
            RemoteTable::Profiles => store.record_remote_id::<User>(local_id, remote_id),
            RemoteTable::Doctors => store.record_remote_id::<Doctor>(local_id, remote_id),
            RemoteTable::Appointments => store.record_remote_id::<Appointment>(local_id, remote_id),
            RemoteTable::Resources => store.record_remote_id::<ResourceRequest>(local_id, remote_id),
        });

        if let Err(e) = result {
            log::warn!("Failed to record remote id for {} {}: {}", table, local_id, e);
        }
    }

    /// 같은 레코드의 대기 항목과 합치기
    ///
    /// 대기 중인 삽입이 있으면 원격에는 아직 행이 없으므로 수정은 삽입 내용에 반영하고,
    /// 삭제는 삽입과 함께 대기열에서 지웁니다. 그 외에는 새 작업이 이전 수정을 대체합니다.
    fn fold_into_queue(&self, op: MirrorOp, record: &RemoteRecord) -> AppResult<Option<SyncOutcome>> {
        let mut queue = self.queue()?;
        let same = |p: &PendingMirror| p.record.table == record.table && p.record.local_id == record.local_id;

        if let Some(index) = queue
            .iter()
            .position(|p| p.op == MirrorOp::Insert && same(p))
        {
            return Ok(Some(match op {
                MirrorOp::Delete => {
                    queue.retain(|p| !same(p));
                    log::info!("Dropped queued insert for deleted {} {}", record.table, record.local_id);
                    SyncOutcome::Synced { remote_id: None }
                }
                MirrorOp::Insert | MirrorOp::Update => {
                    queue[index].record.row = record.row.clone();
                    queue[index].record.natural_key = record.natural_key.clone();
                    SyncOutcome::LocalOnly {
                        warning: format!(
                            "{} {} is waiting for its insert to reach the remote",
                            record.table, record.local_id
                        ),
                    }
                }
            }));
        }

        if op != MirrorOp::Insert {
            queue.retain(|p| !(p.op == MirrorOp::Update && same(p)));
        }
        Ok(None)
    }

    fn enqueue(&self, op: MirrorOp, record: RemoteRecord) -> AppResult<()> {
        let mut queue = self.queue()?;

        // 같은 레코드의 같은 작업은 최신 내용으로 교체
        if let Some(existing) = queue
            .iter_mut()
            .find(|p| p.op == op && p.record.table == record.table && p.record.local_id == record.local_id)
        {
            existing.record = record;
            return Ok(());
        }

        log::info!("Queued for sync: {} {}", record.table, record.local_id);
        queue.push(PendingMirror {
            op,
            record,
            created_at: chrono::Utc::now().to_rfc3339(),
            retry_count: 0,
        });
        Ok(())
    }

    /// 대기 중인 항목 재시도. 성공 건수 반환
    pub async fn retry_pending(&self) -> AppResult<u32> {
        if !self.is_enabled() {
            return Ok(0);
        }

        let items = std::mem::take(&mut *self.queue()?);
        let mut synced_count = 0;
        let mut failed_items = Vec::new();

        for mut item in items {
            if item.retry_count >= MAX_RETRIES {
                log::warn!("Max retries exceeded for: {} {}", item.record.table, item.record.local_id);
                continue;
            }

            match self.apply(item.op, &item.record).await {
                Ok(Applied::Written(remote_id)) => {
                    if let (Some(id), true) = (&remote_id, item.op != MirrorOp::Delete) {
                        self.reconcile(item.record.table, &item.record.local_id, id);
                    }
                    synced_count += 1;
                    log::info!("Retry sync successful: {}", item.record.local_id);
                }
                Ok(Applied::Missing) => {
                    log::warn!("Retry dropped, {} {} not found remotely", item.record.table, item.record.local_id);
                }
                Ok(Applied::Ambiguous(count)) => {
                    log::warn!(
                        "Retry dropped, {} {} matched {} remote rows",
                        item.record.table, item.record.local_id, count
                    );
                }
                Err(e) => {
                    log::warn!("Retry sync failed: {}: {}", item.record.local_id, e);
                    item.retry_count += 1;
                    failed_items.push(item);
                }
            }
        }

        // 재시도 중 새로 들어온 항목은 뒤에 유지
        let mut queue = self.queue()?;
        let newer = std::mem::take(&mut *queue);
        *queue = failed_items;
        queue.extend(newer);

        Ok(synced_count)
    }

    pub fn pending_count(&self) -> usize {
        self.queue().map(|q| q.len()).unwrap_or(0)
    }

    pub fn pending(&self) -> Vec<PendingMirror> {
        self.queue().map(|q| q.clone()).unwrap_or_default()
    }

    /// 원격 전체를 다시 읽어 로컬 컬렉션 교체 (로컬 전용 변경분은 버려짐)
    pub async fn reload(&self) -> AppResult<ReloadSummary> {
        if self.store.strong_count() == 0 {
            return Ok(ReloadSummary::default());
        }

        let (profiles, doctors, appointments, resources) = tokio::try_join!(
            self.remote.select(RemoteTable::Profiles, &[]),
            self.remote.select(RemoteTable::Doctors, &[]),
            self.remote.select(RemoteTable::Appointments, &[]),
            self.remote.select(RemoteTable::Resources, &[]),
        )?;

        let Some(shared) = self.store.upgrade() else {
            return Ok(ReloadSummary::default());
        };
        let mut store = store::lock(&shared)?;

        let rows = RemoteRows {
            profiles,
            doctors,
            appointments,
            resources,
        };
        let (snapshot, summary) = rows.into_snapshot(
            store.hospital_resources().as_slice(),
            store.doctors().as_slice(),
        );
        store.replace_from_remote(snapshot)?;

        log::info!(
            "Reloaded from remote: {} users, {} doctors, {} appointments, {} resource requests ({} skipped)",
            summary.users,
            summary.doctors,
            summary.appointments,
            summary.resource_requests,
            summary.skipped
        );
        Ok(summary)
    }

    /// 변경 알림을 받을 때마다 전체 재조회. 핸들이 drop 되면 중지
    pub fn watch(self: &Arc<Self>, feed: &dyn ChangeFeed, on_reload: Option<ReloadHook>) -> WatchHandle {
        let mut rx = feed.subscribe();
        let adapter = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if !RemoteTable::WATCHED.contains(&event.table) => continue,
                    Ok(event) => log::debug!("Change received on {}", event.table),
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Change feed lagged by {} events", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }

                if adapter.store.strong_count() == 0 {
                    break;
                }

                match adapter.reload().await {
                    Ok(summary) => {
                        if let Some(hook) = &on_reload {
                            hook(&summary);
                        }
                    }
                    Err(e) => log::warn!("Reload after change failed: {}", e),
                }
            }
            log::info!("Change watcher stopped");
        });

        WatchHandle { task }
    }
}

/// 변경 감시 작업 핸들
pub struct WatchHandle {
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============ 원격 행 → 로컬 레코드 ============

struct RemoteRows {
    profiles: Vec<Value>,
    doctors: Vec<Value>,
    appointments: Vec<Value>,
    resources: Vec<Value>,
}

fn parse_rows<T: serde::de::DeserializeOwned>(table: RemoteTable, rows: Vec<Value>, skipped: &mut usize) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("Skipping malformed {} row: {}", table, e);
                *skipped += 1;
                None
            }
        })
        .collect()
}

impl RemoteRows {
    /// 원격에 한 번도 올라가지 않은 로컬 의사(기본 의사 목록 등)는 유지
    fn into_snapshot(self, catalog: &[HospitalResource], local_doctors: &[Doctor]) -> (RemoteSnapshot, ReloadSummary) {
        let mut skipped = 0;

        let profiles: Vec<ProfileRow> = parse_rows(RemoteTable::Profiles, self.profiles, &mut skipped);
        let doctors: Vec<DoctorRow> = parse_rows(RemoteTable::Doctors, self.doctors, &mut skipped);
        let appointments: Vec<AppointmentRow> =
            parse_rows(RemoteTable::Appointments, self.appointments, &mut skipped);
        let resources: Vec<ResourceRow> = parse_rows(RemoteTable::Resources, self.resources, &mut skipped);

        let mut snapshot = RemoteSnapshot::default();

        for row in profiles {
            match user_from_profile(row) {
                Some(user) => snapshot.users.push(user),
                None => skipped += 1,
            }
        }

        for row in doctors {
            match doctor_from_row(row) {
                Some(doctor) => snapshot.doctors.push(doctor),
                None => skipped += 1,
            }
        }

        let unmirrored: Vec<Doctor> = local_doctors
            .iter()
            .filter(|d| d.remote_id.is_none())
            .filter(|d| !snapshot.doctors.iter().any(|r| r.name == d.name))
            .cloned()
            .collect();
        if !unmirrored.is_empty() {
            log::debug!("Keeping {} local doctors without a remote row", unmirrored.len());
            snapshot.doctors.extend(unmirrored);
        }

        for row in appointments {
            match appointment_from_row(row, &snapshot.doctors) {
                Some(appointment) => snapshot.appointments.push(appointment),
                None => skipped += 1,
            }
        }

        for row in resources {
            match resource_request_from_row(row, catalog) {
                Some(request) => snapshot.resource_requests.push(request),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("{} remote rows could not be converted", skipped);
        }

        let summary = ReloadSummary {
            users: snapshot.users.len(),
            doctors: snapshot.doctors.len(),
            appointments: snapshot.appointments.len(),
            resource_requests: snapshot.resource_requests.len(),
            skipped,
        };
        (snapshot, summary)
    }
}

/// 원격 프로필을 로컬 사용자로 변환 (id 가 없으면 `None`)
pub fn user_from_profile(row: ProfileRow) -> Option<User> {
    let id = row.id?;
    Some(User {
        id: id.clone(),
        name: row.name,
        email: row.email,
        role: Role::from_remote_str(row.role.as_deref().unwrap_or("patient")),
        password: row.password.unwrap_or_default(),
        avatar: row.avatar_url,
        phone: row.phone,
        address: row.address,
        remote_id: Some(id),
    })
}

fn doctor_from_row(row: DoctorRow) -> Option<Doctor> {
    let id = row.id?;
    Some(Doctor {
        id: id.clone(),
        name: row.name,
        specialty: row.specialty,
        bio: row.bio,
        image: row.image,
        experience: row.experience,
        available_days: row.available_days,
        time_slots: row.time_slots,
        remote_id: Some(id),
    })
}

/// 원격 예약에는 의사 이름만 있으므로 이름으로 의사 id 를 찾음
fn appointment_from_row(row: AppointmentRow, doctors: &[Doctor]) -> Option<Appointment> {
    let id = row.id?;
    let patient_id = row.patient_id?;
    let doctor = doctors.iter().find(|d| d.name == row.doctor_name);
    let Some(doctor) = doctor else {
        log::warn!("Appointment {}: unknown doctor {:?}", id, row.doctor_name);
        return None;
    };

    Some(Appointment {
        id: id.clone(),
        patient_id,
        patient_name: row.patient_name,
        doctor_id: doctor.id.clone(),
        doctor_name: row.doctor_name,
        date: row.appointment_date,
        time: row.appointment_time,
        status: AppointmentStatus::from_str_lossy(&row.status),
        notes: row.notes,
        remote_id: Some(id),
    })
}

/// 원격 자원 요청은 자원 이름으로 저장되므로 카탈로그에서 id 를 찾음
fn resource_request_from_row(row: ResourceRow, catalog: &[HospitalResource]) -> Option<ResourceRequest> {
    let id = row.id?;
    let patient_id = row.patient_id?;
    let Some(resource) = catalog.iter().find(|r| r.name == row.resource_selected) else {
        log::warn!("Resource request {}: unknown resource {:?}", id, row.resource_selected);
        return None;
    };

    Some(ResourceRequest {
        id: id.clone(),
        patient_id,
        patient_name: row.patient_name,
        resource_id: resource.id.clone(),
        price: row.price,
        date: row.date,
        status: ResourceRequestStatus::from_str_lossy(&row.status),
        remote_id: Some(id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use serde_json::json;

    #[test]
    fn rows_convert_with_name_lookups() {
        let rows = RemoteRows {
            profiles: vec![json!({
                "id": "u-1", "name": "Ann", "email": "ann@x.com",
                "role": "patient", "password": "pw", "avatar_url": "a.png"
            })],
            doctors: vec![json!({ "id": 7, "name": "Dr. Sarah Jenkins", "specialty": "Cardiology" })],
            appointments: vec![
                json!({
                    "id": 100, "patient_id": "u-1", "patient_name": "Ann",
                    "doctor_name": "Dr. Sarah Jenkins", "appointment_date": "2024-06-01",
                    "appointment_time": "09:00", "status": "upcoming"
                }),
                json!({
                    "id": 101, "patient_id": "u-1", "patient_name": "Ann",
                    "doctor_name": "Dr. Nobody", "appointment_date": "2024-06-01",
                    "appointment_time": "10:00", "status": "pending"
                }),
            ],
            resources: vec![json!({
                "id": 5, "patient_id": "u-1", "patient_name": "Ann",
                "resource_selected": "ICU Bed", "date": "2024-06-01",
                "price": 5000, "status": "paid"
            })],
        };

        let (snapshot, summary) = rows.into_snapshot(&seed::default_hospital_resources(), &[]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(snapshot.users[0].avatar.as_deref(), Some("a.png"));
        assert_eq!(snapshot.users[0].role, Role::Patient);
        assert_eq!(snapshot.doctors[0].id, "7");

        let appointment = &snapshot.appointments[0];
        assert_eq!(appointment.doctor_id, "7");
        assert_eq!(appointment.status, AppointmentStatus::Upcoming);
        assert_eq!(appointment.remote_id.as_deref(), Some("100"));

        let request = &snapshot.resource_requests[0];
        assert_eq!(request.resource_id, "r2");
        assert_eq!(request.status, ResourceRequestStatus::Paid);
        assert_eq!(request.price, 5000.0);
    }

    #[test]
    fn rows_without_ids_are_skipped() {
        let rows = RemoteRows {
            profiles: vec![json!({ "name": "No Id", "email": "x@y.com" })],
            doctors: vec![json!({ "id": 1 })],
            appointments: vec![],
            resources: vec![],
        };
        let (snapshot, summary) = rows.into_snapshot(&[], &[]);
        assert!(snapshot.users.is_empty());
        assert!(snapshot.doctors.is_empty());
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn appointment_record_uses_remote_columns() {
        let store = Store::open(Arc::new(crate::db::SqliteStorage::open_in_memory().unwrap())).unwrap();
        let appointment = Appointment {
            id: "a-1".to_string(),
            patient_id: "admin1".to_string(),
            patient_name: "Super Admin".to_string(),
            doctor_id: "d1".to_string(),
            doctor_name: "Dr. Sarah Jenkins".to_string(),
            date: "2024-06-01".to_string(),
            time: "09:00".to_string(),
            status: AppointmentStatus::Pending,
            notes: None,
            remote_id: None,
        };

        let record = appointment.to_record(&store);
        assert_eq!(record.table, RemoteTable::Appointments);
        assert_eq!(record.row["appointment_time"], "09:00");
        assert_eq!(record.row["patient_email"], "admin@medicore.com");
        assert!(record.row.get("id").is_none());
        assert_eq!(record.primary_filter(), Filter::eq("id", "a-1"));
        assert_eq!(record.natural_key.len(), 3);
    }
}
