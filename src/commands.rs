//! 화면 계층이 호출하는 명령
//!
//! 각 명령은 역할 확인 → 로컬 변경(영속화 포함) → 원격 미러링 순서로 실행됩니다.
//! 저장소 잠금은 원격 호출 전에 해제됩니다.

use crate::auth::{self, Session};
use crate::config::{AppConfig, DEFAULT_POLL_INTERVAL};
use crate::db::{SqliteStorage, Storage};
use crate::error::{AppError, AppResult};
use crate::feed::{ChangeFeed, PollingFeed};
use crate::models::*;
use crate::projection::{self, DashboardStats, Occupancy};
use crate::remote::{row_id, Filter, ProfileRow, RemoteStore, RemoteTable, SupabaseRemote};
use crate::repository::{generate_id, Draft};
use crate::store::{self, Store};
use crate::sync::{self, Mirror, MirrorOp, ReloadHook, ReloadSummary, SyncAdapter, SyncOutcome, WatchHandle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// 로컬 변경 결과와 원격 미러링 결과
///
/// `sync` 가 `None` 이면 바뀐 것이 없어 원격에 보내지 않은 경우입니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation<T> {
    pub value: T,
    pub sync: Option<SyncOutcome>,
}

impl<T> Mutation<T> {
    fn new(value: T, sync: Option<SyncOutcome>) -> Self {
        Self { value, sync }
    }

    pub fn warning(&self) -> Option<&str> {
        self.sync.as_ref().and_then(SyncOutcome::warning)
    }
}

/// 첫 경고를 대표 결과로 사용
fn combine(primary: SyncOutcome, others: Vec<SyncOutcome>) -> SyncOutcome {
    if primary.warning().is_some() {
        return primary;
    }
    others
        .into_iter()
        .find(|o| o.warning().is_some())
        .unwrap_or(primary)
}

struct Watcher {
    _handle: WatchHandle,
    _feed: Option<PollingFeed>,
}

pub struct Portal {
    store: Arc<Mutex<Store>>,
    session: Arc<Mutex<Session>>,
    sync: Option<Arc<SyncAdapter>>,
    watcher: Mutex<Option<Watcher>>,
    export_dir: PathBuf,
    poll_interval: Duration,
}

impl Portal {
    /// 설정대로 로컬 DB 와 (있으면) 원격 저장소를 연결
    pub fn open(config: &AppConfig) -> AppResult<Self> {
        let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::open(&config.db_path())?);

        let remote: Option<Arc<dyn RemoteStore>> = match &config.supabase {
            Some(supabase) if config.remote_enabled() => Some(Arc::new(SupabaseRemote::new(
                supabase.clone(),
                config.http_timeout,
            )?)),
            _ => None,
        };

        Ok(Self::new(storage, remote, config.data_dir.clone())?.with_poll_interval(config.poll_interval))
    }

    pub fn new(
        storage: Arc<dyn Storage>,
        remote: Option<Arc<dyn RemoteStore>>,
        export_dir: PathBuf,
    ) -> AppResult<Self> {
        let store = Store::open(storage)?;
        let session = Session::restore(&store)?;
        let store = Arc::new(Mutex::new(store));
        let sync = remote.map(|remote| Arc::new(SyncAdapter::new(remote, &store)));

        log::info!(
            "Portal initialized (remote: {})",
            if sync.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            store,
            session: Arc::new(Mutex::new(session)),
            sync,
            watcher: Mutex::new(None),
            export_dir,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// [`Portal::watch_remote`] 의 조회 주기
    pub fn with_poll_interval(mut self, every: Duration) -> Self {
        self.poll_interval = every;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn store(&self) -> AppResult<MutexGuard<'_, Store>> {
        store::lock(&self.store)
    }

    fn session(&self) -> AppResult<MutexGuard<'_, Session>> {
        self.session
            .lock()
            .map_err(|_| AppError::Custom("Session lock error".to_string()))
    }

    /// 원격이 설정되어 있고 동기화가 켜져 있을 때만
    fn active_sync(&self) -> Option<&Arc<SyncAdapter>> {
        self.sync.as_ref().filter(|s| s.is_enabled())
    }

    pub fn sync_adapter(&self) -> Option<&Arc<SyncAdapter>> {
        self.sync.as_ref()
    }

    async fn mirror<T: Mirror>(&self, op: MirrorOp, entity: &T) -> SyncOutcome {
        let sync = match &self.sync {
            Some(sync) => sync,
            None => return SyncOutcome::Disabled,
        };
        let record = match self.store() {
            Ok(store) => entity.to_record(&store),
            Err(e) => return SyncOutcome::LocalOnly { warning: e.to_string() },
        };
        sync.mirror(op, record).await
    }

    /// 상태 전이가 실제로 적용된 경우에만 미러링
    async fn mirror_transition<T: Mirror>(&self, transition: Transition, updated: Option<T>) -> Option<SyncOutcome> {
        match (transition, updated) {
            (Transition::Applied, Some(entity)) => Some(self.mirror(MirrorOp::Update, &entity).await),
            _ => None,
        }
    }

    // ============ 인증 ============

    /// 세션 사용자 (매번 최신 레코드로 재검증)
    pub fn current_user(&self) -> AppResult<Option<User>> {
        let mut session = self.session()?;
        let store = self.store()?;
        session.revalidate(&store)?;
        Ok(session.current_user().cloned())
    }

    /// 원격이 있으면 profiles 에서 먼저 확인. 로컬에 없는 프로필은 로컬 사용자로 추가
    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let Some(sync) = self.active_sync() else {
            let mut session = self.session()?;
            let store = self.store()?;
            return auth::login(&store, &mut session, email, password);
        };

        let rows = sync
            .remote()
            .select(
                RemoteTable::Profiles,
                &[Filter::eq("email", email), Filter::eq("password", password)],
            )
            .await?;
        let profile = match rows.into_iter().next() {
            Some(row) => serde_json::from_value::<ProfileRow>(row)?,
            None => {
                log::info!("Login failed");
                return Err(AppError::InvalidCredentials);
            }
        };

        let mut session = self.session()?;
        let mut store = self.store()?;

        match store.find_user_by_email(email).cloned() {
            Some(mut local) => {
                // 원격에서 비밀번호가 바뀐 경우 로컬 사본 갱신
                if local.password != password {
                    local.password = password.to_string();
                    store.update_user(local.clone())?;
                }
                auth::login(&store, &mut session, &local.email, password)
            }
            None => {
                let user = sync::user_from_profile(profile)
                    .ok_or_else(|| AppError::Remote("profile without id".to_string()))?;
                log::info!("Materializing remote profile {}", user.id);
                auth::adopt_user(&mut store, &mut session, user)
            }
        }
    }

    /// 원격이 있으면 profiles 에 먼저 넣고, 거부되면 가입 실패
    pub async fn signup(&self, draft: NewUser) -> AppResult<Mutation<User>> {
        let Some(sync) = self.active_sync().cloned() else {
            let mut session = self.session()?;
            let mut store = self.store()?;
            let user = auth::signup(&mut store, &mut session, draft)?;
            return Ok(Mutation::new(user, Some(SyncOutcome::Disabled)));
        };

        let draft = auth::prepare_signup(draft)?;
        let (mut user, record) = {
            let store = self.store()?;
            if store.find_user_by_email(&draft.email).is_some() {
                return Err(AppError::validation("An account with this email already exists"));
            }
            let user = draft.into_entity(generate_id());
            let record = user.to_record(&store);
            (user, record)
        };

        let inserted = sync.remote().insert(RemoteTable::Profiles, &record.row).await?;
        let remote_id = row_id(&inserted).unwrap_or_else(|| user.id.clone());
        user.remote_id = Some(remote_id.clone());

        let mut session = self.session()?;
        let mut store = self.store()?;
        let user = auth::adopt_user(&mut store, &mut session, user)?;
        log::info!("User signed up: {}", user.id);
        Ok(Mutation::new(
            user,
            Some(SyncOutcome::Synced {
                remote_id: Some(remote_id),
            }),
        ))
    }

    pub fn logout(&self) -> AppResult<()> {
        let mut session = self.session()?;
        let store = self.store()?;
        auth::logout(&store, &mut session)
    }

    /// 본인 프로필 수정
    pub async fn update_profile(&self, user: User) -> AppResult<Mutation<bool>> {
        let updated = {
            let mut session = self.session()?;
            if session.require_user()?.id != user.id {
                return Err(AppError::Forbidden("can only edit your own profile".to_string()));
            }
            let mut store = self.store()?;
            let id = user.id.clone();
            match auth::update_profile(&mut store, &mut session, user)? {
                true => store.users().get(&id).cloned(),
                false => None,
            }
        };
        self.finish_user_update(updated).await
    }

    /// 정규화된 저장 레코드 기준으로 미러링
    async fn finish_user_update(&self, updated: Option<User>) -> AppResult<Mutation<bool>> {
        match updated {
            Some(current) => {
                let sync = self.mirror(MirrorOp::Update, &current).await;
                Ok(Mutation::new(true, Some(sync)))
            }
            None => Ok(Mutation::new(false, None)),
        }
    }

    /// 본인 계정 삭제 후 로그아웃. 예약은 취소 처리
    pub async fn delete_account(&self) -> AppResult<Mutation<UserDeletion>> {
        let (deletion, cancelled) = {
            let mut session = self.session()?;
            let user_id = session.require_user()?.id.clone();
            let mut store = self.store()?;
            let affected = cascade_targets(&store, &user_id);
            let deletion = auth::delete_account(&mut store, &mut session)?;
            (deletion, collect(&store, &affected))
        };
        self.finish_user_deletion(deletion, cancelled).await
    }

    async fn finish_user_deletion(
        &self,
        deletion: UserDeletion,
        cancelled: Vec<Appointment>,
    ) -> AppResult<Mutation<UserDeletion>> {
        let removed = match &deletion.removed {
            Some(user) => user.clone(),
            None => return Ok(Mutation::new(deletion, None)),
        };

        let primary = self.mirror(MirrorOp::Delete, &removed).await;
        let mut cascade = Vec::with_capacity(cancelled.len());
        for appointment in &cancelled {
            cascade.push(self.mirror(MirrorOp::Update, appointment).await);
        }
        Ok(Mutation::new(deletion, Some(combine(primary, cascade))))
    }

    // ============ 사용자 관리 (관리자) ============

    pub fn list_patients(&self, search: Option<&str>) -> AppResult<Vec<User>> {
        self.session()?.require_admin()?;
        let store = self.store()?;
        Ok(projection::patients(store.users(), search).cloned().collect())
    }

    pub fn list_users(&self) -> AppResult<Vec<User>> {
        self.session()?.require_admin()?;
        Ok(self.store()?.users().as_slice().to_vec())
    }

    pub async fn add_user(&self, draft: NewUser) -> AppResult<Mutation<User>> {
        let user = {
            self.session()?.require_admin()?;
            self.store()?.add_user(draft)?
        };
        let sync = self.mirror(MirrorOp::Insert, &user).await;
        Ok(Mutation::new(user, Some(sync)))
    }

    pub async fn update_user(&self, user: User) -> AppResult<Mutation<bool>> {
        let updated = {
            let mut session = self.session()?;
            session.require_admin()?;
            let mut store = self.store()?;
            let id = user.id.clone();
            let updated = match store.update_user(user)? {
                true => store.users().get(&id).cloned(),
                false => None,
            };
            session.revalidate(&store)?;
            updated
        };
        self.finish_user_update(updated).await
    }

    /// 사용자 삭제 (예약 연쇄 취소). 본인이면 로그아웃
    pub async fn delete_user(&self, id: &str) -> AppResult<Mutation<UserDeletion>> {
        let (deletion, cancelled) = {
            let mut session = self.session()?;
            session.require_admin()?;
            let mut store = self.store()?;
            let affected = cascade_targets(&store, id);
            let deletion = store.delete_user(id)?;
            session.revalidate(&store)?;
            (deletion, collect(&store, &affected))
        };
        self.finish_user_deletion(deletion, cancelled).await
    }

    // ============ 의사 ============

    /// 공개 목록 (로그인 불필요)
    pub fn list_doctors(&self) -> AppResult<Vec<Doctor>> {
        Ok(self.store()?.doctors().as_slice().to_vec())
    }

    pub async fn add_doctor(&self, draft: NewDoctor) -> AppResult<Mutation<Doctor>> {
        let doctor = {
            self.session()?.require_admin()?;
            self.store()?.add_doctor(draft)?
        };
        let sync = self.mirror(MirrorOp::Insert, &doctor).await;
        Ok(Mutation::new(doctor, Some(sync)))
    }

    pub async fn update_doctor(&self, doctor: Doctor) -> AppResult<Mutation<bool>> {
        let updated = {
            self.session()?.require_admin()?;
            self.store()?.update_doctor(doctor.clone())?
        };
        if !updated {
            return Ok(Mutation::new(false, None));
        }
        // 원격 id 는 저장소에만 기록되어 있을 수 있음
        let current = self.store()?.doctors().get(&doctor.id).cloned().unwrap_or(doctor);
        let sync = self.mirror(MirrorOp::Update, &current).await;
        Ok(Mutation::new(true, Some(sync)))
    }

    pub async fn delete_doctor(&self, id: &str) -> AppResult<Mutation<Option<Doctor>>> {
        let removed = {
            self.session()?.require_admin()?;
            self.store()?.delete_doctor(id)?
        };
        let sync = match &removed {
            Some(doctor) => Some(self.mirror(MirrorOp::Delete, doctor).await),
            None => None,
        };
        Ok(Mutation::new(removed, sync))
    }

    // ============ 예약 ============

    /// 환자 본인 예약 생성 (`pending`)
    pub async fn book_appointment(&self, mut request: NewAppointment) -> AppResult<Mutation<Appointment>> {
        let appointment = {
            let session = self.session()?;
            request.patient_id = session.require_patient()?.id.clone();
            self.store()?.book_appointment(request)?
        };
        let sync = self.mirror(MirrorOp::Insert, &appointment).await;
        Ok(Mutation::new(appointment, Some(sync)))
    }

    pub fn my_appointments(&self) -> AppResult<Vec<Appointment>> {
        let session = self.session()?;
        let user = session.require_patient()?;
        let store = self.store()?;
        Ok(projection::appointments_for_patient(store.appointments(), &user.id)
            .cloned()
            .collect())
    }

    pub fn all_appointments(&self) -> AppResult<Vec<Appointment>> {
        self.session()?.require_admin()?;
        Ok(self.store()?.appointments().as_slice().to_vec())
    }

    pub async fn approve_appointment(&self, id: &str) -> AppResult<Mutation<Transition>> {
        let (transition, updated) = {
            self.session()?.require_admin()?;
            let mut store = self.store()?;
            let transition = store.approve_appointment(id)?;
            (transition, store.appointments().get(id).cloned())
        };
        let sync = self.mirror_transition(transition, updated).await;
        Ok(Mutation::new(transition, sync))
    }

    /// 관리자 거절 또는 환자 본인 취소
    pub async fn cancel_appointment(&self, id: &str) -> AppResult<Mutation<Transition>> {
        let (transition, updated) = {
            let session = self.session()?;
            let user = session.require_user()?;
            let mut store = self.store()?;
            if let Some(existing) = store.appointments().get(id) {
                if user.is_patient() && existing.patient_id != user.id {
                    return Err(AppError::Forbidden("not your appointment".to_string()));
                }
            }
            let transition = store.cancel_appointment(id)?;
            (transition, store.appointments().get(id).cloned())
        };
        let sync = self.mirror_transition(transition, updated).await;
        Ok(Mutation::new(transition, sync))
    }

    /// 관리자 직접 수정 (`completed` 포함)
    pub async fn update_appointment(&self, appointment: Appointment) -> AppResult<Mutation<bool>> {
        let updated = {
            self.session()?.require_admin()?;
            let mut store = self.store()?;
            match store.update_appointment(appointment.clone())? {
                true => store.appointments().get(&appointment.id).cloned(),
                false => None,
            }
        };
        match updated {
            Some(current) => {
                let sync = self.mirror(MirrorOp::Update, &current).await;
                Ok(Mutation::new(true, Some(sync)))
            }
            None => Ok(Mutation::new(false, None)),
        }
    }

    pub async fn delete_appointment(&self, id: &str) -> AppResult<Mutation<Option<Appointment>>> {
        let removed = {
            self.session()?.require_admin()?;
            self.store()?.delete_appointment(id)?
        };
        let sync = match &removed {
            Some(appointment) => Some(self.mirror(MirrorOp::Delete, appointment).await),
            None => None,
        };
        Ok(Mutation::new(removed, sync))
    }

    // ============ 병원 자원 카탈로그 (로컬 전용) ============

    pub fn list_hospital_resources(&self) -> AppResult<Vec<HospitalResource>> {
        self.session()?.require_user()?;
        Ok(self.store()?.hospital_resources().as_slice().to_vec())
    }

    pub fn add_hospital_resource(&self, draft: NewHospitalResource) -> AppResult<HospitalResource> {
        self.session()?.require_admin()?;
        self.store()?.add_hospital_resource(draft)
    }

    pub fn update_hospital_resource(&self, resource: HospitalResource) -> AppResult<bool> {
        self.session()?.require_admin()?;
        self.store()?.update_hospital_resource(resource)
    }

    pub fn delete_hospital_resource(&self, id: &str) -> AppResult<Option<HospitalResource>> {
        self.session()?.require_admin()?;
        self.store()?.delete_hospital_resource(id)
    }

    // ============ 자원 요청 ============

    pub async fn request_resource(&self, resource_id: &str, date: &str) -> AppResult<Mutation<ResourceRequest>> {
        let request = {
            let session = self.session()?;
            let patient_id = session.require_patient()?.id.clone();
            self.store()?.request_resource(NewResourceRequest {
                patient_id,
                resource_id: resource_id.to_string(),
                date: date.to_string(),
            })?
        };
        let sync = self.mirror(MirrorOp::Insert, &request).await;
        Ok(Mutation::new(request, Some(sync)))
    }

    pub fn my_resource_requests(&self) -> AppResult<Vec<ResourceRequest>> {
        let session = self.session()?;
        let user = session.require_patient()?;
        let store = self.store()?;
        Ok(projection::resource_requests_for_patient(store.resource_requests(), &user.id)
            .cloned()
            .collect())
    }

    pub fn all_resource_requests(&self) -> AppResult<Vec<ResourceRequest>> {
        self.session()?.require_admin()?;
        Ok(self.store()?.resource_requests().as_slice().to_vec())
    }

    pub async fn mark_resource_paid(&self, id: &str) -> AppResult<Mutation<Transition>> {
        let (transition, updated) = {
            self.session()?.require_admin()?;
            let mut store = self.store()?;
            let transition = store.mark_resource_paid(id)?;
            (transition, store.resource_requests().get(id).cloned())
        };
        let sync = self.mirror_transition(transition, updated).await;
        Ok(Mutation::new(transition, sync))
    }

    /// 관리자 취소, 또는 환자 본인의 대기 중 요청 취소
    pub async fn cancel_resource_request(&self, id: &str) -> AppResult<Mutation<Transition>> {
        let (transition, updated) = {
            let session = self.session()?;
            let user = session.require_user()?;
            let mut store = self.store()?;
            if let Some(existing) = store.resource_requests().get(id) {
                if user.is_patient() && existing.patient_id != user.id {
                    return Err(AppError::Forbidden("not your resource request".to_string()));
                }
            }
            let transition = store.cancel_resource_request(id)?;
            (transition, store.resource_requests().get(id).cloned())
        };
        let sync = self.mirror_transition(transition, updated).await;
        Ok(Mutation::new(transition, sync))
    }

    pub async fn delete_resource_request(&self, id: &str) -> AppResult<Mutation<Option<ResourceRequest>>> {
        let removed = {
            self.session()?.require_admin()?;
            self.store()?.delete_resource_request(id)?
        };
        let sync = match &removed {
            Some(request) => Some(self.mirror(MirrorOp::Delete, request).await),
            None => None,
        };
        Ok(Mutation::new(removed, sync))
    }

    // ============ 조회 모델 ============

    pub fn resource_occupancy(&self) -> AppResult<Vec<Occupancy>> {
        self.session()?.require_user()?;
        Ok(projection::resource_occupancy(&*self.store()?))
    }

    pub fn resource_display_name(&self, request: &ResourceRequest) -> AppResult<Option<String>> {
        let store = self.store()?;
        Ok(projection::resource_display_name(&store, request).map(str::to_string))
    }

    pub fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        self.session()?.require_admin()?;
        Ok(projection::dashboard_stats(&*self.store()?))
    }

    pub fn patients_csv(&self) -> AppResult<String> {
        self.session()?.require_admin()?;
        Ok(projection::patients_csv(self.store()?.users()))
    }

    /// 데이터 디렉토리에 환자 목록 CSV 저장
    pub fn export_patients_csv(&self) -> AppResult<PathBuf> {
        self.export_patients_csv_to(&self.export_dir)
    }

    pub fn export_patients_csv_to(&self, dir: &Path) -> AppResult<PathBuf> {
        self.session()?.require_admin()?;
        projection::export_patients_csv(self.store()?.users(), dir)
    }

    // ============ 원격 동기화 ============

    pub fn set_sync_enabled(&self, enabled: bool) {
        if let Some(sync) = &self.sync {
            sync.set_enabled(enabled);
        }
    }

    pub fn pending_sync_count(&self) -> usize {
        self.sync.as_ref().map(|s| s.pending_count()).unwrap_or(0)
    }

    pub async fn retry_pending_sync(&self) -> AppResult<u32> {
        match self.active_sync() {
            Some(sync) => sync.retry_pending().await,
            None => Ok(0),
        }
    }

    /// 원격 전체 재조회 후 세션 재검증
    pub async fn reload_from_remote(&self) -> AppResult<ReloadSummary> {
        let Some(sync) = self.active_sync() else {
            return Ok(ReloadSummary::default());
        };
        let summary = sync.reload().await?;
        let mut session = self.session()?;
        session.revalidate(&*self.store()?)?;
        Ok(summary)
    }

    fn revalidate_hook(&self) -> ReloadHook {
        let session = Arc::downgrade(&self.session);
        let store = Arc::downgrade(&self.store);
        Arc::new(move |_summary: &ReloadSummary| {
            let (Some(session), Some(store)) = (session.upgrade(), store.upgrade()) else {
                return;
            };
            let (Ok(mut session), Ok(store)) = (session.lock(), store.lock()) else {
                return;
            };
            if let Err(e) = session.revalidate(&store) {
                log::warn!("Session revalidation after reload failed: {}", e);
            }
        })
    }

    /// 변경 알림마다 재조회. 이전 감시는 중지됨
    pub fn watch(&self, feed: &dyn ChangeFeed) -> AppResult<()> {
        let Some(sync) = &self.sync else {
            return Ok(());
        };
        let handle = sync.watch(feed, Some(self.revalidate_hook()));
        self.install_watcher(handle, None)
    }

    /// 원격 테이블을 주기적으로 조회하는 피드로 감시 시작 (tokio 런타임 필요)
    pub fn watch_polling(&self, every: Duration) -> AppResult<()> {
        let Some(sync) = &self.sync else {
            return Ok(());
        };
        let feed = PollingFeed::start(Arc::clone(sync.remote()), &RemoteTable::WATCHED, every);
        let handle = sync.watch(&feed, Some(self.revalidate_hook()));
        self.install_watcher(handle, Some(feed))
    }

    /// 설정된 주기로 원격 감시 시작
    pub fn watch_remote(&self) -> AppResult<()> {
        self.watch_polling(self.poll_interval)
    }

    fn install_watcher(&self, handle: WatchHandle, feed: Option<PollingFeed>) -> AppResult<()> {
        let mut watcher = self
            .watcher
            .lock()
            .map_err(|_| AppError::Custom("Watcher lock error".to_string()))?;
        *watcher = Some(Watcher {
            _handle: handle,
            _feed: feed,
        });
        Ok(())
    }

    pub fn stop_watching(&self) {
        if let Ok(mut watcher) = self.watcher.lock() {
            *watcher = None;
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().map(|w| w.is_some()).unwrap_or(false)
    }
}

/// 사용자 삭제 시 취소될 예약 id
fn cascade_targets(store: &Store, patient_id: &str) -> Vec<String> {
    store
        .appointments()
        .iter()
        .filter(|a| a.patient_id == patient_id && a.status != AppointmentStatus::Cancelled)
        .map(|a| a.id.clone())
        .collect()
}

fn collect(store: &Store, ids: &[String]) -> Vec<Appointment> {
    ids.iter()
        .filter_map(|id| store.appointments().get(id).cloned())
        .collect()
}
