//! 애플리케이션 상태 저장소
//!
//! 다섯 개의 컬렉션(사용자, 의사, 예약, 자원 요청, 병원 자원)을 소유하며
//! 모든 변경은 메모리에 먼저 반영된 뒤 해당 컬렉션 전체가 영속 저장소에 기록됩니다.

use crate::db::{self, Storage};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::repository::{AppointmentDraft, Entity, Repository, ResourceRequestDraft};
use crate::seed;
use crate::validation;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Store {
    storage: Arc<dyn Storage>,
    users: Repository<User>,
    doctors: Repository<Doctor>,
    appointments: Repository<Appointment>,
    resource_requests: Repository<ResourceRequest>,
    hospital_resources: Repository<HospitalResource>,
}

/// 원격 전체 재조회 결과 (병원 자원 카탈로그는 로컬 전용이라 제외)
#[derive(Debug, Clone, Default)]
pub struct RemoteSnapshot {
    pub users: Vec<User>,
    pub doctors: Vec<Doctor>,
    pub appointments: Vec<Appointment>,
    pub resource_requests: Vec<ResourceRequest>,
}

/// 타입으로 컬렉션 선택
pub trait HasCollection<T: Entity> {
    fn collection(&self) -> &Repository<T>;
    fn collection_mut(&mut self) -> &mut Repository<T>;
}

macro_rules! has_collection {
    ($ty:ty, $field:ident) => {
        impl HasCollection<$ty> for Store {
            fn collection(&self) -> &Repository<$ty> {
                &self.$field
            }

            fn collection_mut(&mut self) -> &mut Repository<$ty> {
                &mut self.$field
            }
        }
    };
}

has_collection!(User, users);
has_collection!(Doctor, doctors);
has_collection!(Appointment, appointments);
has_collection!(ResourceRequest, resource_requests);
has_collection!(HospitalResource, hospital_resources);

fn load_or_seed<T: Entity>(storage: &dyn Storage, seed: fn() -> Vec<T>) -> AppResult<Vec<T>> {
    match db::load_collection::<T>(storage, T::COLLECTION)? {
        Some(items) => Ok(items),
        None => {
            let items = seed();
            db::save_collection(storage, T::COLLECTION, &items)?;
            log::info!("[Store] seeded {} ({} items)", T::COLLECTION, items.len());
            Ok(items)
        }
    }
}

impl Store {
    /// 영속 저장소에서 상태를 읽어 저장소 생성 (없는 컬렉션은 기본값으로 채움)
    pub fn open(storage: Arc<dyn Storage>) -> AppResult<Self> {
        let mut store = Self {
            storage,
            users: Repository::default(),
            doctors: Repository::default(),
            appointments: Repository::default(),
            resource_requests: Repository::default(),
            hospital_resources: Repository::default(),
        };
        store.reload()?;
        Ok(store)
    }

    /// 영속 저장소 기준으로 메모리 상태를 다시 읽음
    pub fn reload(&mut self) -> AppResult<()> {
        let storage = self.storage.as_ref();
        self.users = Repository::new(load_or_seed(storage, seed::default_users)?);
        self.doctors = Repository::new(load_or_seed(storage, seed::default_doctors)?);
        self.appointments = Repository::new(load_or_seed(storage, Vec::new)?);
        self.resource_requests = Repository::new(load_or_seed(storage, Vec::new)?);
        self.hospital_resources =
            Repository::new(load_or_seed(storage, seed::default_hospital_resources)?);
        log::info!(
            "[Store] loaded: {} users, {} doctors, {} appointments, {} resource requests",
            self.users.len(),
            self.doctors.len(),
            self.appointments.len(),
            self.resource_requests.len()
        );
        Ok(())
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn users(&self) -> &Repository<User> {
        &self.users
    }

    pub fn doctors(&self) -> &Repository<Doctor> {
        &self.doctors
    }

    pub fn appointments(&self) -> &Repository<Appointment> {
        &self.appointments
    }

    pub fn resource_requests(&self) -> &Repository<ResourceRequest> {
        &self.resource_requests
    }

    pub fn hospital_resources(&self) -> &Repository<HospitalResource> {
        &self.hospital_resources
    }

    fn persist<T: Entity>(&self) -> AppResult<()>
    where
        Self: HasCollection<T>,
    {
        <Self as HasCollection<T>>::collection(self).persist(self.storage.as_ref())
    }

    // ============ 사용자 ============

    fn email_taken(&self, email: &str, except_id: Option<&str>) -> bool {
        self.users
            .iter()
            .filter(|u| Some(u.id.as_str()) != except_id)
            .any(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    /// (이메일, 비밀번호) 정확히 일치하는 사용자가 하나일 때만 반환
    pub fn find_user_by_credentials(&self, email: &str, password: &str) -> Option<&User> {
        let mut matches = self
            .users
            .iter()
            .filter(|u| u.email == email && u.password == password);
        match (matches.next(), matches.next()) {
            (Some(user), None) => Some(user),
            _ => None,
        }
    }

    pub fn add_user(&mut self, mut draft: NewUser) -> AppResult<User> {
        validation::require("Name", &draft.name)?;
        validation::email(&draft.email)?;
        validation::require("Password", &draft.password)?;
        draft.phone = normalize_optional_phone(draft.phone)?;

        if self.email_taken(&draft.email, None) {
            return Err(AppError::validation("An account with this email already exists"));
        }

        let user = self.users.add(draft).clone();
        self.persist::<User>()?;
        log::info!("[Store] user added: {}", user.id);
        Ok(user)
    }

    /// 원격에서 확인된 프로필을 원격 id 그대로 로컬에 추가
    pub fn insert_user_with_id(&mut self, mut user: User) -> AppResult<User> {
        validation::require("Name", &user.name)?;
        validation::email(&user.email)?;
        if self.users.contains(&user.id) || self.email_taken(&user.email, None) {
            return Err(AppError::validation("An account with this email already exists"));
        }
        if user.remote_id.is_none() {
            user.remote_id = Some(user.id.clone());
        }

        self.users.push(user.clone());
        self.persist::<User>()?;
        log::info!("[Store] user adopted from remote profile: {}", user.id);
        Ok(user)
    }

    /// 기존 레코드 교체. 없는 id 면 `false`
    pub fn update_user(&mut self, mut user: User) -> AppResult<bool> {
        validation::require("Name", &user.name)?;
        validation::email(&user.email)?;
        user.phone = normalize_optional_phone(user.phone)?;

        if !self.users.contains(&user.id) {
            return Ok(false);
        }
        if self.email_taken(&user.email, Some(&user.id)) {
            return Err(AppError::validation("An account with this email already exists"));
        }

        self.users.replace(user);
        self.persist::<User>()?;
        Ok(true)
    }

    /// 사용자 삭제. 해당 환자의 예약은 삭제하지 않고 모두 취소 처리
    pub fn delete_user(&mut self, id: &str) -> AppResult<UserDeletion> {
        let removed = match self.users.remove(id) {
            Some(user) => user,
            None => {
                return Ok(UserDeletion {
                    removed: None,
                    cancelled_appointments: 0,
                })
            }
        };

        let cancelled = self.appointments.update_where(
            |a| a.patient_id == id,
            |a| {
                if a.status == AppointmentStatus::Cancelled {
                    return false;
                }
                a.status = AppointmentStatus::Cancelled;
                true
            },
        );

        self.persist::<User>()?;
        if cancelled > 0 {
            self.persist::<Appointment>()?;
        }

        log::info!(
            "[Store] user deleted: {} ({} appointments cancelled)",
            id,
            cancelled
        );
        Ok(UserDeletion {
            removed: Some(removed),
            cancelled_appointments: cancelled,
        })
    }

    // ============ 의사 ============

    pub fn add_doctor(&mut self, draft: NewDoctor) -> AppResult<Doctor> {
        validation::require("Name", &draft.name)?;
        validation::require("Specialty", &draft.specialty)?;
        let doctor = self.doctors.add(draft).clone();
        self.persist::<Doctor>()?;
        Ok(doctor)
    }

    pub fn update_doctor(&mut self, doctor: Doctor) -> AppResult<bool> {
        validation::require("Name", &doctor.name)?;
        validation::require("Specialty", &doctor.specialty)?;
        if !self.doctors.replace(doctor) {
            return Ok(false);
        }
        self.persist::<Doctor>()?;
        Ok(true)
    }

    /// 예약에 남은 의사 id/이름은 약한 참조이므로 그대로 둠
    pub fn delete_doctor(&mut self, id: &str) -> AppResult<Option<Doctor>> {
        let removed = self.doctors.remove(id);
        if removed.is_some() {
            self.persist::<Doctor>()?;
        }
        Ok(removed)
    }

    // ============ 예약 ============

    /// 환자가 예약 생성. 상태는 `pending`, 이름은 현재 값을 스냅샷으로 저장
    pub fn book_appointment(&mut self, request: NewAppointment) -> AppResult<Appointment> {
        validation::date(&request.date)?;
        validation::time(&request.time)?;

        let patient = self
            .users
            .get(&request.patient_id)
            .ok_or_else(|| AppError::not_found(User::KIND, &request.patient_id))?;
        let doctor = self
            .doctors
            .get(&request.doctor_id)
            .ok_or_else(|| AppError::not_found(Doctor::KIND, &request.doctor_id))?;

        let draft = AppointmentDraft {
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            date: request.date,
            time: request.time,
            notes: request.notes,
        };

        let appointment = self.appointments.add(draft).clone();
        self.persist::<Appointment>()?;
        log::info!(
            "[Store] appointment booked: {} ({} with {})",
            appointment.id,
            appointment.patient_id,
            appointment.doctor_id
        );
        Ok(appointment)
    }

    fn set_appointment_status(
        &mut self,
        id: &str,
        next: AppointmentStatus,
    ) -> AppResult<Transition> {
        let appointment = match self.appointments.get_mut(id) {
            Some(a) => a,
            None => return Ok(Transition::NotFound),
        };

        if appointment.status == next {
            return Ok(Transition::Unchanged);
        }
        if !appointment.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: appointment.status.to_string(),
                to: next.to_string(),
            });
        }

        appointment.status = next;
        self.persist::<Appointment>()?;
        Ok(Transition::Applied)
    }

    /// 관리자 승인: `pending → upcoming`
    pub fn approve_appointment(&mut self, id: &str) -> AppResult<Transition> {
        self.set_appointment_status(id, AppointmentStatus::Upcoming)
    }

    /// 취소 (이미 취소된 예약은 변화 없음)
    pub fn cancel_appointment(&mut self, id: &str) -> AppResult<Transition> {
        self.set_appointment_status(id, AppointmentStatus::Cancelled)
    }

    /// 관리자 직접 수정. `completed` 로 가는 유일한 경로
    pub fn update_appointment(&mut self, appointment: Appointment) -> AppResult<bool> {
        validation::date(&appointment.date)?;
        validation::time(&appointment.time)?;

        let current = match self.appointments.get(&appointment.id) {
            Some(a) => a.status,
            None => return Ok(false),
        };
        if !current.can_transition_to(appointment.status) {
            return Err(AppError::InvalidTransition {
                from: current.to_string(),
                to: appointment.status.to_string(),
            });
        }

        self.appointments.replace(appointment);
        self.persist::<Appointment>()?;
        Ok(true)
    }

    pub fn delete_appointment(&mut self, id: &str) -> AppResult<Option<Appointment>> {
        let removed = self.appointments.remove(id);
        if removed.is_some() {
            self.persist::<Appointment>()?;
        }
        Ok(removed)
    }

    // ============ 병원 자원 카탈로그 ============

    pub fn add_hospital_resource(&mut self, draft: NewHospitalResource) -> AppResult<HospitalResource> {
        validation::require("Name", &draft.name)?;
        validation::price(draft.price)?;
        let resource = self.hospital_resources.add(draft).clone();
        self.persist::<HospitalResource>()?;
        Ok(resource)
    }

    pub fn update_hospital_resource(&mut self, resource: HospitalResource) -> AppResult<bool> {
        validation::require("Name", &resource.name)?;
        validation::price(resource.price)?;
        if !self.hospital_resources.replace(resource) {
            return Ok(false);
        }
        self.persist::<HospitalResource>()?;
        Ok(true)
    }

    pub fn delete_hospital_resource(&mut self, id: &str) -> AppResult<Option<HospitalResource>> {
        let removed = self.hospital_resources.remove(id);
        if removed.is_some() {
            self.persist::<HospitalResource>()?;
        }
        Ok(removed)
    }

    // ============ 자원 요청 ============

    /// 환자 자원 요청. 가격은 현재 카탈로그 가격을 복사
    pub fn request_resource(&mut self, request: NewResourceRequest) -> AppResult<ResourceRequest> {
        validation::date(&request.date)?;

        let patient = self
            .users
            .get(&request.patient_id)
            .ok_or_else(|| AppError::not_found(User::KIND, &request.patient_id))?;
        let resource = self
            .hospital_resources
            .get(&request.resource_id)
            .ok_or_else(|| AppError::not_found(HospitalResource::KIND, &request.resource_id))?;

        let draft = ResourceRequestDraft {
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            resource_id: resource.id.clone(),
            price: resource.price,
            date: request.date,
        };

        let created = self.resource_requests.add(draft).clone();
        self.persist::<ResourceRequest>()?;
        Ok(created)
    }

    fn set_resource_request_status(
        &mut self,
        id: &str,
        next: ResourceRequestStatus,
    ) -> AppResult<Transition> {
        let request = match self.resource_requests.get_mut(id) {
            Some(r) => r,
            None => return Ok(Transition::NotFound),
        };

        if request.status == next {
            return Ok(Transition::Unchanged);
        }
        if request.status.is_terminal() {
            return Err(AppError::InvalidTransition {
                from: request.status.to_string(),
                to: next.to_string(),
            });
        }

        request.status = next;
        self.persist::<ResourceRequest>()?;
        Ok(Transition::Applied)
    }

    pub fn mark_resource_paid(&mut self, id: &str) -> AppResult<Transition> {
        self.set_resource_request_status(id, ResourceRequestStatus::Paid)
    }

    pub fn cancel_resource_request(&mut self, id: &str) -> AppResult<Transition> {
        self.set_resource_request_status(id, ResourceRequestStatus::Cancelled)
    }

    pub fn delete_resource_request(&mut self, id: &str) -> AppResult<Option<ResourceRequest>> {
        let removed = self.resource_requests.remove(id);
        if removed.is_some() {
            self.persist::<ResourceRequest>()?;
        }
        Ok(removed)
    }

    // ============ 원격 동기화 지원 ============

    /// 원격 쓰기가 확정된 뒤 원격 id 를 로컬 레코드에 기록
    pub fn record_remote_id<T: Entity>(&mut self, local_id: &str, remote_id: &str) -> AppResult<bool>
    where
        Self: HasCollection<T>,
    {
        let record = match <Self as HasCollection<T>>::collection_mut(self).get_mut(local_id) {
            Some(r) => r,
            None => return Ok(false),
        };
        if record.remote_id() == Some(remote_id) {
            return Ok(false);
        }
        record.set_remote_id(remote_id.to_string());
        self.persist::<T>()?;
        log::debug!("[Store] {} {} reconciled to remote id {}", T::KIND, local_id, remote_id);
        Ok(true)
    }

    /// 원격 변경 알림 후 전체 교체 (로컬 전용 변경분은 버려짐)
    pub fn replace_from_remote(&mut self, snapshot: RemoteSnapshot) -> AppResult<()> {
        self.users.replace_all(snapshot.users);
        self.doctors.replace_all(snapshot.doctors);
        self.appointments.replace_all(snapshot.appointments);
        self.resource_requests.replace_all(snapshot.resource_requests);

        self.persist::<User>()?;
        self.persist::<Doctor>()?;
        self.persist::<Appointment>()?;
        self.persist::<ResourceRequest>()?;
        Ok(())
    }
}

/// 공유 저장소 잠금. 잠금이 오염되면 오류
pub fn lock(store: &Mutex<Store>) -> AppResult<MutexGuard<'_, Store>> {
    store
        .lock()
        .map_err(|_| AppError::Custom("Store lock error".to_string()))
}

fn normalize_optional_phone(phone: Option<String>) -> AppResult<Option<String>> {
    match phone {
        Some(p) if !p.trim().is_empty() => Ok(Some(validation::normalize_phone(&p)?)),
        _ => Ok(None),
    }
}
