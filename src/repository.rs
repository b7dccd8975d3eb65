//! 엔티티별 메모리 컬렉션

use crate::db;
use crate::models::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// 저장소가 관리하는 엔티티
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// 영속 저장소 키
    const COLLECTION: &'static str;
    /// 로그/오류 메시지용 이름
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// 원격 저장소에서 확정된 id (id 재조정용)
    fn remote_id(&self) -> Option<&str> {
        None
    }

    fn set_remote_id(&mut self, _remote_id: String) {}
}

/// id 가 없는 생성 입력
pub trait Draft {
    type Output: Entity;

    fn into_entity(self, id: String) -> Self::Output;
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone)]
pub struct Repository<T: Entity> {
    items: Vec<T>,
}

impl<T: Entity> Default for Repository<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// 새 id 를 발급해 추가하고 생성된 레코드를 반환
    pub fn add<D: Draft<Output = T>>(&mut self, draft: D) -> &T {
        let mut id = generate_id();
        while self.contains(&id) {
            id = generate_id();
        }
        self.items.push(draft.into_entity(id));
        &self.items[self.items.len() - 1]
    }

    /// 이미 id 가 확정된 레코드 추가 (호출자가 중복을 확인)
    pub fn push(&mut self, record: T) {
        self.items.push(record);
    }

    /// id 가 같은 레코드를 교체. 없으면 `false`
    pub fn replace(&mut self, record: T) -> bool {
        match self.items.iter_mut().find(|item| item.id() == record.id()) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// 다시 호출하면 처음부터 순회
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 조건에 맞는 레코드 일괄 수정. 실제로 바뀐 건수 반환
    pub fn update_where<P, F>(&mut self, predicate: P, mut apply: F) -> usize
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T) -> bool,
    {
        let mut changed = 0;
        for item in self.items.iter_mut().filter(|item| predicate(&**item)) {
            if apply(item) {
                changed += 1;
            }
        }
        changed
    }

    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn persist(&self, storage: &dyn db::Storage) -> crate::error::AppResult<()> {
        db::save_collection(storage, T::COLLECTION, &self.items)
    }
}

impl<'a, T: Entity> IntoIterator for &'a Repository<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============ 엔티티 구현 ============

impl Entity for User {
    const COLLECTION: &'static str = db::KEY_USERS;
    const KIND: &'static str = "User";

    fn id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: String) {
        self.remote_id = Some(remote_id);
    }
}

impl Entity for Doctor {
    const COLLECTION: &'static str = db::KEY_DOCTORS;
    const KIND: &'static str = "Doctor";

    fn id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: String) {
        self.remote_id = Some(remote_id);
    }
}

impl Entity for Appointment {
    const COLLECTION: &'static str = db::KEY_APPOINTMENTS;
    const KIND: &'static str = "Appointment";

    fn id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: String) {
        self.remote_id = Some(remote_id);
    }
}

impl Entity for ResourceRequest {
    const COLLECTION: &'static str = db::KEY_RESOURCE_REQUESTS;
    const KIND: &'static str = "ResourceRequest";

    fn id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: String) {
        self.remote_id = Some(remote_id);
    }
}

// 카탈로그는 원격에 미러링하지 않음
impl Entity for HospitalResource {
    const COLLECTION: &'static str = db::KEY_HOSPITAL_RESOURCES;
    const KIND: &'static str = "HospitalResource";

    fn id(&self) -> &str {
        &self.id
    }
}

// ============ 생성 입력 구현 ============

impl Draft for NewUser {
    type Output = User;

    fn into_entity(self, id: String) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            role: self.role,
            password: self.password,
            avatar: self.avatar,
            phone: self.phone,
            address: self.address,
            remote_id: None,
        }
    }
}

impl Draft for NewDoctor {
    type Output = Doctor;

    fn into_entity(self, id: String) -> Doctor {
        Doctor {
            id,
            name: self.name,
            specialty: self.specialty,
            bio: self.bio,
            image: self.image,
            experience: self.experience,
            available_days: self.available_days,
            time_slots: self.time_slots,
            remote_id: None,
        }
    }
}

impl Draft for NewHospitalResource {
    type Output = HospitalResource;

    fn into_entity(self, id: String) -> HospitalResource {
        HospitalResource {
            id,
            name: self.name,
            resource_type: self.resource_type,
            price: self.price,
            total_stock: self.total_stock,
        }
    }
}

/// 스냅샷 이름이 채워진 예약 입력
pub struct AppointmentDraft {
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub date: String,
    pub time: String,
    pub notes: Option<String>,
}

impl Draft for AppointmentDraft {
    type Output = Appointment;

    fn into_entity(self, id: String) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            doctor_id: self.doctor_id,
            doctor_name: self.doctor_name,
            date: self.date,
            time: self.time,
            status: AppointmentStatus::Pending,
            notes: self.notes,
            remote_id: None,
        }
    }
}

pub struct ResourceRequestDraft {
    pub patient_id: String,
    pub patient_name: String,
    pub resource_id: String,
    pub price: f64,
    pub date: String,
}

impl Draft for ResourceRequestDraft {
    type Output = ResourceRequest;

    fn into_entity(self, id: String) -> ResourceRequest {
        ResourceRequest {
            id,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            resource_id: self.resource_id,
            price: self.price,
            date: self.date,
            status: ResourceRequestStatus::Pending,
            remote_id: None,
        }
    }
}
