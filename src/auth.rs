//! 세션/인증 관리
//!
//! 현재 로그인 사용자는 전역 상태가 아니라 `Session` 값으로 명시적으로 전달됩니다.
//! 비밀번호는 평문 일치로 비교합니다. 운영 배포 시 반드시 솔트 해시로 교체해야 합니다.

use crate::db::{self, Storage};
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, Role, User, UserDeletion};
use crate::store::Store;
use crate::validation;
use serde::{Deserialize, Serialize};

/// 현재 인증 상태 (최대 한 명)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    current_user: Option<User>,
}

impl Session {
    /// 저장된 세션 복원. 사용자 목록에 없는 사용자는 버림
    pub fn restore(store: &Store) -> AppResult<Self> {
        let saved: Option<User> = db::load_value(store.storage(), db::KEY_CURRENT_USER)?;
        let mut session = Session { current_user: saved };
        session.revalidate(store)?;
        Ok(session)
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn require_user(&self) -> AppResult<&User> {
        self.current_user.as_ref().ok_or(AppError::NotAuthenticated)
    }

    pub fn require_admin(&self) -> AppResult<&User> {
        let user = self.require_user()?;
        if user.role != Role::Admin {
            return Err(AppError::Forbidden("administrator only".to_string()));
        }
        Ok(user)
    }

    pub fn require_patient(&self) -> AppResult<&User> {
        let user = self.require_user()?;
        if user.role != Role::Patient {
            return Err(AppError::Forbidden("patient only".to_string()));
        }
        Ok(user)
    }

    fn set(&mut self, user: Option<User>, storage: &dyn Storage) -> AppResult<()> {
        self.current_user = user;
        db::save_value(storage, db::KEY_CURRENT_USER, self.current_user.as_ref())
    }

    /// 세션 사용자를 최신 레코드로 갱신. id 로 못 찾으면 이메일로 재매칭, 그래도 없으면 로그아웃
    pub fn revalidate(&mut self, store: &Store) -> AppResult<()> {
        let current = match &self.current_user {
            Some(u) => u,
            None => return Ok(()),
        };

        let fresh = store
            .users()
            .get(&current.id)
            .or_else(|| store.find_user_by_email(&current.email))
            .cloned();

        if fresh.is_none() {
            log::info!("Session user {} no longer exists, logging out", current.id);
        }
        if fresh != self.current_user {
            self.set(fresh, store.storage())?;
        }
        Ok(())
    }
}

/// 이메일/비밀번호 로그인. 실패 시 이메일 존재 여부를 드러내지 않음
pub fn login(store: &Store, session: &mut Session, email: &str, password: &str) -> AppResult<User> {
    let user = match store.find_user_by_credentials(email, password) {
        Some(u) => u.clone(),
        None => {
            log::info!("Login failed");
            return Err(AppError::InvalidCredentials);
        }
    };

    session.set(Some(user.clone()), store.storage())?;
    log::info!("User logged in successfully: {}", user.id);
    Ok(user)
}

/// 가입 입력 검증 및 정규화 (저장소 변경 전)
pub fn prepare_signup(mut draft: NewUser) -> AppResult<NewUser> {
    validation::require("Name", &draft.name)?;
    validation::email(&draft.email)?;
    validation::require("Password", &draft.password)?;

    let phone = draft.phone.as_deref().unwrap_or_default();
    draft.phone = Some(validation::normalize_phone(phone)?);

    if draft.role == Role::Admin {
        draft.address = None;
    }
    if draft.avatar.is_none() {
        draft.avatar = Some(format!(
            "https://ui-avatars.com/api/?name={}&background=random",
            draft.name.replace(' ', "+")
        ));
    }
    Ok(draft)
}

/// 회원가입 = 사용자 추가 + 즉시 로그인
pub fn signup(store: &mut Store, session: &mut Session, draft: NewUser) -> AppResult<User> {
    let draft = prepare_signup(draft)?;
    let user = store.add_user(draft)?;
    session.set(Some(user.clone()), store.storage())?;
    log::info!("User signed up: {}", user.id);
    Ok(user)
}

/// 원격 프로필 id 를 그대로 쓰는 가입 (원격에서 먼저 확인된 사용자)
pub fn adopt_user(store: &mut Store, session: &mut Session, user: User) -> AppResult<User> {
    let user = store.insert_user_with_id(user)?;
    session.set(Some(user.clone()), store.storage())?;
    Ok(user)
}

/// 세션만 비움. 다른 컬렉션은 유지
pub fn logout(store: &Store, session: &mut Session) -> AppResult<()> {
    session.set(None, store.storage())?;
    log::info!("User logged out");
    Ok(())
}

/// 프로필 수정. 현재 사용자면 세션 사본도 갱신
pub fn update_profile(store: &mut Store, session: &mut Session, user: User) -> AppResult<bool> {
    let updated = store.update_user(user)?;
    session.revalidate(store)?;
    Ok(updated)
}

/// 본인 계정 삭제 (예약 연쇄 취소) 후 로그아웃
pub fn delete_account(store: &mut Store, session: &mut Session) -> AppResult<UserDeletion> {
    let user_id = session.require_user()?.id.clone();
    let deletion = store.delete_user(&user_id)?;
    logout(store, session)?;
    Ok(deletion)
}
