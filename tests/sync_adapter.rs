mod common;

use common::*;
use medicore::db::SqliteStorage;
use medicore::feed::{ChangeFeed, ChannelFeed, PollingFeed};
use medicore::remote::{RemoteStore, RemoteTable};
use medicore::store::Store;
use medicore::sync::{Mirror, MirrorOp, SyncAdapter, MAX_RETRIES};
use medicore::{AppError, AppointmentStatus, NewAppointment, SyncOutcome, Transition};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::time::{sleep, timeout};

fn booking(doctor_id: &str, time: &str) -> NewAppointment {
    NewAppointment {
        patient_id: String::new(),
        doctor_id: doctor_id.to_string(),
        date: "2024-06-01".to_string(),
        time: time.to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn signup_and_booking_record_remote_ids() {
    let remote = MemoryRemote::new();
    let portal = remote_portal(&remote);

    let signup = portal
        .signup(patient_draft("x@y.com", "pw123"))
        .await
        .expect("signup should succeed");
    let profiles = remote.rows(RemoteTable::Profiles);
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["id"], json!(signup.value.id));
    assert_eq!(profiles[0]["role"], "patient");
    assert_eq!(profiles[0]["phone"], "+91 9876543210");

    let booked = portal
        .book_appointment(booking("d1", "09:00"))
        .await
        .expect("booking should succeed");
    assert_eq!(
        booked.sync,
        Some(SyncOutcome::Synced {
            remote_id: Some("1".to_string())
        })
    );

    let mine = portal.my_appointments().unwrap();
    assert_eq!(mine[0].remote_id.as_deref(), Some("1"));

    let rows = remote.rows(RemoteTable::Appointments);
    assert_eq!(rows[0]["doctor_name"], "Dr. Sarah Jenkins");
    assert_eq!(rows[0]["patient_email"], "x@y.com");
    assert_eq!(rows[0]["status"], "pending");
}

#[tokio::test]
async fn remote_failure_keeps_local_change_and_queues() {
    let remote = MemoryRemote::new();
    let portal = remote_portal(&remote);
    portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();

    remote.set_failing(true);
    let booked = portal.book_appointment(booking("d2", "10:30")).await.unwrap();
    let warning = booked.warning().expect("failure should surface as a warning");
    assert!(warning.contains("remote unavailable"));

    // 로컬 변경은 유지
    assert_eq!(portal.my_appointments().unwrap().len(), 1);
    assert!(portal.my_appointments().unwrap()[0].remote_id.is_none());
    assert_eq!(portal.pending_sync_count(), 1);

    remote.set_failing(false);
    assert_eq!(portal.retry_pending_sync().await.unwrap(), 1);
    assert_eq!(portal.pending_sync_count(), 0);
    assert_eq!(remote.rows(RemoteTable::Appointments).len(), 1);
    assert_eq!(
        portal.my_appointments().unwrap()[0].remote_id.as_deref(),
        Some("1")
    );
}

#[tokio::test]
async fn pending_items_are_dropped_after_max_retries() {
    let remote = MemoryRemote::new();
    let portal = remote_portal(&remote);
    portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();

    remote.set_failing(true);
    portal.book_appointment(booking("d1", "11:00")).await.unwrap();

    for attempt in 1..=MAX_RETRIES {
        assert_eq!(portal.retry_pending_sync().await.unwrap(), 0);
        let pending = portal.sync_adapter().unwrap().pending();
        assert_eq!(pending[0].retry_count, attempt);
    }

    portal.retry_pending_sync().await.unwrap();
    assert_eq!(portal.pending_sync_count(), 0);
}

#[tokio::test]
async fn update_falls_back_to_natural_key() {
    let remote = MemoryRemote::new();
    remote.seed(RemoteTable::Profiles, admin_profile());
    let portal = remote_portal(&remote);
    let patient = portal.signup(patient_draft("x@y.com", "pw")).await.unwrap().value;

    // 원격에 올라가지 않은 로컬 예약
    portal.set_sync_enabled(false);
    let appointment = portal
        .book_appointment(booking("d1", "09:00"))
        .await
        .unwrap()
        .value;
    portal.set_sync_enabled(true);

    // 다른 클라이언트가 같은 예약을 이미 넣어 둔 상태
    remote.seed(
        RemoteTable::Appointments,
        json!({
            "id": 77,
            "patient_id": patient.id,
            "patient_name": "Xavier Young",
            "doctor_name": "Dr. Sarah Jenkins",
            "appointment_date": "2024-06-01",
            "appointment_time": "09:00",
            "status": "pending"
        }),
    );

    portal.logout().unwrap();
    portal.login("admin@medicore.com", "admin").await.unwrap();

    let approved = portal.approve_appointment(&appointment.id).await.unwrap();
    assert_eq!(approved.value, Transition::Applied);
    assert_eq!(
        approved.sync,
        Some(SyncOutcome::Synced {
            remote_id: Some("77".to_string())
        })
    );

    let rows = remote.rows(RemoteTable::Appointments);
    assert_eq!(rows[0]["status"], "upcoming");

    let local = portal.all_appointments().unwrap();
    assert_eq!(local[0].remote_id.as_deref(), Some("77"));
    assert_eq!(local[0].status, AppointmentStatus::Upcoming);
}

#[tokio::test]
async fn delete_of_unmirrored_record_is_local_only() {
    let remote = MemoryRemote::new();
    remote.seed(RemoteTable::Profiles, admin_profile());
    let portal = remote_portal(&remote);
    portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();

    // 원격에 올라가지 않은 로컬 예약
    portal.set_sync_enabled(false);
    let appointment = portal
        .book_appointment(booking("d1", "09:00"))
        .await
        .unwrap()
        .value;
    portal.set_sync_enabled(true);

    portal.logout().unwrap();
    portal.login("admin@medicore.com", "admin").await.unwrap();

    let deleted = portal.delete_appointment(&appointment.id).await.unwrap();
    assert!(deleted.value.is_some());
    assert!(deleted.warning().unwrap().contains("not found remotely"));
    assert!(portal.all_appointments().unwrap().is_empty());
}

#[tokio::test]
async fn deleting_patient_mirrors_cascade() {
    let remote = MemoryRemote::new();
    remote.seed(RemoteTable::Profiles, admin_profile());
    let portal = remote_portal(&remote);
    let patient = portal.signup(patient_draft("x@y.com", "pw")).await.unwrap().value;
    portal.book_appointment(booking("d1", "09:00")).await.unwrap();

    portal.logout().unwrap();
    portal.login("admin@medicore.com", "admin").await.unwrap();

    let deletion = portal.delete_user(&patient.id).await.unwrap();
    assert_eq!(deletion.value.cancelled_appointments, 1);
    assert!(matches!(deletion.sync, Some(SyncOutcome::Synced { .. })));

    assert_eq!(remote.rows(RemoteTable::Profiles).len(), 1);
    assert_eq!(remote.rows(RemoteTable::Appointments)[0]["status"], "cancelled");
}

#[tokio::test]
async fn login_materializes_remote_profile() {
    let remote = MemoryRemote::new();
    remote.seed(
        RemoteTable::Profiles,
        json!({
            "id": "p-1",
            "name": "Ann",
            "email": "ann@x.com",
            "password": "pw",
            "role": "patient",
            "phone": "+91 1111111111"
        }),
    );
    let portal = remote_portal(&remote);

    let err = portal.login("ann@x.com", "wrong").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    assert!(portal.current_user().unwrap().is_none());

    let user = portal.login("ann@x.com", "pw").await.unwrap();
    assert_eq!(user.id, "p-1");
    assert_eq!(user.remote_id.as_deref(), Some("p-1"));
    assert_eq!(portal.current_user().unwrap().map(|u| u.id), Some("p-1".to_string()));

    // 두 번째 로그인은 로컬 사본 사용
    portal.logout().unwrap();
    assert_eq!(portal.login("ann@x.com", "pw").await.unwrap().id, "p-1");
}

#[tokio::test]
async fn rejected_remote_signup_leaves_no_local_user() {
    let remote = MemoryRemote::new();
    let portal = remote_portal(&remote);

    remote.set_failing(true);
    let err = portal.signup(patient_draft("x@y.com", "pw")).await.unwrap_err();
    assert!(matches!(err, AppError::Remote(_)));
    assert!(portal.current_user().unwrap().is_none());

    remote.set_failing(false);
    let user = portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();
    assert_eq!(user.value.email, "x@y.com");
}

#[tokio::test]
async fn disabled_sync_stays_local() {
    let remote = MemoryRemote::new();
    let portal = remote_portal(&remote);
    portal.set_sync_enabled(false);

    let signup = portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();
    assert_eq!(signup.sync, Some(SyncOutcome::Disabled));
    let booked = portal.book_appointment(booking("d1", "09:00")).await.unwrap();
    assert_eq!(booked.sync, Some(SyncOutcome::Disabled));

    assert!(remote.rows(RemoteTable::Profiles).is_empty());
    assert!(remote.rows(RemoteTable::Appointments).is_empty());
}

#[tokio::test]
async fn change_event_triggers_full_reload() {
    let remote = MemoryRemote::new();
    remote.seed(RemoteTable::Profiles, admin_profile());
    remote.seed(RemoteTable::Doctors, doctor_row(7, "Dr. Sarah Jenkins"));
    let portal = remote_portal(&remote);
    portal.login("admin@medicore.com", "admin").await.unwrap();

    let feed = ChannelFeed::new();
    portal.watch(&feed).unwrap();
    assert!(portal.is_watching());

    remote.seed(
        RemoteTable::Profiles,
        json!({ "id": "p-9", "name": "Ann", "email": "ann@x.com", "password": "pw", "role": "patient" }),
    );
    remote.seed(
        RemoteTable::Appointments,
        json!({
            "id": 300,
            "patient_id": "p-9",
            "patient_name": "Ann",
            "doctor_name": "Dr. Sarah Jenkins",
            "appointment_date": "2024-06-02",
            "appointment_time": "10:00",
            "status": "upcoming"
        }),
    );
    assert_eq!(feed.notify(RemoteTable::Appointments), 1);

    let reloaded = eventually(|| {
        portal
            .all_appointments()
            .map(|a| a.len() == 1)
            .unwrap_or(false)
    })
    .await;
    assert!(reloaded, "appointments should be replaced from the remote");

    let appointment = &portal.all_appointments().unwrap()[0];
    assert_eq!(appointment.id, "300");
    assert_eq!(appointment.doctor_id, "7");
    assert_eq!(appointment.status, AppointmentStatus::Upcoming);
    assert_eq!(portal.list_users().unwrap().len(), 2);
    // 원격 의사 1명 + 원격에 없는 기본 의사 9명
    assert_eq!(portal.list_doctors().unwrap().len(), 10);

    portal.stop_watching();
    assert!(!portal.is_watching());
}

#[tokio::test]
async fn session_is_revalidated_after_reload() {
    let remote = MemoryRemote::new();
    remote.seed(RemoteTable::Profiles, admin_profile());
    let portal = remote_portal(&remote);
    portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();
    assert!(portal.current_user().unwrap().is_some());

    // 원격에서 계정이 삭제됨
    remote.clear(RemoteTable::Profiles);
    remote.seed(RemoteTable::Profiles, admin_profile());

    let summary = portal.reload_from_remote().await.unwrap();
    assert_eq!(summary.users, 1);
    assert!(portal.current_user().unwrap().is_none());
}

#[tokio::test]
async fn adapter_is_inert_once_store_is_dropped() {
    let remote = MemoryRemote::new();
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let store = Arc::new(Mutex::new(Store::open(storage).unwrap()));
    let dyn_remote: Arc<dyn RemoteStore> = remote.clone();
    let adapter = Arc::new(SyncAdapter::new(dyn_remote, &store));

    let doctor = store.lock().unwrap().doctors().get("d1").cloned().unwrap();
    let record = doctor.to_record(&store.lock().unwrap());
    drop(store);

    // 원격 쓰기는 끝나지만 로컬 기록은 건너뜀
    let outcome = adapter.mirror(MirrorOp::Insert, record).await;
    assert!(matches!(outcome, SyncOutcome::Synced { .. }));
    assert_eq!(adapter.reload().await.unwrap().users, 0);

    let feed = ChannelFeed::new();
    let handle = adapter.watch(&feed, None);
    drop(feed);
    assert!(eventually(|| handle.is_finished()).await);
}

/// 삽입이 대기 중인 예약을 취소하면 재시도 시 취소된 상태로 올라감
#[tokio::test]
async fn cancel_before_retry_is_folded_into_queued_insert() {
    let remote = MemoryRemote::new();
    let portal = remote_portal(&remote);
    portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();

    // ================================================================
    // PHASE 1: Booking while the remote is down
    // ================================================================
    remote.set_failing(true);
    let appointment = portal
        .book_appointment(booking("d1", "09:00"))
        .await
        .unwrap()
        .value;
    remote.set_failing(false);

    // ================================================================
    // PHASE 2: Cancel waits for the queued insert
    // ================================================================
    let cancelled = portal.cancel_appointment(&appointment.id).await.unwrap();
    assert_eq!(cancelled.value, Transition::Applied);
    assert!(cancelled.warning().unwrap().contains("waiting for its insert"));
    assert_eq!(portal.pending_sync_count(), 1);
    assert!(remote.rows(RemoteTable::Appointments).is_empty());

    // ================================================================
    // PHASE 3: Retry uploads the latest state, reload keeps it
    // ================================================================
    assert_eq!(portal.retry_pending_sync().await.unwrap(), 1);
    let rows = remote.rows(RemoteTable::Appointments);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "cancelled");

    portal.reload_from_remote().await.unwrap();
    let mine = portal.my_appointments().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, AppointmentStatus::Cancelled);
    assert_eq!(mine[0].remote_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn delete_before_retry_drops_queued_insert() {
    let remote = MemoryRemote::new();
    remote.seed(RemoteTable::Profiles, admin_profile());
    let portal = remote_portal(&remote);
    portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();

    remote.set_failing(true);
    let appointment = portal
        .book_appointment(booking("d1", "09:00"))
        .await
        .unwrap()
        .value;
    remote.set_failing(false);
    assert_eq!(portal.pending_sync_count(), 1);

    portal.logout().unwrap();
    portal.login("admin@medicore.com", "admin").await.unwrap();
    let deleted = portal.delete_appointment(&appointment.id).await.unwrap();
    assert_eq!(deleted.sync, Some(SyncOutcome::Synced { remote_id: None }));
    assert_eq!(portal.pending_sync_count(), 0);

    assert_eq!(portal.retry_pending_sync().await.unwrap(), 0);
    assert!(remote.rows(RemoteTable::Appointments).is_empty());
}

#[tokio::test]
async fn ambiguous_natural_key_leaves_remote_untouched() {
    let remote = MemoryRemote::new();
    remote.seed(RemoteTable::Profiles, admin_profile());
    let portal = remote_portal(&remote);
    let patient = portal.signup(patient_draft("x@y.com", "pw")).await.unwrap().value;

    portal.set_sync_enabled(false);
    let appointment = portal
        .book_appointment(booking("d1", "09:00"))
        .await
        .unwrap()
        .value;
    portal.set_sync_enabled(true);

    // 취소된 예약과 다시 잡은 예약이 같은 자연 키를 가짐
    for (id, status) in [(50, "cancelled"), (51, "upcoming")] {
        remote.seed(
            RemoteTable::Appointments,
            json!({
                "id": id,
                "patient_id": patient.id,
                "patient_name": "Xavier Young",
                "doctor_name": "Dr. Sarah Jenkins",
                "appointment_date": "2024-06-01",
                "appointment_time": "09:00",
                "status": status
            }),
        );
    }

    portal.logout().unwrap();
    portal.login("admin@medicore.com", "admin").await.unwrap();
    let deleted = portal.delete_appointment(&appointment.id).await.unwrap();
    assert!(deleted.value.is_some());
    assert!(deleted.warning().unwrap().contains("matched 2 remote rows"));
    assert_eq!(remote.rows(RemoteTable::Appointments).len(), 2);
}

#[tokio::test]
async fn synced_appointment_survives_reload_without_remote_doctors() {
    let remote = MemoryRemote::new();
    let portal = remote_portal(&remote);
    portal.signup(patient_draft("x@y.com", "pw")).await.unwrap();
    let booked = portal.book_appointment(booking("d3", "14:00")).await.unwrap();
    assert!(matches!(booked.sync, Some(SyncOutcome::Synced { .. })));

    let summary = portal.reload_from_remote().await.unwrap();
    assert_eq!(summary.appointments, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(portal.list_doctors().unwrap().len(), 10);

    let mine = portal.my_appointments().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].doctor_id, "d3");
    assert_eq!(mine[0].remote_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn polling_feed_reports_changed_tables() {
    let remote = MemoryRemote::new();
    let dyn_remote: Arc<dyn RemoteStore> = remote.clone();
    let feed = PollingFeed::start(dyn_remote, &[RemoteTable::Appointments], Duration::from_millis(20));
    let mut rx = feed.subscribe();

    // 첫 조회는 기준값만 기록
    sleep(Duration::from_millis(80)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    // 조회 실패 동안은 이전 지문 유지
    remote.set_failing(true);
    sleep(Duration::from_millis(80)).await;
    remote.set_failing(false);
    sleep(Duration::from_millis(80)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    remote.seed(RemoteTable::Appointments, json!({ "id": 1, "status": "pending" }));
    let event = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("change should be reported")
        .unwrap();
    assert_eq!(event.table, RemoteTable::Appointments);

    // feed 를 drop 하면 폴링 작업도 중지되어 채널이 닫힘
    drop(feed);
    let closed = timeout(Duration::from_secs(2), async {
        loop {
            if let Err(RecvError::Closed) = rx.recv().await {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn watched_portal_reloads_after_remote_change() {
    let remote = MemoryRemote::new();
    remote.seed(RemoteTable::Profiles, admin_profile());
    let portal = remote_portal(&remote).with_poll_interval(Duration::from_millis(20));
    assert_eq!(portal.poll_interval(), Duration::from_millis(20));
    portal.login("admin@medicore.com", "admin").await.unwrap();

    portal.watch_remote().unwrap();
    assert!(portal.is_watching());
    sleep(Duration::from_millis(80)).await;

    remote.seed(
        RemoteTable::Appointments,
        json!({
            "id": 400,
            "patient_id": "p-4",
            "patient_name": "Dana",
            "doctor_name": "Dr. Sarah Jenkins",
            "appointment_date": "2024-06-03",
            "appointment_time": "11:00",
            "status": "pending"
        }),
    );

    let reloaded = eventually(|| {
        portal
            .all_appointments()
            .map(|a| a.len() == 1)
            .unwrap_or(false)
    })
    .await;
    assert!(reloaded, "polling should pick up the new appointment");
    assert_eq!(portal.all_appointments().unwrap()[0].doctor_id, "d1");

    portal.stop_watching();
}
