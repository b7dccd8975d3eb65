//! 최초 실행 시 기본 데이터
//!
//! 저장소에 해당 컬렉션 키가 없을 때만 사용됩니다.

use crate::models::*;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@medicore.com";

pub fn default_users() -> Vec<User> {
    vec![User {
        id: "admin1".to_string(),
        name: "Super Admin".to_string(),
        email: DEFAULT_ADMIN_EMAIL.to_string(),
        role: Role::Admin,
        password: "admin".to_string(),
        avatar: Some("https://picsum.photos/seed/admin/100/100".to_string()),
        phone: None,
        address: None,
        remote_id: None,
    }]
}

fn doctor(
    id: &str,
    name: &str,
    specialty: &str,
    bio: &str,
    experience: u32,
    days: &[&str],
    slots: &[&str],
) -> Doctor {
    let seed = id.trim_start_matches('d');
    Doctor {
        id: id.to_string(),
        name: name.to_string(),
        specialty: specialty.to_string(),
        bio: bio.to_string(),
        image: format!("https://picsum.photos/seed/doc{}/200/200", seed),
        experience,
        available_days: days.iter().map(|d| d.to_string()).collect(),
        time_slots: slots.iter().map(|s| s.to_string()).collect(),
        remote_id: None,
    }
}

pub fn default_doctors() -> Vec<Doctor> {
    vec![
        doctor(
            "d1",
            "Dr. Sarah Jenkins",
            "Cardiology",
            "Top-rated cardiologist with over 15 years of experience in heart health.",
            15,
            &["Mon", "Wed", "Fri"],
            &["09:00", "10:00", "11:00", "14:00"],
        ),
        doctor(
            "d2",
            "Dr. Michael Chen",
            "Pediatrics",
            "Compassionate pediatrician loved by kids and trusted by parents.",
            8,
            &["Tue", "Thu", "Sat"],
            &["09:00", "10:30", "13:00", "15:30"],
        ),
        doctor(
            "d3",
            "Dr. Emily Stone",
            "Dermatology",
            "Expert in skin care, acne treatment, and cosmetic procedures.",
            12,
            &["Mon", "Tue", "Thu", "Fri"],
            &["10:00", "11:00", "14:00", "16:00"],
        ),
        doctor(
            "d4",
            "Dr. James Wilson",
            "Neurology",
            "Specializes in treating disorders of the nervous system with advanced therapies.",
            20,
            &["Mon", "Thu"],
            &["11:00", "13:00", "15:00"],
        ),
        doctor(
            "d5",
            "Dr. Linda Martinez",
            "Orthopedics",
            "Expert in bone, joint, and muscle health, helping you move without pain.",
            10,
            &["Tue", "Wed", "Fri"],
            &["09:00", "12:00", "16:00"],
        ),
        doctor(
            "d6",
            "Dr. Robert Kim",
            "General Surgery",
            "Skilled surgeon dedicated to providing safe and effective surgical procedures.",
            14,
            &["Mon", "Tue", "Wed", "Thu", "Fri"],
            &["08:00", "10:00", "14:00"],
        ),
        doctor(
            "d7",
            "Dr. Susan Lee",
            "Psychiatry",
            "Empathetic psychiatrist helping patients achieve mental wellness and balance.",
            9,
            &["Mon", "Wed", "Thu"],
            &["10:00", "11:30", "14:00"],
        ),
        doctor(
            "d8",
            "Dr. David Patel",
            "Ophthalmology",
            "Vision care specialist focused on eye health and corrective surgeries.",
            18,
            &["Tue", "Thu", "Fri"],
            &["09:00", "11:00", "15:00"],
        ),
        doctor(
            "d9",
            "Dr. Olivia Brown",
            "Oncology",
            "Dedicated oncologist providing comprehensive cancer care and support.",
            22,
            &["Mon", "Tue", "Wed"],
            &["08:30", "12:00", "14:30"],
        ),
        doctor(
            "d10",
            "Dr. William Davis",
            "ENT",
            "Specialist in Ear, Nose, and Throat conditions for both adults and children.",
            11,
            &["Wed", "Thu", "Fri"],
            &["09:30", "13:00", "16:30"],
        ),
    ]
}

pub fn default_hospital_resources() -> Vec<HospitalResource> {
    let entry = |id: &str, name: &str, kind: &str, price: f64, stock: u32| HospitalResource {
        id: id.to_string(),
        name: name.to_string(),
        resource_type: kind.to_string(),
        price,
        total_stock: stock,
    };

    vec![
        entry("r1", "General Ward Bed", "bed", 1500.0, 50),
        entry("r2", "ICU Bed", "bed", 5000.0, 10),
        entry("r3", "Oxygen Cylinder", "oxygen", 800.0, 30),
        entry("r4", "Ventilator", "equipment", 3000.0, 8),
        entry("r5", "Wheelchair", "equipment", 200.0, 20),
    ]
}
