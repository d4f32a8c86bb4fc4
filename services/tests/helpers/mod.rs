use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use db::models::{
    attendance_record::{self, AttendanceStatus},
    class_session::{self, SessionStatus},
    course,
    device::{self, DeviceStatus},
    student,
};
use services::events::{AttendanceEvent, Notifier};

/// Captures every published event so tests can assert on them.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<AttendanceEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<AttendanceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, event: AttendanceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Today's date in the deployment-local frame, as stored on sessions.
pub fn today_local() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// A UTC capture timestamp whose local wall-clock reading is `date` `time`.
pub fn capture_at(date: &str, time: &str) -> DateTime<Utc> {
    let d = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    let t = NaiveTime::parse_from_str(time, "%H:%M").unwrap();
    Local
        .from_local_datetime(&d.and_time(t))
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
}

pub async fn seed_course(
    db: &DatabaseConnection,
    code: &str,
    department: &str,
    year: i32,
    semester: i32,
) -> course::Model {
    course::ActiveModel {
        code: Set(code.to_owned()),
        title: Set(format!("{code} lectures")),
        department: Set(department.to_owned()),
        year: Set(year),
        semester: Set(semester),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed course")
}

pub async fn seed_student(
    db: &DatabaseConnection,
    registration_no: &str,
    name: &str,
) -> student::Model {
    student::ActiveModel {
        registration_no: Set(registration_no.to_owned()),
        name: Set(name.to_owned()),
        email: Set(format!("{registration_no}@campus.test")),
        department: Set("CS".to_owned()),
        year: Set(3),
        semester: Set(5),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed student")
}

pub async fn seed_device(db: &DatabaseConnection, api_key: &str) -> device::Model {
    device::ActiveModel {
        api_key: Set(api_key.to_owned()),
        name: Set(format!("scanner {api_key}")),
        status: Set(DeviceStatus::Offline),
        last_seen_at: Set(None),
        current_session_id: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed device")
}

#[allow(clippy::too_many_arguments)]
pub async fn seed_session(
    db: &DatabaseConnection,
    course: &course::Model,
    date: &str,
    start_time: &str,
    end_time: &str,
    status: SessionStatus,
) -> class_session::Model {
    class_session::ActiveModel {
        course_id: Set(course.id),
        session_date: Set(date.to_owned()),
        start_time: Set(start_time.to_owned()),
        end_time: Set(end_time.to_owned()),
        room: Set(Some("A-101".to_owned())),
        status: Set(status),
        department: Set(course.department.clone()),
        year: Set(course.year),
        semester: Set(course.semester),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed session")
}

/// A manually created record, e.g. an instructor marking someone absent.
pub async fn seed_record(
    db: &DatabaseConnection,
    session_id: i64,
    student_id: i64,
    status: AttendanceStatus,
) -> attendance_record::Model {
    attendance_record::ActiveModel {
        session_id: Set(session_id),
        student_id: Set(student_id),
        status: Set(status),
        check_in_at: Set(None),
        scan_id: Set(None),
        notes: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed attendance record")
}
