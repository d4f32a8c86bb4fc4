pub mod m202608210001_create_students;
pub mod m202608210002_create_courses;
pub mod m202608210003_create_class_sessions;
pub mod m202608210004_create_devices;
pub mod m202608210005_create_scans;
pub mod m202608210006_create_attendance_records;
