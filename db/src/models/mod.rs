pub mod attendance_record;
pub mod class_session;
pub mod course;
pub mod device;
pub mod scan;
pub mod student;

pub use attendance_record::Entity as AttendanceRecord;
pub use class_session::Entity as ClassSession;
pub use course::Entity as Course;
pub use device::Entity as Device;
pub use scan::Entity as Scan;
pub use student::Entity as Student;
