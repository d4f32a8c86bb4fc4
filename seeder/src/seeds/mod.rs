pub mod class_session;
pub mod course;
pub mod device;
pub mod student;
