use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202608210001_create_students::Migration),
            Box::new(migrations::m202608210002_create_courses::Migration),
            Box::new(migrations::m202608210003_create_class_sessions::Migration),
            Box::new(migrations::m202608210004_create_devices::Migration),
            Box::new(migrations::m202608210005_create_scans::Migration),
            Box::new(migrations::m202608210006_create_attendance_records::Migration),
        ]
    }
}
