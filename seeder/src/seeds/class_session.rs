use crate::seed::Seeder;
use chrono::{Local, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use std::future::Future;
use std::pin::Pin;

use db::models::class_session::{self, SessionStatus};
use db::models::course;

pub struct ClassSessionSeeder;

/// Lecture slots assigned round-robin so every course gets one session today.
const SLOTS: &[(&str, &str)] = &[
    ("08:00", "08:50"),
    ("09:00", "09:50"),
    ("10:30", "11:20"),
    ("11:30", "12:20"),
    ("14:00", "14:50"),
];

const ROOMS: &[&str] = &["IT 4-1", "IT 4-2", "Eng 2-26", "Eng 3-15"];

impl Seeder for ClassSessionSeeder {
    fn seed<'a>(
        &'a self,
        db: &'a DatabaseConnection,
    ) -> Pin<Box<dyn Future<Output = Result<(), DbErr>> + Send + 'a>> {
        Box::pin(async move {
            let today = Local::now().format("%Y-%m-%d").to_string();
            let courses = course::Entity::find().all(db).await?;

            for (i, c) in courses.iter().enumerate() {
                let (start, end) = SLOTS[i % SLOTS.len()];
                class_session::ActiveModel {
                    course_id: Set(c.id),
                    session_date: Set(today.clone()),
                    start_time: Set(start.to_owned()),
                    end_time: Set(end.to_owned()),
                    room: Set(Some(ROOMS[i % ROOMS.len()].to_owned())),
                    status: Set(SessionStatus::Scheduled),
                    department: Set(c.department.clone()),
                    year: Set(c.year),
                    semester: Set(c.semester),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(db)
                .await?;
            }
            Ok(())
        })
    }
}
