use crate::seed::Seeder;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use std::future::Future;
use std::pin::Pin;

use db::models::course;

pub struct CourseSeeder;

const COURSES: &[(&str, &str, &str, i32, i32)] = &[
    ("CS301", "Operating Systems", "CS", 3, 5),
    ("CS305", "Database Systems", "CS", 3, 5),
    ("CS310", "Computer Networks", "CS", 3, 6),
    ("EE201", "Circuit Analysis", "EE", 2, 3),
    ("EE210", "Signals and Systems", "EE", 2, 4),
    ("ME101", "Engineering Drawing", "ME", 1, 1),
];

impl Seeder for CourseSeeder {
    fn seed<'a>(
        &'a self,
        db: &'a DatabaseConnection,
    ) -> Pin<Box<dyn Future<Output = Result<(), DbErr>> + Send + 'a>> {
        Box::pin(async move {
            for (code, title, department, year, semester) in COURSES {
                course::ActiveModel {
                    code: Set((*code).to_owned()),
                    title: Set((*title).to_owned()),
                    department: Set((*department).to_owned()),
                    year: Set(*year),
                    semester: Set(*semester),
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
