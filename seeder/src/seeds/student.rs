use crate::seed::Seeder;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use std::future::Future;
use std::pin::Pin;

use db::models::student;

pub struct StudentSeeder;

const FIRST_NAMES: &[&str] = &[
    "Thandi", "Sipho", "Naledi", "Pieter", "Aisha", "Johan", "Zanele", "Ravi", "Lerato", "Emma",
];
const LAST_NAMES: &[&str] = &[
    "Mokoena", "Dlamini", "van der Merwe", "Naidoo", "Botha", "Khumalo", "Patel", "Nkosi",
];

impl Seeder for StudentSeeder {
    fn seed<'a>(
        &'a self,
        db: &'a DatabaseConnection,
    ) -> Pin<Box<dyn Future<Output = Result<(), DbErr>> + Send + 'a>> {
        Box::pin(async move {
            let mut rng = StdRng::seed_from_u64(42);

            for i in 0..40 {
                let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
                let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
                let registration_no = format!("u045{:05}", 10_000 + i);
                // split the cohort across two batches
                let (department, year, semester) = if i % 2 == 0 {
                    ("CS", 3, 5)
                } else {
                    ("EE", 2, 3)
                };

                student::ActiveModel {
                    registration_no: Set(registration_no.clone()),
                    name: Set(format!("{first} {last}")),
                    email: Set(format!("{registration_no}@campus.test")),
                    department: Set(department.to_owned()),
                    year: Set(year),
                    semester: Set(semester),
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
