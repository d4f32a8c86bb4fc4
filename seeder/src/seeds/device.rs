use crate::seed::Seeder;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use std::future::Future;
use std::pin::Pin;

use db::models::device::{self, DeviceStatus};

pub struct DeviceSeeder;

const ROOMS: &[&str] = &["IT 4-1", "IT 4-2", "Eng 2-26", "Eng 3-15"];

impl Seeder for DeviceSeeder {
    fn seed<'a>(
        &'a self,
        db: &'a DatabaseConnection,
    ) -> Pin<Box<dyn Future<Output = Result<(), DbErr>> + Send + 'a>> {
        Box::pin(async move {
            for (i, room) in ROOMS.iter().enumerate() {
                device::ActiveModel {
                    api_key: Set(format!("scanner-key-{}", i + 1)),
                    name: Set(format!("Door scanner {room}")),
                    status: Set(DeviceStatus::Offline),
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
