use crate::seed::{run_seeder, Seeder};
use crate::seeds::{
    class_session::ClassSessionSeeder, course::CourseSeeder, device::DeviceSeeder,
    student::StudentSeeder,
};
use common::config::AppConfig;

mod seed;
mod seeds;

#[tokio::main]
async fn main() {
    AppConfig::init();

    let db = match db::connect().await {
        Ok(db) => db,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    for (seeder, name) in [
        (Box::new(CourseSeeder) as Box<dyn Seeder + Send + Sync>, "Course"),
        (Box::new(StudentSeeder), "Student"),
        (Box::new(DeviceSeeder), "Device"),
        (Box::new(ClassSessionSeeder), "ClassSession"),
    ] {
        run_seeder(&*seeder, name, &db).await;
    }
}
