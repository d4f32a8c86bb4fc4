use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202608210003_create_class_sessions"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("class_sessions"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("course_id"))
                            .big_integer()
                            .not_null(),
                    )
                    // Local calendar date as "YYYY-MM-DD"; string order must
                    // equal date order, so the format is load-bearing.
                    .col(
                        ColumnDef::new(Alias::new("session_date"))
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("start_time"))
                            .string_len(5)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("end_time"))
                            .string_len(5)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("room")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .enumeration(
                                Alias::new("session_status"),
                                vec![
                                    Alias::new("scheduled"),
                                    Alias::new("live"),
                                    Alias::new("closed"),
                                ],
                            )
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(ColumnDef::new(Alias::new("department")).string().not_null())
                    .col(ColumnDef::new(Alias::new("year")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("semester")).integer().not_null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_class_sessions_course")
                            .from(Alias::new("class_sessions"), Alias::new("course_id"))
                            .to(Alias::new("courses"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Scan ingestion resolves sessions by (date, status) on every scan.
        manager
            .create_index(
                Index::create()
                    .name("idx_class_sessions_date_status")
                    .table(Alias::new("class_sessions"))
                    .col(Alias::new("session_date"))
                    .col(Alias::new("status"))
                    .to_owned(),
            )
            .await?;

        // The lifecycle manager counts live sessions per batch on every tick.
        manager
            .create_index(
                Index::create()
                    .name("idx_class_sessions_batch_status")
                    .table(Alias::new("class_sessions"))
                    .col(Alias::new("department"))
                    .col(Alias::new("year"))
                    .col(Alias::new("semester"))
                    .col(Alias::new("status"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("class_sessions")).to_owned())
            .await
    }
}
