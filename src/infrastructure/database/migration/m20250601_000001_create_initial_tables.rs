//! Initial migration to create all tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reference tables
        manager
            .create_table(
                Table::create()
                    .table(Sources::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sources::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sources::SourceId).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tasks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Tasks::Name).string().not_null())
                    .col(ColumnDef::new(Tasks::SourceId).string().not_null())
                    .col(ColumnDef::new(Tasks::StartAt).string().not_null())
                    .col(ColumnDef::new(Tasks::EndAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_source_id")
                    .table(Tasks::Table)
                    .col(Tasks::SourceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_period")
                    .table(Tasks::Table)
                    .col(Tasks::StartAt)
                    .col(Tasks::EndAt)
                    .to_owned(),
            )
            .await?;

        // Frames and everything they own
        manager
            .create_table(
                Table::create()
                    .table(Frames::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Frames::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Frames::SourceId).string().not_null())
                    .col(ColumnDef::new(Frames::TimestampSec).double().not_null())
                    .col(ColumnDef::new(Frames::At).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_frames_source_at")
                    .table(Frames::Table)
                    .col(Frames::SourceId)
                    .col(Frames::At)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Objects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Objects::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Objects::FrameId).string().not_null())
                    .col(ColumnDef::new(Objects::Type).string().not_null())
                    .col(ColumnDef::new(Objects::BboxX).integer().not_null())
                    .col(ColumnDef::new(Objects::BboxY).integer().not_null())
                    .col(ColumnDef::new(Objects::BboxWidth).integer().not_null())
                    .col(ColumnDef::new(Objects::BboxHeight).integer().not_null())
                    .col(ColumnDef::new(Objects::TrackId).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Objects::Table, Objects::FrameId)
                            .to(Frames::Table, Frames::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_objects_frame_id")
                    .table(Objects::Table)
                    .col(Objects::FrameId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransportAttrs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TransportAttrs::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(TransportAttrs::ObjectId).string().not_null().unique_key())
                    .col(ColumnDef::new(TransportAttrs::ColorHsv).string().not_null())
                    .col(ColumnDef::new(TransportAttrs::LicensePlate).string())
                    .foreign_key(
                        ForeignKey::create()
                            .from(TransportAttrs::Table, TransportAttrs::ObjectId)
                            .to(Objects::Table, Objects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PersonAttrs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PersonAttrs::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(PersonAttrs::ObjectId).string().not_null().unique_key())
                    .col(ColumnDef::new(PersonAttrs::UpperColorHsv).string())
                    .col(ColumnDef::new(PersonAttrs::LowerColorHsv).string())
                    .foreign_key(
                        ForeignKey::create()
                            .from(PersonAttrs::Table, PersonAttrs::ObjectId)
                            .to(Objects::Table, Objects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Embeddings, owned by exactly one frame XOR one object
        manager
            .create_table(
                Table::create()
                    .table(Embeddings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Embeddings::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Embeddings::EntityType)
                            .string()
                            .not_null()
                            .check(Expr::cust(
                                "(entity_type = 'FRAME' AND frame_id IS NOT NULL AND object_id IS NULL) \
                                 OR (entity_type = 'OBJECT' AND object_id IS NOT NULL AND frame_id IS NULL)",
                            )),
                    )
                    .col(ColumnDef::new(Embeddings::FrameId).string())
                    .col(ColumnDef::new(Embeddings::ObjectId).string())
                    .col(ColumnDef::new(Embeddings::Vector).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Embeddings::Table, Embeddings::FrameId)
                            .to(Frames::Table, Frames::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Embeddings::Table, Embeddings::ObjectId)
                            .to(Objects::Table, Objects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_embeddings_entity_type")
                    .table(Embeddings::Table)
                    .col(Embeddings::EntityType)
                    .to_owned(),
            )
            .await?;

        // Vectorized periods
        manager
            .create_table(
                Table::create()
                    .table(VectorizedPeriods::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(VectorizedPeriods::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(VectorizedPeriods::SourceId).string().not_null())
                    .col(ColumnDef::new(VectorizedPeriods::StartAt).string().not_null())
                    .col(ColumnDef::new(VectorizedPeriods::EndAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vectorized_periods_tuple")
                    .table(VectorizedPeriods::Table)
                    .col(VectorizedPeriods::SourceId)
                    .col(VectorizedPeriods::StartAt)
                    .col(VectorizedPeriods::EndAt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Jobs
        manager
            .create_table(
                Table::create()
                    .table(VectorizationJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(VectorizationJobs::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(VectorizationJobs::SourceId).string().not_null())
                    .col(ColumnDef::new(VectorizationJobs::Ranges).text().not_null())
                    .col(ColumnDef::new(VectorizationJobs::Status).string().not_null())
                    .col(ColumnDef::new(VectorizationJobs::Progress).double().not_null().default(0.0))
                    .col(ColumnDef::new(VectorizationJobs::Error).string())
                    .col(ColumnDef::new(VectorizationJobs::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(VectorizationJobs::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SearchJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SearchJobs::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(SearchJobs::Title).string().not_null())
                    .col(ColumnDef::new(SearchJobs::TextQuery).string().not_null())
                    .col(ColumnDef::new(SearchJobs::SourceId).string().not_null())
                    .col(ColumnDef::new(SearchJobs::StartAt).string().not_null())
                    .col(ColumnDef::new(SearchJobs::EndAt).string().not_null())
                    .col(ColumnDef::new(SearchJobs::Progress).double().not_null().default(0.0))
                    .col(ColumnDef::new(SearchJobs::Status).string().not_null())
                    .col(ColumnDef::new(SearchJobs::Error).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SearchJobResults::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SearchJobResults::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(SearchJobResults::JobId).string().not_null())
                    .col(ColumnDef::new(SearchJobResults::FrameId).string().not_null())
                    .col(ColumnDef::new(SearchJobResults::ObjectId).string())
                    .col(ColumnDef::new(SearchJobResults::Rank).integer().not_null())
                    .col(ColumnDef::new(SearchJobResults::FinalScore).double().not_null())
                    .col(ColumnDef::new(SearchJobResults::ClipScore).double().not_null())
                    .col(ColumnDef::new(SearchJobResults::ColorScore).double().not_null())
                    .col(ColumnDef::new(SearchJobResults::PlateScore).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(SearchJobResults::Table, SearchJobResults::JobId)
                            .to(SearchJobs::Table, SearchJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SearchJobResults::Table, SearchJobResults::FrameId)
                            .to(Frames::Table, Frames::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_search_job_results_job_id")
                    .table(SearchJobResults::Table)
                    .col(SearchJobResults::JobId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SearchJobEvents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SearchJobEvents::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(SearchJobEvents::JobId).string().not_null())
                    .col(ColumnDef::new(SearchJobEvents::TrackId).big_integer())
                    .col(ColumnDef::new(SearchJobEvents::ObjectId).string())
                    .col(ColumnDef::new(SearchJobEvents::Score).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(SearchJobEvents::Table, SearchJobEvents::JobId)
                            .to(SearchJobs::Table, SearchJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_search_job_events_job_id")
                    .table(SearchJobEvents::Table)
                    .col(SearchJobEvents::JobId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "search_job_events",
            "search_job_results",
            "search_jobs",
            "vectorization_jobs",
            "vectorized_periods",
            "embeddings",
            "person_attrs",
            "transport_attrs",
            "objects",
            "frames",
            "tasks",
            "sources",
        ] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Sources {
    Table,
    Id,
    SourceId,
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    Name,
    SourceId,
    StartAt,
    EndAt,
}

#[derive(DeriveIden)]
enum Frames {
    Table,
    Id,
    SourceId,
    TimestampSec,
    At,
}

#[derive(DeriveIden)]
enum Objects {
    Table,
    Id,
    FrameId,
    Type,
    BboxX,
    BboxY,
    BboxWidth,
    BboxHeight,
    TrackId,
}

#[derive(DeriveIden)]
enum TransportAttrs {
    Table,
    Id,
    ObjectId,
    ColorHsv,
    LicensePlate,
}

#[derive(DeriveIden)]
enum PersonAttrs {
    Table,
    Id,
    ObjectId,
    UpperColorHsv,
    LowerColorHsv,
}

#[derive(DeriveIden)]
enum Embeddings {
    Table,
    Id,
    EntityType,
    FrameId,
    ObjectId,
    Vector,
}

#[derive(DeriveIden)]
enum VectorizedPeriods {
    Table,
    Id,
    SourceId,
    StartAt,
    EndAt,
}

#[derive(DeriveIden)]
enum VectorizationJobs {
    Table,
    Id,
    SourceId,
    Ranges,
    Status,
    Progress,
    Error,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SearchJobs {
    Table,
    Id,
    Title,
    TextQuery,
    SourceId,
    StartAt,
    EndAt,
    Progress,
    Status,
    Error,
}

#[derive(DeriveIden)]
enum SearchJobResults {
    Table,
    Id,
    JobId,
    FrameId,
    ObjectId,
    Rank,
    FinalScore,
    ClipScore,
    ColorScore,
    PlateScore,
}

#[derive(DeriveIden)]
enum SearchJobEvents {
    Table,
    Id,
    JobId,
    TrackId,
    ObjectId,
    Score,
}
