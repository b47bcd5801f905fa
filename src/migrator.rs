use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_stock_locations_table::Migration),
            Box::new(m20240101_000002_create_stock_requests_table::Migration),
            Box::new(m20240101_000003_create_stock_request_items_table::Migration),
            Box::new(m20240101_000004_create_handled_messages_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_stock_locations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_stock_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLocations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLocations::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLocations::UserId).uuid().not_null())
                        .col(ColumnDef::new(StockLocations::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockLocations::OfferId).uuid().null())
                        .col(ColumnDef::new(StockLocations::VariationId).uuid().null())
                        .col(ColumnDef::new(StockLocations::ModificationId).uuid().null())
                        .col(ColumnDef::new(StockLocations::Storage).string().null())
                        .col(
                            ColumnDef::new(StockLocations::Total)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockLocations::Reserve)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockLocations::Priority)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockLocations::Approve)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(StockLocations::Comment).string().null())
                        .col(ColumnDef::new(StockLocations::Price).decimal().null())
                        .col(
                            ColumnDef::new(StockLocations::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLocations::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_locations_placement")
                        .table(StockLocations::Table)
                        .col(StockLocations::WarehouseId)
                        .col(StockLocations::ProductId)
                        .col(StockLocations::OfferId)
                        .col(StockLocations::VariationId)
                        .col(StockLocations::ModificationId)
                        .col(StockLocations::Storage)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_locations_variant")
                        .table(StockLocations::Table)
                        .col(StockLocations::WarehouseId)
                        .col(StockLocations::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLocations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockLocations {
        Table,
        Id,
        WarehouseId,
        UserId,
        ProductId,
        OfferId,
        VariationId,
        ModificationId,
        Storage,
        Total,
        Reserve,
        Priority,
        Approve,
        Comment,
        Price,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_stock_requests_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRequests::Number).string().not_null())
                        .col(ColumnDef::new(StockRequests::Status).string().not_null())
                        .col(
                            ColumnDef::new(StockRequests::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRequests::ResponsibleId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRequests::OrderId).uuid().null())
                        .col(
                            ColumnDef::new(StockRequests::MoveToWarehouseId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(StockRequests::MoveOrderId).uuid().null())
                        .col(ColumnDef::new(StockRequests::Comment).string().null())
                        .col(
                            ColumnDef::new(StockRequests::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRequests::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_requests_number")
                        .table(StockRequests::Table)
                        .col(StockRequests::Number)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_requests_order_id")
                        .table(StockRequests::Table)
                        .col(StockRequests::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockRequests {
        Table,
        Id,
        Number,
        Status,
        WarehouseId,
        ResponsibleId,
        OrderId,
        MoveToWarehouseId,
        MoveOrderId,
        Comment,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_stock_request_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_stock_request_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockRequestItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockRequestItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRequestItems::RequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRequestItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRequestItems::OfferId).uuid().null())
                        .col(ColumnDef::new(StockRequestItems::VariationId).uuid().null())
                        .col(
                            ColumnDef::new(StockRequestItems::ModificationId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockRequestItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRequestItems::Storage).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_request_items_request")
                                .from(StockRequestItems::Table, StockRequestItems::RequestId)
                                .to(
                                    super::m20240101_000002_create_stock_requests_table::StockRequests::Table,
                                    super::m20240101_000002_create_stock_requests_table::StockRequests::Id,
                                )
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_request_items_request_id")
                        .table(StockRequestItems::Table)
                        .col(StockRequestItems::RequestId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockRequestItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockRequestItems {
        Table,
        Id,
        RequestId,
        ProductId,
        OfferId,
        VariationId,
        ModificationId,
        Quantity,
        Storage,
    }
}

mod m20240101_000004_create_handled_messages_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_handled_messages_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(HandledMessages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(HandledMessages::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(HandledMessages::Namespace)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(HandledMessages::DedupKey)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(HandledMessages::Executed)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(HandledMessages::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_handled_messages_identity")
                        .table(HandledMessages::Table)
                        .col(HandledMessages::Namespace)
                        .col(HandledMessages::DedupKey)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(HandledMessages::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum HandledMessages {
        Table,
        Id,
        Namespace,
        DedupKey,
        Executed,
        CreatedAt,
    }
}
