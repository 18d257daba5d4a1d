use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub image_ref: String,
    pub author_id: i32,
    #[sea_orm(column_type = "String(StringLen::N(50))")]
    pub author_name: String,
    #[sea_orm(column_type = "String(StringLen::N(20))")]
    pub status: String,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<DateTime>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::AuthorId",
        to = "super::profile::Column::Id"
    )]
    Author,
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::ResolvedBy",
        to = "super::profile::Column::Id"
    )]
    Resolver,
}

impl ActiveModelBehavior for ActiveModel {}
