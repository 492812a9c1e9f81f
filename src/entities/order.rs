use sea_orm::entity::prelude::*;

/// A past purchase or rental. Orders are written elsewhere; this service only
/// reads them to build recommendations.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_movie::Entity")]
    OrderMovie,
}

impl Related<super::movie::Entity> for Entity {
    fn to() -> RelationDef {
        super::order_movie::Relation::Movie.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::order_movie::Relation::Order.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
