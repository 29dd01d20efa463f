use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_roles::Entity")]
    AccountRoles,
    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,
}

impl Related<super::account_roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountRoles.def()
    }
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::roles::Entity> for Entity {
    fn to() -> RelationDef {
        super::account_roles::Relation::Roles.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::account_roles::Relation::Accounts.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
