use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub board_id: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub assignee_id: Option<String>,
    pub created_at: Option<Date>,
    #[sea_orm(column_type = "Double", nullable)]
    pub actual_time: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub sprint_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub project_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub direction: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub state_category: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::board::Entity",
        from = "Column::BoardId",
        to = "super::board::Column::Id",
        on_delete = "Cascade"
    )]
    Board,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssigneeId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Assignee,
}

impl Related<super::board::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Board.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
