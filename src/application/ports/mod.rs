pub mod mobile_money;
pub mod plan_catalog;
pub mod settlement;
