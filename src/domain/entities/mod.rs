pub mod caller;
pub mod feature_type;
pub mod mobile_money_provider;
pub mod payment;
pub mod payment_status;
pub mod plan;
pub mod subscription_status;
