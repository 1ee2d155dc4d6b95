pub mod gateway_registry;
pub mod payment;
