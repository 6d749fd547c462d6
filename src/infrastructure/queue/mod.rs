pub mod delivery;
pub mod rabbitmq;
