// server/src/services/mod.rs

pub mod auth_service;
pub mod discount_engine;
pub mod email;
pub mod message_hub;
pub mod payment;
pub mod reaper;
pub mod uploads;
