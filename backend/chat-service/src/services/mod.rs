pub mod channel_service;
pub mod favorite_service;
pub mod message_service;
