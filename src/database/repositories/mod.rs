//! Database repositories module
//! 
//! This module contains the PostgreSQL repository implementations for data access

pub mod event;
pub mod notification;
pub mod registration;
pub mod user;

// Re-export repositories
pub use event::EventRepository;
pub use notification::NotificationRepository;
pub use registration::RegistrationRepository;
pub use user::UserRepository;
