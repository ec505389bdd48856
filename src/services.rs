pub mod auth;
pub use auth::AuthService;
pub mod customer_service;
pub use customer_service::CustomerService;
pub mod projector;
pub use projector::IndexProjector;
pub mod reminder;
pub use reminder::ReminderService;
