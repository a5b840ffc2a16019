pub mod dto;
pub mod handlers;
pub mod locks;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use handlers::router;
pub use locks::SessionLocks;
