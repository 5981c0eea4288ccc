pub mod routes;

// Re-export route handlers for convenience
pub use routes::health;
pub use routes::state;
pub use routes::status;
pub use routes::videos;
