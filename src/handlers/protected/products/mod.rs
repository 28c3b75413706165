pub mod create;
pub mod delete;

// Re-export handler functions for use in routing
pub use create::create;
pub use delete::delete;
