pub mod profile;
pub mod session;

// Re-export handler functions for use in routing
pub use profile::get as profile_get;
pub use profile::put as profile_put;
pub use session::logout;
