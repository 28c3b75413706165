pub mod product;
pub mod user;

pub use product::{Condition, Product};
pub use user::{User, UserView};
