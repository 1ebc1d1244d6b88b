pub mod user;

pub use user::{hash_password, verify_password, UserService};
