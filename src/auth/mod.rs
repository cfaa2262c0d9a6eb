pub mod helpers;
pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::RequireUser;
pub use token::{TokenGenerator, parse_token};
