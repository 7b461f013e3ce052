pub mod alert;
pub mod pairs;
pub mod user;

pub use alert::{Alert, Direction, Price};
pub use pairs::PairTable;
pub use user::CurrentUser;
