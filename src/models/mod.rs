pub mod user;
pub mod alert;
pub mod watchlist;

pub use user::{CurrentUser, User};
pub use alert::{Alert, AlertType, Frequency};
pub use watchlist::WatchlistItem;
