//! Repository layer
//!
//! Each repository exposes a trait with an implementation that dispatches to
//! SQLite or MySQL specific queries based on the active pool driver.

pub mod guestbook;
pub mod login_attempt;
pub mod memo;
pub mod place;

pub use guestbook::{GuestbookRepository, SqlxGuestbookRepository};
pub use login_attempt::{LoginAttemptRepository, SqlxLoginAttemptRepository, NewLoginAttempt};
pub use memo::{MemoRepository, SqlxMemoRepository};
pub use place::{MapBounds, PlaceRepository, SqlxPlaceRepository};
