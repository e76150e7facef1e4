//! Data models for the Spotmark service

pub mod guestbook;
pub mod login_attempt;
pub mod memo;
pub mod place;

pub use guestbook::{CreateGuestbookMessageInput, GuestbookMessage};
pub use login_attempt::{truncate_user_agent, LoginAttempt};
pub use memo::{CreateMemoInput, Memo, Rating, UpdateMemoInput};
pub use place::{CreatePlaceInput, Place, PlaceType, UpdatePlaceInput};
