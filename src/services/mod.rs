//! Services layer - Business logic
//!
//! This module contains the business logic for the Spotmark service:
//! places, memos, the guestbook with its write throttle and daily quotas,
//! and admin authentication with login lockout.

pub mod auth;
pub mod guestbook;
pub mod memo;
pub mod place;
pub mod quota;
pub mod token;

pub use auth::{AttemptState, AuthService, AuthServiceError};
pub use guestbook::{GuestbookMessageView, GuestbookService, GuestbookServiceError};
pub use memo::{MemoService, MemoServiceError};
pub use place::{PlaceMarker, PlaceService, PlaceServiceError};
pub use quota::{day_start_utc, QuotaChecker, QuotaDecision, QuotaScope};
pub use token::{TokenError, TokenIssuer};
