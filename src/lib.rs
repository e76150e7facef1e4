//! Spotmark - a small location-bookmarking web service
//!
//! This library provides the core functionality for the Spotmark service:
//! places with geocoordinates, memos, map markers and a public guestbook,
//! guarded by an in-memory abuse-protection core.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
