//! Google Calendar v3 backend for icsync.
//!
//! [`GoogleCalendar`] implements the `RemoteCalendar` trait from
//! `icsync-core` on top of the plain REST API. Mutations go through the
//! multipart batch endpoint so a whole sync round trips in a handful of
//! HTTP calls; [`Session`] keeps the OAuth tokens on disk and refreshes
//! them when they expire.

pub mod batch;
pub mod client;
pub mod session;

pub use client::{CalendarEntry, GoogleCalendar};
pub use session::Session;
