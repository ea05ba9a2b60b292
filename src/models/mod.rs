// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod key;
pub mod otp;
pub mod post;
pub mod route;
pub mod user;

pub use key::Key;
pub use otp::{OtpReason, OtpRecord};
pub use post::{Post, PostOwner, PostView, Transportation};
pub use route::RouteRecord;
pub use user::{Gender, Role, SanitizedUser, User, UserSettings, Visibility};
