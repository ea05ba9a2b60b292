// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod directory;
pub mod mailer;
pub mod push;
pub mod search;
pub mod tokens;

pub use directory::DirectoryService;
pub use mailer::Mailer;
pub use push::PushService;
pub use tokens::{TokenPair, TokenService};
