//! HTTP request handlers.

pub mod health;
pub mod ingress;

pub use health::{health, ready};
pub use ingress::track_video;
