#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

//! Image content moderation.
//!
//! [ImageClassifier] rates an image, [ModerationPolicy] turns the rating
//! into a decision and [ImageModerator] runs both behind a single
//! `check_image` call.

pub mod auth;
pub mod classifier;
pub mod moderator;
pub mod policy;
pub mod vision;

pub use classifier::{ClassifierError, ImageClassifier};
pub use moderator::{ImageModerator, ModerationError};
pub use policy::{ModerationPolicy, ThresholdModerationPolicy};
pub use vision::GoogleVisionClassifier;
