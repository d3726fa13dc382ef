//! Pure decision logic: redirect following and error classification.
//!
//! Nothing here touches the network or the filesystem.

mod classify;
mod redirect;

pub use classify::ErrorClassifier;
pub use redirect::{RedirectPolicy, is_redirect};
