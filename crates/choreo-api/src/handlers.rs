//! Request handlers.

pub mod characters;
pub mod health;
pub mod learning;
pub mod media;
pub mod nlp;
pub mod status;
pub mod storyboard;

pub use characters::*;
pub use health::*;
pub use learning::*;
pub use media::*;
pub use nlp::*;
pub use status::*;
pub use storyboard::*;
