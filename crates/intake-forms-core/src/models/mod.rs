//! Domain models for the questionnaire engine.

mod consultation;
mod question;
mod template;

pub use consultation::*;
pub use question::*;
pub use template::*;

pub(crate) use template::value_to_key;
