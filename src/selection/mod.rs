mod record;
mod selector;

pub use record::*;
pub use selector::*;
