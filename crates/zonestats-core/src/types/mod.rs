mod name;
mod record;
mod source;

pub use name::*;
pub use record::*;
pub use source::*;
