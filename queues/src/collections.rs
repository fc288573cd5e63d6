mod build_error;
mod queue_base;
mod queue_error;
mod queue_size;

pub use self::{build_error::*, queue_base::*, queue_error::*, queue_size::*};
