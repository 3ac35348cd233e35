//! 领域实体

mod dca_plan;
mod dca_step;

pub use dca_plan::{DcaPlan, NewDcaPlan};
pub use dca_step::{DcaStep, NewDcaStep};
