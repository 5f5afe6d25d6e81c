use derive_new::new;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub use resource_type::*;
pub use timestamp::*;
pub use view::*;

mod resource_type;
mod timestamp;
mod view;
