pub use crate::{end_group, start_group};
pub use anyhow::{Context, Result, anyhow, bail};
pub use log::{debug, error, info, trace, warn};
