#![allow(unused_imports)]

pub use std::sync::{Arc, Mutex};

pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};

pub use crate::error::{Error, Result};

pub use tracing::{debug, error, info, trace, warn};
