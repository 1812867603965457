pub mod clock;
pub mod error;
pub mod record;
pub mod value;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, StoreError};
pub use record::{Record, RecordState};
pub use value::Value;

use std::collections::BTreeMap;

/// Named column values of a single row.
pub type Row = BTreeMap<String, Value>;
