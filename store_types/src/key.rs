use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A RecordKey addresses one logical record in the backing store: the name of
/// the record family it belongs to and its position within that family.
#[derive(Debug, PartialEq, Default, Serialize, Deserialize, Ord, PartialOrd, Eq, Hash, Clone)]
pub struct RecordKey {
    pub prefix: String,
    pub pos: u64,
}

impl RecordKey {
    pub fn new<T: Into<String>>(prefix: T, pos: u64) -> Self {
        Self {
            prefix: prefix.into(),
            pos,
        }
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.prefix, self.pos)
    }
}
