//! Identifier generation

use uuid::Uuid;

/// Short random identifier with a type prefix, e.g. `brc_1f2e3d4c`
pub fn short_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &simple[..8])
}
