//! Pagination summary for a result page.

use serde::{Deserialize, Serialize};

/// Position of a result page within the full matching set.
///
/// The default value is the empty form returned when nothing matched; zero
/// fields are omitted when serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub current_page: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub first_page: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_page: u32,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub total_records: u64,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Derives the pagination summary from the total match count.
pub fn calculate_metadata(total_records: u64, page: u32, page_size: u32) -> Metadata {
    if total_records == 0 || page_size == 0 {
        return Metadata::default();
    }

    let last_page = total_records.div_ceil(u64::from(page_size));
    Metadata {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
        total_records,
    }
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}
