//! Watermark diffing.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::feed::FeedEntry;

/// Select the entries that are new relative to `watermark`.
///
/// An entry is new when its effective timestamp (see
/// [`FeedEntry::effective_timestamp`]) is at or after the watermark. The
/// boundary is inclusive. Entries without any usable timestamp are never
/// new. Feed order is preserved and nothing is deduplicated.
pub fn new_items_since<'a>(
    entries: &'a [FeedEntry],
    watermark: &DateTime<Tz>,
    tz: &Tz,
) -> Vec<&'a FeedEntry> {
    entries
        .iter()
        .filter(|entry| {
            entry
                .effective_timestamp(tz)
                .is_some_and(|ts| ts >= *watermark)
        })
        .collect()
}
