//! Shuffle-keep-current
//!
//! Randomizes queue order with Fisher-Yates while pinning the current item at
//! the front, so turning shuffle on never changes what is playing.

use cadence_core::{ItemId, MediaItem};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Shuffle `items`, moving the item at `current` to index 0
///
/// An out-of-range `current` pins nothing and shuffles everything.
pub fn shuffle_keep_current(items: Vec<MediaItem>, current: usize) -> Vec<MediaItem> {
    shuffle_keep_current_with(items, current, &mut thread_rng())
}

/// [`shuffle_keep_current`] with a caller-supplied RNG
pub fn shuffle_keep_current_with<R: Rng + ?Sized>(
    mut items: Vec<MediaItem>,
    current: usize,
    rng: &mut R,
) -> Vec<MediaItem> {
    if current >= items.len() {
        items.shuffle(rng);
        return items;
    }

    let pinned = items.remove(current);
    items.shuffle(rng);
    items.insert(0, pinned);
    items
}

/// Restore a pre-shuffle order and find the current item in it
///
/// Returns the original order with the index of `current_id`, or 0 if the
/// item is not in it.
pub fn restore_original(original: Vec<MediaItem>, current_id: Option<&ItemId>) -> (Vec<MediaItem>, usize) {
    let index = current_id
        .and_then(|id| original.iter().position(|item| &item.id == id))
        .unwrap_or(0);
    (original, index)
}
