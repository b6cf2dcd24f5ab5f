mod ids;
mod media;

pub use ids::ItemId;
pub use media::{MediaItem, MediaType};
