pub mod activity;
pub mod commerce;
pub mod event;
pub mod media;
pub mod place;
pub mod user;

pub use activity::Activity;
pub use commerce::{Merch, Ticket};
pub use event::{Event, Review};
pub use media::{Media, MediaKind};
pub use place::{Category, Coordinates, Place, PlaceStatus};
pub use user::{Preferences, Profile, PublicProfile, User, UserSummary};
