pub mod activity;
pub mod event;
pub mod event_attendee;
pub mod friendship;
pub mod friendship_invite;
pub mod place;
pub mod profile;
pub mod user;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::activity::{self, Entity as Activity};
    pub use super::event::{self, Entity as Event};
    pub use super::event_attendee::{self, Entity as EventAttendee};
    pub use super::friendship::{self, Entity as Friendship};
    pub use super::friendship_invite::{self, Entity as FriendshipInvite};
    pub use super::place::{self, Entity as Place};
    pub use super::profile::{self, Entity as Profile};
    pub use super::user::{self, Entity as User};
}
