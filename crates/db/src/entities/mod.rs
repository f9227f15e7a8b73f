//! Database entities.

pub mod comment;
pub mod follow;
pub mod like;
pub mod notification;
pub mod post;
pub mod profile;

pub use comment::Entity as Comment;
pub use follow::Entity as Follow;
pub use like::Entity as Like;
pub use notification::Entity as Notification;
pub use post::Entity as Post;
pub use profile::Entity as Profile;
