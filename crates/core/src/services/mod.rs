//! Business logic services.

#![allow(missing_docs)]

pub mod admin;
pub mod comment;
pub mod dispatch;
pub mod following;
pub mod identity;
pub mod like;
pub mod notification;
pub mod post;
pub mod profile;
pub mod realtime;
pub mod session;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::{AdminPostView, AdminService, AdminStats, AdminUserView};
pub use comment::{CommentService, CommentView, CreateCommentInput};
pub use dispatch::{DispatchOutcome, NotificationDispatcher, NotificationJob, run_notification_worker};
pub use following::{FollowService, FollowView};
pub use identity::{AuthSession, GoTrueIdentity, IdentityProvider, IdentityUser, SignUpOutcome};
pub use like::{LikeService, LikeState};
pub use notification::{NotificationService, NotificationView};
pub use post::{CreatePostInput, PostService, PostView, UpdatePostInput};
pub use profile::{
    NO_USERNAME, ProfileService, ProfileStats, ProfileView, UNKNOWN_USER, UpdateProfileInput,
    display_username,
};
pub use realtime::{ChangeEvent, ChangeFeed, CounterUpdate, UnreadCounter};
pub use session::{AuthEvent, SessionContext, SessionService};
pub use upload::{ImageFormat, UploadService};
