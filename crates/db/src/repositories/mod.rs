//! Database repositories.

pub mod comment;
pub mod follow;
pub mod like;
pub mod notification;
pub mod post;
pub mod profile;

pub use comment::CommentRepository;
pub use follow::FollowRepository;
pub use like::LikeRepository;
pub use notification::NotificationRepository;
pub use post::PostRepository;
pub use profile::ProfileRepository;
