//! Model builders shared by the service tests.

use std::sync::Arc;

use chrono::Utc;
use orbit_db::entities::{
    comment, follow, like, notification, notification::NotificationType, post,
    post::PostCategory, profile,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

use crate::services::identity::IdentityUser;
use crate::services::session::SessionContext;

pub fn empty_db() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

pub const fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

pub fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
    maplit::btreemap! {
        "num_items" => sea_orm::Value::BigInt(Some(n))
    }
}

pub fn make_profile(id: &str, username: Option<&str>) -> profile::Model {
    profile::Model {
        id: id.to_string(),
        username: username.map(ToString::to_string),
        bio: String::new(),
        location: String::new(),
        avatar_url: String::new(),
        is_admin: false,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

pub fn make_admin_profile(id: &str) -> profile::Model {
    profile::Model {
        is_admin: true,
        ..make_profile(id, Some(id))
    }
}

pub fn make_session(profile: profile::Model) -> SessionContext {
    SessionContext {
        user: IdentityUser {
            id: profile.id.clone(),
            email: Some(format!("{}@example.com", profile.id)),
        },
        profile,
        access_token: "token".to_string(),
    }
}

pub fn make_post(id: &str, author_id: &str, content: &str) -> post::Model {
    post::Model {
        id: id.to_string(),
        author_id: author_id.to_string(),
        content: content.to_string(),
        image_url: None,
        category: PostCategory::General,
        like_count: 0,
        comment_count: 0,
        is_active: true,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

pub fn make_comment(id: &str, post_id: &str, author_id: &str, content: &str) -> comment::Model {
    comment::Model {
        id: id.to_string(),
        post_id: post_id.to_string(),
        author_id: author_id.to_string(),
        content: content.to_string(),
        is_active: true,
        created_at: Utc::now().into(),
    }
}

pub fn make_follow(follower_id: &str, following_id: &str) -> follow::Model {
    follow::Model {
        follower_id: follower_id.to_string(),
        following_id: following_id.to_string(),
        created_at: Utc::now().into(),
    }
}

pub fn make_like(post_id: &str, user_id: &str) -> like::Model {
    like::Model {
        post_id: post_id.to_string(),
        user_id: user_id.to_string(),
        created_at: Utc::now().into(),
    }
}

pub fn make_notification(
    id: &str,
    recipient_id: &str,
    sender_id: &str,
    notification_type: NotificationType,
    post_id: Option<&str>,
) -> notification::Model {
    notification::Model {
        id: id.to_string(),
        recipient_id: recipient_id.to_string(),
        sender_id: sender_id.to_string(),
        notification_type,
        post_id: post_id.map(ToString::to_string),
        message: String::new(),
        is_read: false,
        created_at: Utc::now().into(),
    }
}
