//! Core business logic for orbit.
//!
//! Services sit between the HTTP layer and the repositories. Each one owns a
//! slice of the domain: sessions and profiles, the follow graph, posts with
//! their likes and comments, notifications and the admin views.

pub mod services;

pub use services::*;
