pub mod extract;
pub mod health;
pub mod likes;
pub mod matches;
pub mod messages;
pub mod moderation;
pub mod profiles;
pub mod users;
