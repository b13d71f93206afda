pub mod accounts;
pub mod conversations;
pub mod matching;
pub mod moderation;
pub mod profiles;
