//! Fixtures shared by the unit tests.

use crate::models::{NewMessage, NewProfile, NewUser, Message, Profile, User};
use crate::store::Store;

pub fn seed_user(store: &dyn Store, username: &str) -> User {
    store
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "not-a-real-hash".to_string(),
        })
        .expect("seed user")
}

pub fn profile_for(user_id: i32, name: &str) -> NewProfile {
    NewProfile {
        user_id,
        name: name.to_string(),
        age: 29,
        location: "Manchester".to_string(),
        bio: format!("Hi, I'm {name}"),
        interests: vec!["board games".to_string()],
        disability_type: Some("visual".to_string()),
        accessibility_needs: vec!["screen reader".to_string()],
        communication_preferences: vec!["text".to_string()],
        photos: vec![],
        is_active: true,
    }
}

pub fn seed_profile(store: &dyn Store, user_id: i32, name: &str) -> Profile {
    store.create_profile(profile_for(user_id, name)).expect("seed profile")
}

/// A user together with a profile named after them.
pub fn seed_member(store: &dyn Store, username: &str) -> User {
    let user = seed_user(store, username);
    seed_profile(store, user.id, username);
    user
}

pub fn seed_message(store: &dyn Store, sender_id: i32, receiver_id: i32, content: &str, is_read: bool) -> Message {
    store
        .create_message(NewMessage {
            sender_id,
            receiver_id,
            content: content.to_string(),
            message_type: "text".to_string(),
            is_read,
        })
        .expect("seed message")
}
