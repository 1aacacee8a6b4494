use crate::core::helpers::{
    generate_id, generate_user_id, hash_password, now_iso, EVENT_ID_LENGTH, TICKET_ID_LENGTH,
};
use crate::core::resource::{self, Document};
use crate::core::store::{DocumentStore, Filter, Update};
use crate::models::{Activity, Event, Media, Merch, Place, Ticket, User};

/// Unique indexes on every domain id field, plus usernames.
pub async fn ensure_indexes(store: &dyn DocumentStore) -> anyhow::Result<()> {
    let keys = [
        (User::COLLECTION, User::ID_FIELD),
        (User::COLLECTION, "username"),
        (Event::COLLECTION, Event::ID_FIELD),
        (Place::COLLECTION, Place::ID_FIELD),
        (Ticket::COLLECTION, Ticket::ID_FIELD),
        (Merch::COLLECTION, Merch::ID_FIELD),
        (Media::COLLECTION, Media::ID_FIELD),
        (Activity::COLLECTION, Activity::ID_FIELD),
    ];

    for (collection, field) in keys {
        store.ensure_unique(collection, field).await?;
    }

    Ok(())
}

async fn find_user(store: &dyn DocumentStore, username: &str) -> anyhow::Result<Option<User>> {
    Ok(resource::find_one(store, &Filter::new().eq("username", username)).await?)
}

async fn demo_user(store: &dyn DocumentStore, username: &str, bio: &str) -> anyhow::Result<User> {
    if let Some(user) = find_user(store, username).await? {
        return Ok(user);
    }

    let now = now_iso();
    let user = User {
        user_id: generate_user_id(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: hash_password(username)?,
        role: "user".to_string(),
        bio: bio.to_string(),
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
        ..Default::default()
    };

    resource::insert(store, &user).await?;
    log::info!("Seeded demo user {}", username);
    Ok(user)
}

/// Creates the demo users, an event owned by `alice` with one ticket type,
/// and `test` following `bob`. Safe to run on every start.
pub async fn init_demo_data(store: &dyn DocumentStore) -> anyhow::Result<()> {
    let test = demo_user(store, "test", "Test user bio").await?;
    let alice = demo_user(store, "alice", "Hello, I'm Alice!").await?;
    let bob = demo_user(store, "bob", "Bob's corner of the internet").await?;

    let owned_by_alice = Filter::new().eq("creatorid", alice.user_id.as_str());
    if resource::find_one::<Event>(store, &owned_by_alice).await?.is_none() {
        let now = now_iso();
        let event = Event {
            event_id: generate_id(EVENT_ID_LENGTH),
            title: "Opening Night".to_string(),
            description: "Live music to open the season.".to_string(),
            location: "Main Hall".to_string(),
            creator_id: alice.user_id.clone(),
            organizer_name: "Alice".to_string(),
            category: "music".to_string(),
            status: "scheduled".to_string(),
            created_at: now.clone(),
            updated_at: now,
            ..Default::default()
        };
        resource::insert(store, &event).await?;

        let ticket = Ticket {
            ticket_id: generate_id(TICKET_ID_LENGTH),
            event_id: event.event_id.clone(),
            name: "General admission".to_string(),
            price: 15.0,
            quantity: 100,
        };
        resource::insert(store, &ticket).await?;
        log::info!("Seeded demo event {}", event.event_id);
    }

    store
        .update_one(
            User::COLLECTION,
            &User::by_id(&test.user_id),
            &Update::new().add_to_set("follows", bob.user_id.as_str()),
        )
        .await?;
    store
        .update_one(
            User::COLLECTION,
            &User::by_id(&bob.user_id),
            &Update::new().add_to_set("followers", test.user_id.as_str()),
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    #[actix_web::test]
    async fn seeding_twice_creates_nothing_new() {
        let store = MemoryStore::new();
        ensure_indexes(&store).await.unwrap();

        init_demo_data(&store).await.unwrap();
        init_demo_data(&store).await.unwrap();

        let users = store.find(User::COLLECTION, &Filter::new()).await.unwrap();
        let events = store.find(Event::COLLECTION, &Filter::new()).await.unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(events.len(), 1);

        let test = find_user(&store, "test").await.unwrap().unwrap();
        let bob = find_user(&store, "bob").await.unwrap().unwrap();
        assert_eq!(test.follows, vec![bob.user_id.clone()]);
        assert_eq!(bob.followers, vec![test.user_id]);
    }
}
