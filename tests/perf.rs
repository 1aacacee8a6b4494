use std::time::Instant;

use serde_json::{json, Value};

const NUM_USERS: usize = 50;
const EVENTS_PER_USER: usize = 2;
const TICKET_STOCK: usize = 40;
const BUYERS: usize = 100;

fn base_url() -> String {
    std::env::var("MARQUEE_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:4000".to_string())
}

async fn signup(client: &reqwest::Client, base: &str, username: &str) -> Option<String> {
    let creds = json!({ "username": username, "password": "password123" });

    let created = client.post(format!("{}/api/register", base)).json(&creds).send().await.ok()?;
    if created.status() != 201 {
        return None;
    }

    let login = client.post(format!("{}/api/login", base)).json(&creds).send().await.ok()?;
    let body: Value = login.json().await.ok()?;
    body["token"].as_str().map(str::to_string)
}

/// Runs against a live server started with a raised `MARQUEE_RATE_LIMIT_PER_MINUTE`:
/// `MARQUEE_BASE_URL=http://host:port cargo test --test perf -- --ignored`
#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn perf_test_events_and_ticket_rush() {
    let base = base_url();
    let client = reqwest::Client::new();
    let start = Instant::now();

    println!("\n=== Performance Test ===");
    println!("Creating {} users with {} events each...", NUM_USERS, EVENTS_PER_USER);

    // Users
    let user_start = Instant::now();
    let mut tokens = Vec::new();
    for i in 0..NUM_USERS {
        let username = format!("perf_{}_{}", i, &uuid::Uuid::new_v4().simple().to_string()[..8]);
        if let Some(token) = signup(&client, &base, &username).await {
            tokens.push(token);
        }
    }
    let user_time = user_start.elapsed();
    println!(
        "User creation done: {} users in {:.2}s ({:.2} users/sec)",
        tokens.len(),
        user_time.as_secs_f64(),
        tokens.len() as f64 / user_time.as_secs_f64()
    );
    assert!(!tokens.is_empty(), "No users could be created against {}", base);

    // Events
    let event_start = Instant::now();
    let mut event_ids = Vec::new();
    for token in &tokens {
        for n in 0..EVENTS_PER_USER {
            let resp = client
                .post(format!("{}/api/event", base))
                .bearer_auth(token)
                .json(&json!({ "title": format!("Perf event {}", n), "location": "Load Hall" }))
                .send()
                .await;
            if let Ok(resp) = resp {
                if let Ok(event) = resp.json::<Value>().await {
                    if let Some(id) = event["eventid"].as_str() {
                        event_ids.push(id.to_string());
                    }
                }
            }
        }
    }
    let event_time = event_start.elapsed();
    println!(
        "Event creation done: {} events in {:.2}s ({:.2} events/sec)",
        event_ids.len(),
        event_time.as_secs_f64(),
        event_ids.len() as f64 / event_time.as_secs_f64()
    );

    // Listing
    let list_start = Instant::now();
    let listed: Value = client
        .get(format!("{}/api/events", base))
        .send()
        .await
        .expect("Failed to list events")
        .json()
        .await
        .expect("Invalid event list");
    println!(
        "Listed {} events in {:.2}ms",
        listed.as_array().map(Vec::len).unwrap_or_default(),
        list_start.elapsed().as_secs_f64() * 1000.0
    );

    // Ticket rush: more buyers than stock, exactly TICKET_STOCK may succeed
    let owner = &tokens[0];
    let event_id = &event_ids[0];
    let ticket: Value = client
        .post(format!("{}/api/event/{}/ticket", base, event_id))
        .bearer_auth(owner)
        .json(&json!({ "name": "Rush", "price": 5, "quantity": TICKET_STOCK }))
        .send()
        .await
        .expect("Failed to create ticket")
        .json()
        .await
        .expect("Invalid ticket");
    let buy_url = format!(
        "{}/api/event/{}/ticket/{}",
        base,
        event_id,
        ticket["ticketid"].as_str().expect("ticketid missing")
    );

    let rush_start = Instant::now();
    let mut handles = Vec::with_capacity(BUYERS);
    for i in 0..BUYERS {
        let client = client.clone();
        let url = buy_url.clone();
        let token = tokens[i % tokens.len()].clone();
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "quantity": 1 }))
                .send()
                .await
                .map(|resp| resp.status().is_success())
                .unwrap_or(false)
        }));
    }

    let mut sold = 0;
    for handle in handles {
        if handle.await.unwrap_or(false) {
            sold += 1;
        }
    }
    println!(
        "Ticket rush done: {} of {} buyers succeeded in {:.2}s",
        sold,
        BUYERS,
        rush_start.elapsed().as_secs_f64()
    );
    assert_eq!(sold, TICKET_STOCK, "Oversold or undersold tickets");

    println!("Total time: {:.2}s", start.elapsed().as_secs_f64());
}
