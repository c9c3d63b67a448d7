#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! End-to-end runs of the JSON-lines protocol over a file-backed store.

use clap::Parser;
use latchkey_bridge::config::BridgeConfig;
use latchkey_bridge::serve;
use latchkey_bridge::state::BridgeState;
use serde_json::Value;
use tempfile::TempDir;

fn state_in(dir: &TempDir) -> BridgeState {
    let config = BridgeConfig::try_parse_from([
        "latchkey",
        "--data-dir",
        dir.path().to_str().unwrap(),
        "--store",
        "file",
        "--biometric",
        "none",
        "--auto-lock-interval-secs",
        "0",
    ])
    .unwrap();
    BridgeState::from_config(&config).unwrap()
}

async fn exchange(state: &BridgeState, requests: &[&str]) -> Vec<Value> {
    let input = requests.join("\n");
    let mut out = Vec::new();
    serve(state, input.as_bytes(), &mut out).await.unwrap();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn onboarding_to_locked_and_back() {
    let dir = TempDir::new().unwrap();
    let state = state_in(&dir);

    let replies = exchange(
        &state,
        &[
            r#"{"command":"getState"}"#,
            r#"{"command":"completeOnboarding"}"#,
            r#"{"command":"signIn","email":"vip@example.com","password":"vip123"}"#,
            r#"{"command":"setPin","pin":"2468"}"#,
            r#"{"command":"setLockScreen","enabled":true}"#,
            r#"{"command":"lockNow"}"#,
            r#"{"command":"unlockWithPin","pin":"1111"}"#,
            r#"{"command":"unlockWithPin","pin":"2468"}"#,
        ],
    )
    .await;

    assert_eq!(replies.len(), 8);
    assert!(replies.iter().all(|r| r["ok"] == true), "{replies:#?}");
    assert_eq!(replies[0]["data"]["phase"], "onboarding");
    assert_eq!(replies[1]["data"]["screen"], "signIn");
    assert_eq!(replies[2]["data"]["account"]["isVip"], true);
    assert_eq!(replies[4]["data"]["lockScreen"], true);
    assert_eq!(replies[5]["data"]["phase"], "locked");
    assert_eq!(replies[6]["data"]["outcome"]["result"], "rejected");
    assert_eq!(replies[7]["data"]["outcome"]["result"], "unlocked");
    assert_eq!(replies[7]["data"]["state"]["phase"], "unlocked");
}

#[tokio::test]
async fn lock_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let state = state_in(&dir);
        exchange(
            &state,
            &[
                r#"{"command":"completeOnboarding"}"#,
                r#"{"command":"signIn","email":"user@example.com","password":"secret1"}"#,
                r#"{"command":"setPin","pin":"2468"}"#,
                r#"{"command":"setLockScreen","enabled":true}"#,
                r#"{"command":"addNotification","title":"Hi","body":"Saved","type":"message"}"#,
                r#"{"command":"lockNow"}"#,
            ],
        )
        .await;
    }

    let state = state_in(&dir);
    let replies = exchange(
        &state,
        &[
            r#"{"command":"getState"}"#,
            r#"{"command":"signOut"}"#,
            r#"{"command":"listNotifications"}"#,
        ],
    )
    .await;
    assert_eq!(replies[0]["data"]["phase"], "locked");
    assert_eq!(replies[0]["data"]["screen"], "lockScreen");
    // Sign-out from the lock screen is allowed and drops the lock.
    assert_eq!(replies[1]["data"]["phase"], "signedOut");
    assert_eq!(replies[1]["data"]["lock"]["locked"], false);
    assert_eq!(replies[2]["data"]["unreadCount"], 1);
}

#[tokio::test]
async fn errors_are_structured_and_the_loop_continues() {
    let dir = TempDir::new().unwrap();
    let state = state_in(&dir);

    let replies = exchange(
        &state,
        &[
            "not json",
            "",
            r#"{"command":"selfDestruct"}"#,
            r#"{"command":"unlockWithPin","pin":"1234"}"#,
            r#"{"command":"getState"}"#,
        ],
    )
    .await;

    assert_eq!(replies.len(), 4, "blank lines get no reply");
    assert_eq!(replies[0]["ok"], false);
    assert_eq!(replies[0]["error"]["code"], "BAD_REQUEST");
    assert_eq!(replies[1]["error"]["code"], "BAD_REQUEST");
    assert_eq!(replies[2]["error"]["code"], "NOT_LOCKED");
    assert!(replies[2].get("data").is_none());
    assert_eq!(replies[3]["ok"], true);
}

#[tokio::test]
async fn sign_in_rate_limit_reports_remaining_ms() {
    let dir = TempDir::new().unwrap();
    let state = state_in(&dir);

    let mut requests = vec![r#"{"command":"completeOnboarding"}"#];
    let bad = r#"{"command":"signIn","email":"bad","password":"secret1"}"#;
    requests.extend(std::iter::repeat_n(bad, 6));

    let replies = exchange(&state, &requests).await;
    for reply in &replies[1..6] {
        assert_eq!(reply["error"]["code"], "VALIDATION");
    }
    let limited = &replies[6]["error"];
    assert_eq!(limited["code"], "RATE_LIMITED");
    assert!(limited["remainingMs"].as_u64().unwrap() > 0);
}
