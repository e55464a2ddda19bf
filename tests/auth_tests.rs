//! Registration, session and profile flows.

mod common;

use std::time::Duration;

use common::{DB, TestApp, USERS};
use dramatracker::domain::UserId;
use dramatracker::services::AuthError;
use dramatracker::store::{AccountApi, StoreError};

#[tokio::test]
async fn register_creates_user_document_and_signs_in() {
    let app = TestApp::signed_out();

    let user_id = app
        .state
        .auth
        .register("mei@example.com", "correct horse", "Mei Ling")
        .await
        .expect("register");

    let docs = app.store.documents(DB, USERS).await;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get_str("user_id"), Some(user_id.as_str()));
    assert_eq!(docs[0].get_str("email"), Some("mei@example.com"));
    assert_eq!(
        docs[0].get_str("avatar_url"),
        Some("https://ui-avatars.com/api/?name=Mei+Ling")
    );

    assert_eq!(
        app.state.auth.current_user_id().await.expect("current"),
        Some(user_id)
    );
}

#[tokio::test]
async fn register_replaces_existing_session() {
    let app = TestApp::signed_in();

    let user_id = app
        .state
        .auth
        .register("new@example.com", "password123", "New User")
        .await
        .expect("register");

    assert_ne!(user_id, UserId::new("user-1"));
    assert_eq!(
        app.state.auth.current_user_id().await.expect("current"),
        Some(user_id)
    );
}

#[tokio::test]
async fn register_rejects_invalid_input() {
    let app = TestApp::signed_out();

    let err = app
        .state
        .auth
        .register("mei@example.com", "short", "Mei")
        .await
        .expect_err("weak password");
    assert!(matches!(err, AuthError::Validation(_)));
    assert!(app.store.documents(DB, USERS).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn user_document_creation_gives_up_after_three_attempts() {
    let app = TestApp::signed_out();
    app.store.fail_writes_to(USERS).await;

    let start = tokio::time::Instant::now();
    let err = app
        .state
        .auth
        .create_user_document("mei@example.com", "Mei", &UserId::new("u1"), "")
        .await
        .expect_err("users collection unavailable");
    let elapsed = start.elapsed();

    assert!(matches!(
        err,
        AuthError::Store(StoreError::Api { status: 503, .. })
    ));
    assert_eq!(app.store.create_attempts(USERS).await, 3);
    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn register_fails_when_user_document_cannot_be_written() {
    let app = TestApp::signed_out();
    app.store.fail_writes_to(USERS).await;

    let err = app
        .state
        .auth
        .register("mei@example.com", "correct horse", "Mei")
        .await
        .expect_err("user document fails");
    assert!(matches!(err, AuthError::Store(_)));
    assert_eq!(app.store.create_attempts(USERS).await, 3);
    assert_eq!(app.state.auth.current_user_id().await.expect("current"), None);
}

#[tokio::test]
async fn login_and_logout() {
    let app = TestApp::signed_out();
    app.accounts
        .create_account("u-9", "kai@example.com", "hunter22", "Kai")
        .await
        .expect("account");

    let err = app
        .state
        .auth
        .login("kai@example.com", "wrong")
        .await
        .expect_err("bad password");
    assert!(matches!(err, AuthError::InvalidCredentials));

    let session = app
        .state
        .auth
        .login("kai@example.com", "hunter22")
        .await
        .expect("login");
    assert_eq!(session.user_id, "u-9");

    // A second login replaces the session instead of failing.
    app.state
        .auth
        .login("kai@example.com", "hunter22")
        .await
        .expect("login again");

    app.state.auth.logout().await.expect("logout");
    assert_eq!(app.state.auth.current_user_id().await.expect("current"), None);
    assert!(matches!(
        app.state.auth.logout().await,
        Err(AuthError::NotSignedIn)
    ));
}

#[tokio::test]
async fn profile_falls_back_to_generated_avatar() {
    let app = TestApp::signed_in();

    let profile = app
        .state
        .auth
        .current_profile()
        .await
        .expect("profile")
        .expect("signed in");
    assert_eq!(profile.document_id, None);
    assert_eq!(profile.avatar_url, "https://ui-avatars.com/api/?name=Lin+Xiao");

    app.state
        .auth
        .create_user_document("lin@example.com", "Lin Xiao", &UserId::new("user-1"), "")
        .await
        .expect("user document");

    let profile = app
        .state
        .auth
        .current_profile()
        .await
        .expect("profile")
        .expect("signed in");
    assert!(profile.document_id.is_some());
    assert_eq!(profile.name, "Lin Xiao");
    assert_eq!(
        profile.avatar_url,
        "https://ui-avatars.com/api/?name=Lin%20Xiao&size=200&background=random&format=png&rounded=true"
    );
}

#[tokio::test]
async fn signed_out_profile_is_none() {
    let app = TestApp::signed_out();
    assert!(app.state.auth.current_profile().await.expect("profile").is_none());
    assert!(app.state.require_user().await.is_err());
}
