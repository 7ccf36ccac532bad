//! Integration tests for signup, login and user listing

use std::time::Duration;

use waypost_core::auth::TokenSigner;
use waypost_core::*;
use waypost_engine::*;

fn service() -> (AccountService, tempfile::TempDir) {
    let (engine, temp) = StorageEngine::temp().unwrap();
    let store = Store::open(engine).unwrap();
    let signer = TokenSigner::new(b"accounts-test-secret");
    let svc = AccountService::new(store, signer, PasswordPool::new(2), Duration::from_secs(3600));
    (svc, temp)
}

fn ann() -> NewUser {
    NewUser {
        name: "Ann".to_string(),
        email: "ann@x.com".to_string(),
        password: "secret1".to_string(),
        image_url: String::new(),
    }
}

#[tokio::test]
async fn signup_then_login_roundtrip() {
    let (svc, _temp) = service();

    let session = svc.signup(ann()).await.unwrap();
    assert_eq!(session.email, "ann@x.com");
    assert!(!session.token.is_empty());

    let login = svc
        .login(LoginRequest {
            email: "ann@x.com".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(login.user_id, session.user_id);

    let err = svc
        .login(LoginRequest {
            email: "ann@x.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
async fn signup_token_proves_the_new_identity() {
    let (svc, _temp) = service();

    let session = svc.signup(ann()).await.unwrap();
    let identity = svc.signer().verify(&session.token).unwrap();
    assert_eq!(identity.user_id, session.user_id);
    assert_eq!(identity.email, "ann@x.com");
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let (svc, _temp) = service();
    svc.signup(ann()).await.unwrap();

    let mut again = ann();
    again.email = "Ann@X.Com".to_string();
    let err = svc.signup(again).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // Only the first account exists.
    assert_eq!(svc.list_users().unwrap().len(), 1);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let (svc, _temp) = service();
    let mut user = ann();
    user.password = "short".to_string();
    let err = svc.signup(user).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn unknown_email_is_forbidden() {
    let (svc, _temp) = service();
    let err = svc
        .login(LoginRequest {
            email: "nobody@x.com".to_string(),
            password: "whatever1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
async fn stored_password_is_hashed_not_plaintext() {
    let (svc, _temp) = service();
    let session = svc.signup(ann()).await.unwrap();

    let record = svc.store().get_user(&session.user_id).unwrap().unwrap();
    assert_ne!(record.password_hash, "secret1");
    assert!(record.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn listing_resolves_places_and_hides_hashes() {
    let (svc, _temp) = service();
    let session = svc.signup(ann()).await.unwrap();

    let places = PlaceService::new(svc.store().clone());
    let place = places
        .create(
            NewPlace {
                title: "Tower".to_string(),
                description: "A tall tower".to_string(),
                address: "5th Ave".to_string(),
                image_url: String::new(),
                location: None,
            },
            &session.user_id,
        )
        .unwrap();

    let users = svc.list_users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].places, vec![place.id]);

    let json = serde_json::to_string(&users).unwrap();
    assert!(!json.contains("argon2"));
    assert!(!json.contains("password"));
}
