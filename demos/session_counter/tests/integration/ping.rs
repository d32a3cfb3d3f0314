use crate::helpers::{TestApi, session_set_cookie};
use reqwest::StatusCode;

#[tokio::test]
async fn ping_works() {
    let api = TestApi::spawn().await;

    let response = api.get_ping(None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_set_cookie(&api, &response).is_none());
    assert_eq!(response.text().await.unwrap(), "pong");
}

#[tokio::test]
async fn an_unknown_session_cookie_is_left_alone_if_sessions_are_not_used() {
    let api = TestApi::spawn().await;

    let response = api.get_ping(Some("id=not-a-known-session")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_set_cookie(&api, &response).is_none());
}

#[tokio::test]
async fn unknown_routes_return_404() {
    let api = TestApi::spawn().await;

    let response = api
        .api_client
        .get(format!("{}/api/nope", &api.api_address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
