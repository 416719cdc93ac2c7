use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use manipulation_factory::api;
use manipulation_factory::auth::AuthConfig;
use manipulation_factory::config::{ContentConfig, GameConfig, ServerConfig};
use manipulation_factory::content::ContentService;
use manipulation_factory::llm::{
    GenerateRequest, GenerateResponse, LlmError, LlmManager, LlmProvider, LlmResult,
    ResponseMetadata,
};
use manipulation_factory::protocol::{ClientMessage, ServerMessage};
use manipulation_factory::state::AppState;
use manipulation_factory::technique::Technique;
use manipulation_factory::types::{GameStatus, Role, RoundPhase};
use manipulation_factory::ws::handlers::handle_message;
use manipulation_factory::ws::Session;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Replies with queued texts in order, then errors like an unreachable model
struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, _request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(text) => Ok(GenerateResponse {
                text,
                metadata: ResponseMetadata {
                    provider: "scripted".to_string(),
                    model: "scripted".to_string(),
                    tokens_used: None,
                    latency_ms: 0,
                },
            }),
            None => Err(LlmError::ApiError("script exhausted".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn scripted_content(replies: &[&str]) -> ContentService {
    let provider = ScriptedProvider {
        replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
    };
    ContentService::new(
        Some(Arc::new(LlmManager::new(vec![Box::new(provider)]))),
        ContentConfig::default(),
    )
}

fn test_config() -> GameConfig {
    GameConfig {
        add_ai_player: false,
        total_rounds: 2,
        ..GameConfig::default()
    }
}

fn session(game_id: &str, player_id: Option<&str>, role: Role) -> Session {
    Session {
        game_id: game_id.to_string(),
        player_id: player_id.map(str::to_string),
        role,
    }
}

fn tags(techniques: &[Technique]) -> Vec<String> {
    techniques.iter().map(|t| t.tag().to_string()).collect()
}

fn expect_error(msg: Option<ServerMessage>, expected_code: &str) {
    match msg {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, expected_code),
        other => panic!("Expected {} error, got {:?}", expected_code, other),
    }
}

/// Wait for the background analysis of the current round
async fn wait_for_analysis(state: &AppState, game_id: &str) {
    for _ in 0..100 {
        let game = state.get_game(game_id).await.unwrap();
        if game.current_round().and_then(|r| r.ai_analysis.as_ref()).is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Analysis never arrived");
}

/// End-to-end game: two rounds, scripted content for the first one
#[tokio::test]
async fn test_full_game_flow() {
    let content = scripted_content(&[
        "Everyone is switching to night trains. Only fools still fly!",
        r#"{"explanation": "Peer pressure and a false choice.", "neutralAlternative": "Night trains are one of several ways to travel, each with trade-offs.", "manipulationLevel": 40, "aiCommentary": "Choo choo."}"#,
    ]);
    let state = Arc::new(AppState::with_config(
        test_config(),
        ServerConfig::default(),
        content,
    ));

    // 1. Lobby
    let (game, host) = state.create_game("Host").await.unwrap();
    assert_eq!(game.status, GameStatus::Lobby);
    let (_, alice) = state.join_game(&game.code.to_lowercase(), "Alice").await.unwrap();

    let host_session = session(&game.id, Some(&host.id), Role::Host);
    let alice_session = session(&game.id, Some(&alice.id), Role::Player);

    // 2. Only the host starts
    expect_error(
        handle_message(ClientMessage::HostStartGame, &alice_session, &state).await,
        "UNAUTHORIZED",
    );
    assert!(handle_message(ClientMessage::HostStartGame, &host_session, &state)
        .await
        .is_none());

    let snapshot = state.get_game(&game.id).await.unwrap();
    assert_eq!(snapshot.status, GameStatus::Playing);
    let round = snapshot.current_round().expect("Round 1 should exist");
    assert_eq!(round.number, 1);
    assert_eq!(round.phase, RoundPhase::Guessing);
    assert_eq!(
        round.manipulative_post,
        "Everyone is switching to night trains. Only fools still fly!"
    );
    let correct = round.correct_techniques.clone();

    // 3. Guesses: Alice is right, the host names one wrong technique
    let wrong = Technique::ALL
        .into_iter()
        .find(|t| !correct.contains(t))
        .unwrap();

    match handle_message(
        ClientMessage::SubmitGuess {
            techniques: tags(&correct),
        },
        &alice_session,
        &state,
    )
    .await
    {
        Some(ServerMessage::GuessAccepted {
            round_number,
            techniques,
        }) => {
            assert_eq!(round_number, 1);
            assert_eq!(techniques.len(), correct.len());
        }
        other => panic!("Expected GuessAccepted, got {:?}", other),
    }

    expect_error(
        handle_message(
            ClientMessage::SubmitGuess {
                techniques: tags(&correct),
            },
            &alice_session,
            &state,
        )
        .await,
        "INVALID_STATE",
    );

    assert!(matches!(
        handle_message(
            ClientMessage::SubmitGuess {
                techniques: tags(&[wrong]),
            },
            &host_session,
            &state,
        )
        .await,
        Some(ServerMessage::GuessAccepted { .. })
    ));

    // Everyone guessed, so guessing closed on its own
    let snapshot = state.get_game(&game.id).await.unwrap();
    assert_eq!(snapshot.current_round().unwrap().phase, RoundPhase::Reveal);

    // 4. Analysis from the scripted model
    wait_for_analysis(&state, &game.id).await;
    let snapshot = state.get_game(&game.id).await.unwrap();
    let round = snapshot.current_round().unwrap();
    let analysis = round.ai_analysis.as_ref().unwrap();
    assert_eq!(analysis.explanation, "Peer pressure and a false choice.");
    assert_eq!(
        analysis.manipulation_level as usize,
        (40 + 10 * correct.len()).min(100)
    );
    assert_eq!(analysis.correct_techniques, correct);
    assert!(round.scored_at.is_some());

    let alice_points = round.points[&alice.id];
    assert!(alice_points >= 10 * correct.len() as u32 + 20);
    assert!(round.points[&host.id] < alice_points);

    // 5. Comparison, then round 2 with canned content
    assert!(handle_message(ClientMessage::HostAdvance, &host_session, &state)
        .await
        .is_none());
    let snapshot = state.get_game(&game.id).await.unwrap();
    assert_eq!(snapshot.current_round().unwrap().phase, RoundPhase::Comparison);

    assert!(handle_message(ClientMessage::HostAdvance, &host_session, &state)
        .await
        .is_none());
    let snapshot = state.get_game(&game.id).await.unwrap();
    let round = snapshot.current_round().unwrap();
    assert_eq!(round.number, 2);
    assert_eq!(round.phase, RoundPhase::Guessing);
    assert_eq!(
        snapshot.rounds["round-1"].phase,
        RoundPhase::Complete
    );

    // Nobody guesses; the host closes guessing, reveals and compares
    assert!(handle_message(ClientMessage::HostAdvance, &host_session, &state)
        .await
        .is_none());
    assert!(handle_message(ClientMessage::HostAdvance, &host_session, &state)
        .await
        .is_none());
    let snapshot = state.get_game(&game.id).await.unwrap();
    let round = snapshot.current_round().unwrap();
    assert_eq!(round.phase, RoundPhase::Comparison);
    assert!(round.ai_analysis.is_some());

    // 6. Last round done: the game finishes
    assert!(handle_message(ClientMessage::HostAdvance, &host_session, &state)
        .await
        .is_none());
    let snapshot = state.get_game(&game.id).await.unwrap();
    assert_eq!(snapshot.status, GameStatus::Finished);
    assert_eq!(snapshot.players[&alice.id].score, alice_points);

    let leaderboard = state.leaderboard(&game.id).await.unwrap();
    assert_eq!(leaderboard[0].player_id, alice.id);
    assert_eq!(leaderboard[0].rank, 1);
}

#[tokio::test]
async fn test_broadcasts_reach_subscribers() {
    let state = Arc::new(AppState::with_config(
        test_config(),
        ServerConfig::default(),
        ContentService::offline(),
    ));
    let (game, host) = state.create_game("Host").await.unwrap();
    let mut rx = state.subscribe(&game.id).await.unwrap();

    let (_, alice) = state.join_game(&game.code, "Alice").await.unwrap();
    match rx.recv().await.unwrap() {
        ServerMessage::PlayerJoined { player } => assert_eq!(player.id, alice.id),
        other => panic!("Expected PlayerJoined, got {:?}", other),
    }

    let host_session = session(&game.id, Some(&host.id), Role::Host);
    handle_message(ClientMessage::HostStartGame, &host_session, &state).await;

    // Drain until the guessing phase is announced
    loop {
        match rx.recv().await.unwrap() {
            ServerMessage::Phase {
                round_number,
                phase,
                deadline,
                ..
            } => {
                assert_eq!(round_number, 1);
                assert_eq!(phase, RoundPhase::Guessing);
                assert!(deadline.is_some());
                break;
            }
            ServerMessage::GameState { game } => {
                // Answers stay hidden in public snapshots while guessing
                let json = serde_json::to_value(&game).unwrap();
                if let Some(round) = json.get("current_round").filter(|r| !r.is_null()) {
                    assert!(round.get("correct_techniques").map_or(true, |v| v.is_null()));
                }
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_display_and_player_restrictions() {
    let state = Arc::new(AppState::with_config(
        test_config(),
        ServerConfig::default(),
        ContentService::offline(),
    ));
    let (game, host) = state.create_game("Host").await.unwrap();
    let (_, alice) = state.join_game(&game.code, "Alice").await.unwrap();

    let display = session(&game.id, None, Role::Display);
    let alice_session = session(&game.id, Some(&alice.id), Role::Player);
    let host_session = session(&game.id, Some(&host.id), Role::Host);

    for msg in [
        ClientMessage::HostAdvance,
        ClientMessage::HostEndGame,
        ClientMessage::HostAddAiPlayer,
        ClientMessage::HostRemovePlayer {
            player_id: host.id.clone(),
        },
    ] {
        expect_error(handle_message(msg, &alice_session, &state).await, "UNAUTHORIZED");
    }

    // Guessing before the game started
    expect_error(
        handle_message(
            ClientMessage::SubmitGuess {
                techniques: vec!["bandwagon".to_string()],
            },
            &alice_session,
            &state,
        )
        .await,
        "ROUND_NOT_FOUND",
    );

    handle_message(ClientMessage::HostStartGame, &host_session, &state).await;

    expect_error(
        handle_message(
            ClientMessage::SubmitGuess {
                techniques: vec!["bandwagon".to_string()],
            },
            &display,
            &state,
        )
        .await,
        "UNAUTHORIZED",
    );

    expect_error(
        handle_message(
            ClientMessage::SubmitGuess {
                techniques: vec!["strawman".to_string()],
            },
            &alice_session,
            &state,
        )
        .await,
        "INVALID_INPUT",
    );

    expect_error(
        handle_message(
            ClientMessage::SubmitGuess { techniques: vec![] },
            &alice_session,
            &state,
        )
        .await,
        "INVALID_INPUT",
    );
}

#[tokio::test]
async fn test_host_manages_players() {
    let state = Arc::new(AppState::with_config(
        test_config(),
        ServerConfig::default(),
        ContentService::offline(),
    ));
    let (game, host) = state.create_game("Host").await.unwrap();
    let (_, alice) = state.join_game(&game.code, "Alice").await.unwrap();
    let host_session = session(&game.id, Some(&host.id), Role::Host);

    // Adding the AI player twice keeps a single one
    assert!(handle_message(ClientMessage::HostAddAiPlayer, &host_session, &state)
        .await
        .is_none());
    assert!(handle_message(ClientMessage::HostAddAiPlayer, &host_session, &state)
        .await
        .is_none());
    let snapshot = state.get_game(&game.id).await.unwrap();
    assert_eq!(snapshot.players.values().filter(|p| p.is_ai).count(), 1);

    // The host cannot remove themselves
    expect_error(
        handle_message(
            ClientMessage::HostRemovePlayer {
                player_id: host.id.clone(),
            },
            &host_session,
            &state,
        )
        .await,
        "INVALID_STATE",
    );

    assert!(handle_message(
        ClientMessage::HostRemovePlayer {
            player_id: alice.id.clone(),
        },
        &host_session,
        &state,
    )
    .await
    .is_none());
    let snapshot = state.get_game(&game.id).await.unwrap();
    assert!(!snapshot.players.contains_key(&alice.id));

    // Only one human left
    expect_error(
        handle_message(ClientMessage::HostStartGame, &host_session, &state).await,
        "INVALID_STATE",
    );

    assert!(handle_message(ClientMessage::HostEndGame, &host_session, &state)
        .await
        .is_none());
    let snapshot = state.get_game(&game.id).await.unwrap();
    assert_eq!(snapshot.status, GameStatus::Finished);
}

#[test]
fn test_client_message_wire_format() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"t":"submit_guess","techniques":["bandwagon","ad_hominem"]}"#)
            .unwrap();
    match msg {
        ClientMessage::SubmitGuess { techniques } => {
            assert_eq!(techniques, vec!["bandwagon", "ad_hominem"]);
        }
        other => panic!("Unexpected message {:?}", other),
    }

    let msg: ClientMessage =
        serde_json::from_str(r#"{"t":"host_remove_player","player_id":"p1"}"#).unwrap();
    assert!(matches!(msg, ClientMessage::HostRemovePlayer { player_id } if player_id == "p1"));
}

// HTTP API

fn test_router(auth: AuthConfig) -> Router {
    let state = Arc::new(AppState::with_config(
        test_config(),
        ServerConfig::default(),
        ContentService::offline(),
    ));
    api::router(state, Arc::new(auth))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_http_create_and_join() {
    let app = test_router(AuthConfig::default());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/games",
            serde_json::json!({"host_name": "Host"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let code = created["code"].as_str().unwrap().to_string();
    let game_id = created["game_id"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 5);
    assert!(created["join_url"].as_str().unwrap().ends_with(&code));
    assert!(!created["token"].as_str().unwrap().is_empty());

    let response = app
        .clone()
        .oneshot(get(&format!("/api/games/code/{}", code)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let lookup = json_body(response).await;
    assert_eq!(lookup["game_id"], game_id.as_str());
    assert_eq!(lookup["status"], "lobby");
    assert_eq!(lookup["player_count"], 1);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/join/{}", code),
            serde_json::json!({"display_name": "Alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let joined = json_body(response).await;
    assert_eq!(joined["game_id"], game_id.as_str());

    // Names are unique per game
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/join/{}", code),
            serde_json::json!({"display_name": "alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/games/{}", game_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await;
    assert!(!view.to_string().contains(joined["token"].as_str().unwrap()));
}

#[tokio::test]
async fn test_http_errors_and_lookups() {
    let app = test_router(AuthConfig::default());

    let response = app.clone().oneshot(get("/api/games/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "GAME_NOT_FOUND");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/join/ZZZZZ",
            serde_json::json!({"display_name": "Alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "CODE_NOT_FOUND");

    let response = app.clone().oneshot(get("/api/techniques")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let techniques = json_body(response).await;
    assert_eq!(techniques.as_array().unwrap().len(), 8);
    assert_eq!(techniques[0]["tag"], "emotional_language");

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health = json_body(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["llm"], false);
}

#[tokio::test]
async fn test_http_game_creation_requires_auth() {
    let app = test_router(AuthConfig {
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
    });

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/games",
            serde_json::json!({"host_name": "Host"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

    let mut request = post_json("/api/games", serde_json::json!({"host_name": "Host"}));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        // admin:secret
        "Basic YWRtaW46c2VjcmV0".parse().unwrap(),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Joining stays open
    let response = app.oneshot(get("/api/techniques")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
