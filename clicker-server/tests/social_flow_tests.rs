
use clicker_server::websocket::Broadcaster;
use clicker_types::{
    Clan, ClanResponse, CreateClanRequest, JoinClanRequest, ServerMessage, TradeResponse,
    TradeStatus, TradeStatusRequest,
};
use test_helpers::*;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_clan_lifecycle_over_http() {
    let setup = TestServerSetup::new().await;
    let routes = setup.routes();

    let response = warp::test::request()
        .method("POST")
        .path("/api/clans")
        .json(&CreateClanRequest {
            name: "Smoki".to_string(),
            player_id: "leader".to_string(),
            player_name: "Ala".to_string(),
        })
        .reply(&routes)
        .await;
    let clan = serde_json::from_slice::<ClanResponse>(response.body())
        .unwrap()
        .clan;

    // Joining twice leaves one membership
    for _ in 0..2 {
        let response = warp::test::request()
            .method("POST")
            .path(&format!("/api/clans/{}/join", clan.id))
            .json(&JoinClanRequest {
                player_id: "p2".to_string(),
                player_name: "Olek".to_string(),
            })
            .reply(&routes)
            .await;
        assert_eq!(response.status(), 200);
    }

    let stored = assert_ok!(setup.repositories.clans.find(&clan.id).await).unwrap();
    assert_eq!(stored.members.len(), 2);
}

#[tokio::test]
async fn test_concurrent_joins_over_http_keep_every_member() {
    let setup = TestServerSetup::new().await;
    let routes = setup.routes();
    let clan = setup
        .repositories
        .clans
        .create("Smoki", "leader", "Ala")
        .await
        .unwrap();

    let joins = (0..5).map(|n| {
        warp::test::request()
            .method("POST")
            .path(&format!("/api/clans/{}/join", clan.id))
            .json(&JoinClanRequest {
                player_id: format!("p{}", n),
                player_name: format!("Gracz {}", n),
            })
            .reply(&routes)
    });
    for response in futures::future::join_all(joins).await {
        assert_eq!(response.status(), 200);
    }

    let response = warp::test::request()
        .method("GET")
        .path("/api/clans")
        .reply(&routes)
        .await;
    let clans: Vec<Clan> = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(clans[0].members.len(), 6);
}

#[tokio::test]
async fn test_trade_lifecycle_notifies_every_listener() {
    let setup = TestServerSetup::new().await;
    let routes = setup.routes();
    let (_, mut alice) = setup.create_listener("alice", Some("smoki")).await;
    let (_, mut bob) = setup.create_listener("bob", None).await;

    let response = warp::test::request()
        .method("POST")
        .path("/api/trades")
        .json(&serde_json::json!({"playerId": "alice", "playerName": "Alice", "requestMoney": 10}))
        .reply(&routes)
        .await;
    let trade = serde_json::from_slice::<TradeResponse>(response.body())
        .unwrap()
        .trade;

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/trades/{}/status", trade.id))
        .json(&TradeStatusRequest {
            status: TradeStatus::Accepted,
        })
        .reply(&routes)
        .await;
    assert_eq!(response.status(), 200);

    for listener in [&mut alice, &mut bob] {
        let messages = drain(listener);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ServerMessage::NewTrade(trade.clone()));
        match &messages[1] {
            ServerMessage::TradeUpdate(payload) => {
                assert_eq!(payload["id"], trade.id.as_str());
                assert_eq!(payload["status"], "accepted");
            }
            other => panic!("Expected TradeUpdate, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_group_publish_respects_membership() {
    let setup = TestServerSetup::new().await;
    let (_, mut smok) = setup.create_listener("ala", Some("smoki")).await;
    let (_, mut wilk) = setup.create_listener("ewa", Some("wilki")).await;
    let (_, mut loner) = setup.create_listener("jan", None).await;

    let delivered = setup
        .connection_manager
        .publish_to_group(
            "smoki",
            ServerMessage::ClanChat(create_test_chat("ala", "hej", Some("smoki"))),
        )
        .await;

    assert_eq!(delivered, 1);
    assert_eq!(drain(&mut smok).len(), 1);
    assert!(drain(&mut wilk).is_empty());
    assert!(drain(&mut loner).is_empty());
}
