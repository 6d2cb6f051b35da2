//! Client/server roundtrip over a real Unix socket.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use courier_common::{Signal, quota::Admission};
use courier_control::{
    Command, CommandHandler, ControlClient, ControlServer, Response, ResponseData,
    ResponsePayload,
};
use tokio::sync::broadcast;

struct EchoHandler;

#[async_trait]
impl CommandHandler for EchoHandler {
    async fn handle(&self, command: Command) -> courier_control::Result<Response> {
        match command {
            Command::Ping => Ok(Response::ok()),
            Command::Reserve { requested } => Ok(Response::data(ResponseData::Admission(
                Admission {
                    allowed: true,
                    allow_count: requested,
                },
            ))),
            _ => Ok(Response::error("unsupported in this test")),
        }
    }
}

#[tokio::test]
async fn commands_roundtrip_over_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("control.sock");
    let socket = socket_path.to_string_lossy().to_string();

    let (shutdown_tx, _) = broadcast::channel(4);
    let server = ControlServer::new(socket.clone(), Arc::new(EchoHandler));
    let server_shutdown = shutdown_tx.subscribe();
    let server_task = tokio::spawn(async move { server.serve(server_shutdown).await });

    // Wait for the socket to appear.
    for _ in 0..100 {
        if socket_path.exists() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let client = ControlClient::new(socket.clone());

    let response = client.send(Command::Ping).await.unwrap();
    assert!(matches!(response.payload, ResponsePayload::Ok));

    let response = client.send(Command::Reserve { requested: 7 }).await.unwrap();
    match response.payload {
        ResponsePayload::Data(data) => match *data {
            ResponseData::Admission(admission) => {
                assert!(admission.allowed);
                assert_eq!(admission.allow_count, 7);
            }
            other => panic!("unexpected data: {other:?}"),
        },
        other => panic!("unexpected payload: {other:?}"),
    }

    let response = client.send(Command::Tick).await.unwrap();
    assert!(!response.is_success());

    shutdown_tx.send(Signal::Shutdown).unwrap();
    server_task.await.unwrap().unwrap();

    // The socket file is removed on shutdown.
    assert!(!socket_path.exists());
}
