use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::time::Duration;

use gale_client::{Client, Pool, PoolConfig};
use gale_common::{ClientError, PoolError, unix_now};
use gale_protocol::Value;
use gale_storage::Cache;

/// Helper: sobe um servidor em porta efêmera e retorna o endereço.
async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cache = Cache::new(0);
    tokio::spawn(async move {
        gale_server::run(listener, cache, std::future::pending::<()>()).await;
    });
    addr
}

/// Chave única por teste, estilo timestamp.
fn unique_key(prefix: &str) -> String {
    format!(
        "{prefix}-{}",
        std::time::UNIX_EPOCH.elapsed().unwrap().as_nanos()
    )
}

fn hour_from_now() -> u32 {
    unix_now() + 3600
}

#[tokio::test]
async fn add_then_get() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let key = unique_key("add");
    client
        .add(&key, Value::new(hour_from_now(), Bytes::from("test")))
        .await
        .unwrap();

    let value = client.get(&key).await.unwrap();
    assert_eq!(value.data, Bytes::from("test"));
}

#[tokio::test]
async fn add_expired_value_is_accepted() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let key = unique_key("expired-add");
    // o servidor aceita e descarta em silêncio
    client
        .add(&key, Value::new(unix_now().saturating_sub(3600), Bytes::from("test")))
        .await
        .unwrap();

    assert!(matches!(
        client.get(&key).await,
        Err(ClientError::NotFound)
    ));
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let result = client.get(&unique_key("missing")).await;
    assert!(matches!(result, Err(ClientError::NotFound)));
}

#[tokio::test]
async fn get_expired_is_not_found() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let key = unique_key("expiring");
    client
        .add(&key, Value::new(unix_now() + 1, Bytes::from("x")))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(matches!(
        client.get(&key).await,
        Err(ClientError::NotFound)
    ));
}

#[tokio::test]
async fn remove_missing_is_ok() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    client.remove(&unique_key("ghost")).await.unwrap();
}

#[tokio::test]
async fn remove_stored_key() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let key = unique_key("del");
    client
        .add(&key, Value::new(hour_from_now(), Bytes::from("v")))
        .await
        .unwrap();
    client.remove(&key).await.unwrap();

    assert!(matches!(
        client.get(&key).await,
        Err(ClientError::NotFound)
    ));
}

#[tokio::test]
async fn keys_contains_stored_key() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let key = unique_key("keys");
    client
        .add(&key, Value::new(hour_from_now(), Bytes::from("v")))
        .await
        .unwrap();

    let keys = client.keys().await.unwrap();
    assert!(keys.contains(&key), "{key} não apareceu em {keys:?}");
}

#[tokio::test]
async fn expired_value_roundtrips_expiry_field() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let key = unique_key("expiry-field");
    let expired = hour_from_now();
    client
        .add(&key, Value::new(expired, Bytes::from("v")))
        .await
        .unwrap();

    let value = client.get(&key).await.unwrap();
    assert_eq!(value.expired, expired);
}

#[tokio::test]
async fn sequential_calls_reuse_pooled_connection() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let key = unique_key("reuse");
    for i in 0..10 {
        client
            .add(&key, Value::new(hour_from_now(), Bytes::from(format!("v{i}"))))
            .await
            .unwrap();
        let value = client.get(&key).await.unwrap();
        assert_eq!(value.data, Bytes::from(format!("v{i}")));
    }
}

#[tokio::test]
async fn concurrent_clients_share_pool() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let mut handles = Vec::new();
    for t in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("conc-{t}");
            for _ in 0..20 {
                client
                    .add(&key, Value::new(unix_now() + 3600, Bytes::from("v")))
                    .await
                    .unwrap();
                client.get(&key).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn pool_exhaustion_times_out() {
    let addr = start_server().await;
    // max_conns = 2 com o teto estrito deixa uma única conexão dialable
    let pool = Pool::new(
        addr.to_string(),
        PoolConfig {
            max_conns: 2,
            max_idle_conns: 1,
            wait_timeout: Duration::from_millis(100),
            ..PoolConfig::default()
        },
    );

    let held = pool.get().await.unwrap();
    assert_eq!(pool.in_flight(), 1);

    let start = Instant::now();
    let result = pool.get().await;
    assert!(matches!(result, Err(PoolError::Exhausted)));
    assert!(start.elapsed() >= Duration::from_millis(100));

    // devolvida, a conexão volta a ser emprestável
    pool.put(held).await;
    let again = pool.get().await.unwrap();
    assert_eq!(pool.in_flight(), 1);
    drop(again);
}

#[tokio::test]
async fn pool_waiter_gets_returned_connection() {
    let addr = start_server().await;
    let pool = Pool::new(
        addr.to_string(),
        PoolConfig {
            max_conns: 2,
            max_idle_conns: 1,
            wait_timeout: Duration::from_millis(500),
            ..PoolConfig::default()
        },
    );

    let held = pool.get().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.get().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    pool.put(held).await;

    let conn = waiter.await.unwrap().expect("waiter deveria receber a conexão devolvida");
    assert_eq!(pool.in_flight(), 1);
    drop(conn);
}

#[tokio::test]
async fn closed_pool_rejects_borrow() {
    let addr = start_server().await;
    let client = Client::new(addr.to_string());

    let key = unique_key("close");
    client
        .add(&key, Value::new(hour_from_now(), Bytes::from("v")))
        .await
        .unwrap();

    client.close().await;

    assert!(matches!(
        client.get(&key).await,
        Err(ClientError::Pool(PoolError::Closed))
    ));
}

#[tokio::test]
async fn close_drains_idle_connections() {
    let addr = start_server().await;
    let pool = Pool::new(addr.to_string(), PoolConfig::default());

    let a = pool.get().await.unwrap();
    let b = pool.get().await.unwrap();
    pool.put(a).await;
    pool.put(b).await;
    assert_eq!(pool.in_flight(), 2);

    pool.close().await;
    assert_eq!(pool.in_flight(), 0);
    assert!(pool.is_closed());
    assert!(matches!(pool.get().await, Err(PoolError::Closed)));
}

#[tokio::test]
async fn reaper_closes_stale_idle_connections() {
    let addr = start_server().await;
    let pool = Pool::new(
        addr.to_string(),
        PoolConfig {
            max_conns: 4,
            // com teto zero de idle, qualquer conexão velha é recolhida
            max_idle_conns: 0,
            wait_timeout: Duration::from_millis(100),
            reap_interval: Duration::from_millis(50),
            idle_max_age: Duration::from_secs(0),
        },
    );

    let conn = pool.get().await.unwrap();
    pool.put(conn).await;
    assert_eq!(pool.in_flight(), 1);

    // last_used tem granularidade de segundo; esperar o carimbo envelhecer
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(pool.in_flight(), 0);
}

#[tokio::test]
async fn pool_error_surfaces_when_server_is_down() {
    // porta efêmera fechada: bind e drop imediato
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new(addr.to_string());
    let result = client.get("any").await;
    assert!(matches!(result, Err(ClientError::Pool(PoolError::Io(_)))));
}
