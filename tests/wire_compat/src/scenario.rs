//! End-to-end runs of a Hub with real Agent Sessions over loopback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::{TcpSocket, TcpStream};
use tokio::task::JoinHandle;

use linkcast_agent_session::{AgentSession, SessionConfig, UrlOpener};
use linkcast_hub_server::{BroadcastReport, Hub, HubConfig};
use linkcast_protocol::Command;

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn urls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl UrlOpener for Recorder {
    fn open(&self, url: &str) {
        self.0.lock().unwrap().push(url.to_owned());
    }
}

fn loopback_hub() -> Arc<Hub> {
    Hub::new(HubConfig {
        bind: "127.0.0.1".parse().unwrap(),
        port: 0,
        ..HubConfig::default()
    })
}

fn spawn_agent(port: u16, recorder: &Recorder) -> JoinHandle<()> {
    let config = SessionConfig {
        retry_interval: Duration::from_millis(50),
        open_delay: Duration::from_millis(10),
        ..SessionConfig::new("127.0.0.1", port)
    };
    let mut session = AgentSession::new(config, recorder.clone());
    tokio::spawn(async move {
        let _ = session.run().await;
    })
}

async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..300 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn broadcast_to_three_agents_then_lose_one() {
    let hub = loopback_hub();
    let port = hub.start().await.unwrap().local_addr.port();

    let recorders: Vec<Recorder> = (0..3).map(|_| Recorder::default()).collect();
    let mut agents: Vec<JoinHandle<()>> =
        recorders.iter().map(|r| spawn_agent(port, r)).collect();
    wait_until("three agents", || hub.connection_count() == 3).await;

    let report = hub
        .broadcast(&Command::open_one("https://x.test"))
        .await
        .unwrap();
    assert_eq!(
        report,
        BroadcastReport {
            succeeded: 3,
            failed: 0
        }
    );
    for r in &recorders {
        wait_until("first open", || r.urls() == ["https://x.test"]).await;
    }

    // Killing the task drops its socket; the agent does not come back.
    let killed = agents.remove(1);
    killed.abort();
    let _ = killed.await;

    // The first write to a freshly closed socket can still be accepted by
    // the kernel, so wait for the peer's reader to observe EOF.
    wait_until("two agents", || hub.connection_count() == 2).await;

    let report = hub
        .broadcast(&Command::open_one("https://y.test"))
        .await
        .unwrap();
    assert_eq!(
        report,
        BroadcastReport {
            succeeded: 2,
            failed: 0
        }
    );
    assert_eq!(hub.connection_count(), 2);

    wait_until("second open", || {
        recorders[0].urls().len() == 2 && recorders[2].urls().len() == 2
    })
    .await;
    assert_eq!(recorders[1].urls(), ["https://x.test"]);

    hub.stop().await;
}

/// Connects without ever reading, like an agent on a frozen machine.
async fn stalled_agent(port: u16) -> TcpStream {
    let socket = TcpSocket::new_v4().unwrap();
    socket.set_recv_buffer_size(4096).unwrap();
    socket
        .connect(([127, 0, 0, 1], port).into())
        .await
        .unwrap()
}

#[tokio::test]
async fn stalled_agent_is_evicted_by_failed_write() {
    let hub = Hub::new(HubConfig {
        bind: "127.0.0.1".parse().unwrap(),
        port: 0,
        write_timeout: Duration::from_millis(300),
    });
    let port = hub.start().await.unwrap().local_addr.port();

    let recorders: Vec<Recorder> = (0..2).map(|_| Recorder::default()).collect();
    let _agents: Vec<_> = recorders.iter().map(|r| spawn_agent(port, r)).collect();
    let _stalled = stalled_agent(port).await;
    wait_until("three agents", || hub.connection_count() == 3).await;

    // Each broadcast parks more bytes in the stalled socket until the kernel
    // stops accepting them and the write times out.
    let big = Command::open_one(format!("https://big.test/{}", "a".repeat(256 * 1024)));
    let mut sent = 0;
    let report = loop {
        let report = hub.broadcast(&big).await.unwrap();
        sent += 1;
        if report.failed > 0 {
            break report;
        }
        assert_eq!(report.succeeded, 3);
        assert!(sent < 400, "stalled agent never failed a write");
    };
    assert_eq!(
        report,
        BroadcastReport {
            succeeded: 2,
            failed: 1
        }
    );
    assert_eq!(hub.connection_count(), 2);

    let report = hub
        .broadcast(&Command::open_one("https://after.test"))
        .await
        .unwrap();
    assert_eq!(
        report,
        BroadcastReport {
            succeeded: 2,
            failed: 0
        }
    );
    for r in &recorders {
        wait_until("all opens", || r.urls().len() == sent + 1).await;
        assert_eq!(r.urls().last().map(String::as_str), Some("https://after.test"));
    }

    hub.stop().await;
}

#[tokio::test]
async fn multi_link_order_preserved_on_every_agent() {
    let hub = loopback_hub();
    let port = hub.start().await.unwrap().local_addr.port();

    let recorders: Vec<Recorder> = (0..2).map(|_| Recorder::default()).collect();
    let _agents: Vec<_> = recorders.iter().map(|r| spawn_agent(port, r)).collect();
    wait_until("two agents", || hub.connection_count() == 2).await;

    let urls = ["https://1.test", "https://2.test", "https://3.test"];
    let report = hub
        .broadcast(&Command::open_many(urls).unwrap())
        .await
        .unwrap();
    assert_eq!(report.succeeded, 2);

    for r in &recorders {
        wait_until("all opens", || r.urls().len() == 3).await;
        assert_eq!(r.urls(), urls);
    }

    hub.stop().await;
}

#[tokio::test]
async fn agents_reconnect_after_hub_restart() {
    let hub = loopback_hub();
    let port = hub.start().await.unwrap().local_addr.port();
    hub.set_address("127.0.0.1".parse().unwrap(), port);

    let recorder = Recorder::default();
    let _agent = spawn_agent(port, &recorder);
    wait_until("agent connected", || hub.connection_count() == 1).await;

    let stopped = hub.stop().await;
    assert_eq!(stopped.closed, 1);
    assert_eq!(hub.connection_count(), 0);

    hub.start().await.unwrap();
    wait_until("agent reconnected", || hub.connection_count() == 1).await;

    let report = hub
        .broadcast(&Command::open_one("https://back.test"))
        .await
        .unwrap();
    assert_eq!(report.succeeded, 1);
    wait_until("open after reconnect", || {
        recorder.urls() == ["https://back.test"]
    })
    .await;

    hub.stop().await;
}

#[tokio::test]
async fn agent_started_before_hub_connects_once_hub_is_up() {
    // Reserve a port, then release it so the first dials are refused.
    let port = {
        let reserved = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        reserved.local_addr().unwrap().port()
    };

    let recorder = Recorder::default();
    let _agent = spawn_agent(port, &recorder);
    tokio::time::sleep(Duration::from_millis(120)).await;

    let hub = Hub::new(HubConfig {
        bind: "127.0.0.1".parse().unwrap(),
        port,
        ..HubConfig::default()
    });
    hub.start().await.unwrap();
    wait_until("late hub sees agent", || hub.connection_count() == 1).await;

    hub.stop().await;
}
