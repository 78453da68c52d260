//! Integration tests for the per-tenant command client.
//!
//! All tests run on a paused clock, so retry and bootstrap intervals elapse
//! instantly while `Instant` still reports virtual time.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use common::{observed, ScriptedRunner};
use meshward::domain::errors::QueueError;
use meshward::domain::models::{Command, KindSpec, Mesh, QueueKind};
use meshward::domain::ports::CommandRunner;
use meshward::services::commands;
use meshward::services::{ClientOptions, CommandClient};

const INTERVAL: Duration = Duration::from_secs(10);

fn options() -> ClientOptions {
    ClientOptions {
        bootstrap_interval: INTERVAL,
        requeue_delay: INTERVAL,
        ..ClientOptions::default()
    }
}

fn client(runner: &Arc<ScriptedRunner>, mesh: &Mesh) -> CommandClient {
    let runner: Arc<dyn CommandRunner> = Arc::clone(runner) as _;
    CommandClient::new(mesh, options(), runner).expect("client should start")
}

fn apply_domain() -> Command {
    commands::apply_object(
        &KindSpec::control("domain", "domain_key"),
        br#"{"domain_key":"m1.edge"}"#.to_vec(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_requeued_command_eventually_succeeds() {
    let runner = ScriptedRunner::new();
    runner.fail_times("apply domain", 3);
    let client = client(&runner, &Mesh::new("m1"));

    let (command, mut results) = observed(apply_domain());
    client.send(QueueKind::Control, command).await.unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..4 {
        outcomes.push(results.recv().await.unwrap());
    }

    assert!(outcomes[..3].iter().all(Result::is_err));
    assert!(outcomes[3].is_ok());

    let attempts = runner.calls_matching("apply domain");
    assert_eq!(attempts.len(), 4);
    for pair in attempts.windows(2) {
        assert!(pair[1].at.duration_since(pair[0].at) >= INTERVAL);
    }

    // Nothing further once it has succeeded.
    sleep(INTERVAL * 5).await;
    assert_eq!(runner.count("apply domain"), 4);
    assert!(results.try_recv().is_err());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_gates_only_its_own_queue() {
    let runner = ScriptedRunner::new();
    runner.fail_times("apply zone", 2);
    let client = client(&runner, &Mesh::new("m1"));
    let started = Instant::now();

    // Catalog bootstraps immediately and is not held up by Control.
    let (catalog_command, mut catalog_results) =
        observed(Command::new(["apply", "catalogservice"]).with_stdin(b"{}".to_vec()));
    client.send(QueueKind::Catalog, catalog_command).await.unwrap();
    assert!(catalog_results.recv().await.unwrap().is_ok());
    assert!(started.elapsed() < INTERVAL);

    // The Control producer blocks until the probe has succeeded.
    let (command, mut results) = observed(apply_domain());
    client.send(QueueKind::Control, command).await.unwrap();
    assert!(started.elapsed() >= INTERVAL * 2);
    assert!(results.recv().await.unwrap().is_ok());

    let probes = runner.calls_matching("apply zone");
    assert_eq!(probes.len(), 3);
    assert_eq!(probes[0].stdin_json()["zone_key"], "m1-bootstrap");

    let apply = &runner.calls_matching("apply domain")[0];
    assert!(apply.at >= probes[2].at);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_pending_retries() {
    let runner = ScriptedRunner::new();
    runner.always_fail("apply domain");
    let client = client(&runner, &Mesh::new("m1"));

    let (command, mut results) = observed(apply_domain());
    client.send(QueueKind::Control, command).await.unwrap();
    assert!(results.recv().await.unwrap().is_err());

    // Cancel part-way through the requeue delay.
    sleep(INTERVAL / 2).await;
    client.shutdown().await;
    assert_eq!(client.task_count(), 0);

    sleep(INTERVAL * 10).await;
    assert_eq!(runner.count("apply domain"), 1);

    let err = client.send(QueueKind::Control, apply_domain()).await.unwrap_err();
    assert_eq!(
        err,
        QueueError::Closed {
            mesh: "m1".to_string(),
            queue: QueueKind::Control
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_bootstrap_releases_producers() {
    let runner = ScriptedRunner::new();
    runner.always_fail("apply zone");
    let client = Arc::new(client(&runner, &Mesh::new("m1")));

    let producer = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.send(QueueKind::Control, apply_domain()).await })
    };

    sleep(INTERVAL * 3).await;
    client.cancel();

    let result = producer.await.unwrap();
    assert!(matches!(result, Err(QueueError::Closed { .. })));
    assert_eq!(runner.count("apply domain"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_send_during_bootstrap_never_runs() {
    let runner = ScriptedRunner::new();
    runner.fail_times("apply zone", 3);
    let client = client(&runner, &Mesh::new("m1"));

    let gave_up = tokio::time::timeout(
        Duration::from_secs(5),
        client.send(QueueKind::Control, apply_domain()),
    )
    .await;
    assert!(gave_up.is_err());

    // A later command still goes through once bootstrap succeeds.
    let (command, mut results) = observed(Command::new(["apply", "listener"]));
    client.send(QueueKind::Control, command).await.unwrap();
    results.recv().await.unwrap().unwrap();

    sleep(INTERVAL * 6).await;
    assert_eq!(runner.count("apply zone"), 4);
    assert_eq!(runner.count("apply domain"), 0);
    assert_eq!(runner.count("apply listener"), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_many_producers_wait_for_bootstrap() {
    let runner = ScriptedRunner::new();
    runner.fail_times("apply zone", 2);
    let client = Arc::new(client(&runner, &Mesh::new("m1")));

    let producers: Vec<_> = (0..5)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let key = format!("m1.w{i}");
                let command = Command::new(["apply", "domain", key.as_str()]);
                client.send(QueueKind::Control, command).await
            })
        })
        .collect();

    sleep(INTERVAL).await;
    assert!(producers.iter().all(|p| !p.is_finished()));
    assert_eq!(runner.count("apply domain"), 0);

    for producer in producers {
        producer.await.unwrap().unwrap();
    }
    sleep(INTERVAL).await;

    let probes = runner.calls_matching("apply zone");
    assert_eq!(probes.len(), 3);
    let applies = runner.calls_matching("apply domain");
    assert_eq!(applies.len(), 5);
    assert!(applies.iter().all(|call| call.at >= probes[2].at));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_commands_on_one_queue_run_in_order() {
    let runner = ScriptedRunner::new();
    let client = client(&runner, &Mesh::new("m1"));

    client
        .send(QueueKind::Control, Command::new(["apply", "domain"]))
        .await
        .unwrap();
    client
        .send(QueueKind::Control, Command::new(["apply", "listener"]))
        .await
        .unwrap();
    let (last, mut results) = observed(Command::new(["apply", "cluster"]));
    client.send(QueueKind::Control, last).await.unwrap();
    results.recv().await.unwrap().unwrap();

    let order: Vec<String> = runner
        .calls()
        .into_iter()
        .map(|c| c.line())
        .filter(|line| line.starts_with("apply") && line != "apply zone")
        .collect();
    assert_eq!(order, vec!["apply domain", "apply listener", "apply cluster"]);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_flags_prefix_every_invocation() {
    let runner = ScriptedRunner::new();
    let mesh = Mesh::new("m1").with_bootstrap_flags(["--api", "http://cp:5555"]);
    let client = client(&runner, &mesh);

    let (command, mut results) = observed(apply_domain());
    client.send(QueueKind::Control, command).await.unwrap();
    results.recv().await.unwrap().unwrap();

    let calls = runner.calls();
    assert!(calls.len() >= 2, "control probe and apply expected");
    for call in calls {
        assert_eq!(call.args[..2], ["--api", "http://cp:5555"]);
    }

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_is_dropped() {
    let runner = ScriptedRunner::new();
    runner.always_fail("delete domain");
    let client = client(&runner, &Mesh::new("m1"));

    let (command, mut results) = observed(commands::delete_object(
        &KindSpec::control("domain", "domain_key"),
        "m1.edge",
        "m1",
    ));
    client.send(QueueKind::Control, command).await.unwrap();
    assert!(results.recv().await.unwrap().is_err());

    sleep(INTERVAL * 5).await;
    assert_eq!(runner.count("delete domain"), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_probe_override() {
    let runner = ScriptedRunner::new();
    let options = ClientOptions {
        control_probe: Some(Command::new(["get", "zone", "probe"])),
        ..options()
    };
    let shared: Arc<dyn CommandRunner> = Arc::clone(&runner) as _;
    let client = CommandClient::new(&Mesh::new("m1"), options, shared).unwrap();

    let (command, mut results) = observed(apply_domain());
    client.send(QueueKind::Control, command).await.unwrap();
    results.recv().await.unwrap().unwrap();

    assert_eq!(runner.count("get zone probe"), 1);
    assert_eq!(runner.count("apply zone"), 0);
    assert_eq!(runner.count("get catalogmesh --mesh-id m1"), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_read_modify_write_chain_through_queue() {
    let runner = ScriptedRunner::new();
    runner.respond(
        "get listener m1.edge",
        r#"{"listener_key":"m1.edge","secret":{"subject_names":["spiffe://a"]}}"#,
    );
    let client = client(&runner, &Mesh::new("m1"));

    let (command, mut results) = observed(commands::merge_listener_trust("m1.edge", "spiffe://b"));
    client.send(QueueKind::Control, command).await.unwrap();
    results.recv().await.unwrap().unwrap();

    let apply = &runner.calls_matching("apply listener")[0];
    assert_eq!(
        apply.stdin_json()["secret"]["subject_names"],
        serde_json::json!(["spiffe://a", "spiffe://b"])
    );

    client.shutdown().await;
}
