use std::io::{BufRead, BufReader};
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use runwarden::exec::{RelaySignal, SignalRoute};
use runwarden_test_utils::fakes::CountingSignaller;
use runwarden_test_utils::with_timeout;
use tokio::sync::mpsc;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

#[tokio::test]
async fn signals_are_forwarded_in_order() {
    let signaller = Arc::new(CountingSignaller::default());
    let (tx, rx) = mpsc::channel(8);
    let _route = SignalRoute::from_source(rx, signaller.clone());

    for s in RelaySignal::ALL {
        tx.send(s).await.unwrap();
    }
    with_timeout(async {
        while signaller.forwarded().len() < 3 {
            settle().await;
        }
    })
    .await;

    assert_eq!(signaller.forwarded(), RelaySignal::ALL.to_vec());
}

#[tokio::test]
async fn repeated_interrupts_after_teardown_are_not_forwarded() {
    let signaller = Arc::new(CountingSignaller::default());
    let (tx, rx) = mpsc::channel(8);
    let route = SignalRoute::from_source(rx, signaller.clone());

    tx.send(RelaySignal::Interrupt).await.unwrap();
    with_timeout(async {
        while signaller.forwarded().is_empty() {
            settle().await;
        }
    })
    .await;

    assert!(route.teardown());
    for _ in 0..5 {
        let _ = tx.send(RelaySignal::Interrupt).await;
    }
    settle().await;

    assert!(!route.teardown());
    assert_eq!(signaller.forwarded(), vec![RelaySignal::Interrupt]);
}

#[tokio::test]
async fn dropping_a_route_tears_it_down() {
    let signaller = Arc::new(CountingSignaller::default());
    let (tx, rx) = mpsc::channel(8);
    drop(SignalRoute::from_source(rx, signaller.clone()));

    let _ = tx.send(RelaySignal::Terminate).await;
    settle().await;
    assert!(signaller.forwarded().is_empty());
}

#[test]
fn interrupt_reaches_the_supervised_child() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Command::new(env!("CARGO_BIN_EXE_runwarden"))
        .args([
            "run",
            "--quiet",
            "--no-monitor",
            "sh",
            "-c",
            "trap 'exit 9' INT; sleep 0.3; echo ready; while :; do sleep 0.05; done",
        ])
        .current_dir(dir.path())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to launch runwarden");

    let stdout = supervisor.stdout.take().unwrap();
    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line).unwrap();
    assert_eq!(line.trim(), "ready");

    kill(Pid::from_raw(supervisor.id() as i32), Signal::SIGINT).unwrap();

    let status = supervisor.wait().unwrap();
    assert_eq!(status.code(), Some(9));
}

#[test]
fn terminate_while_output_drains_uses_the_default_action() {
    let dir = tempfile::tempdir().unwrap();
    // The background sleep keeps the pipes open after the child has exited.
    let mut supervisor = Command::new(env!("CARGO_BIN_EXE_runwarden"))
        .args(["run", "--quiet", "sh", "-c", "sleep 3 & echo go; exit 0"])
        .current_dir(dir.path())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to launch runwarden");

    let stdout = supervisor.stdout.take().unwrap();
    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line).unwrap();
    assert_eq!(line.trim(), "go");

    std::thread::sleep(Duration::from_millis(700));
    let sent = Instant::now();
    kill(Pid::from_raw(supervisor.id() as i32), Signal::SIGTERM).unwrap();

    let status = supervisor.wait().unwrap();
    assert_eq!(status.signal(), Some(Signal::SIGTERM as i32), "status: {status:?}");
    assert!(sent.elapsed() < Duration::from_secs(2), "took {:?}", sent.elapsed());
}
