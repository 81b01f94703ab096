use std::sync::Arc;
use std::time::Duration;

use canvas_stream::canvas::NoopCanvasClient;
use canvas_stream::db;
use canvas_stream::services::{Shutdown, SyncOptions, SyncScheduler, SyncStats, shutdown_channel};
use tempfile::TempDir;

async fn scheduler(interval: Duration, shutdown: Shutdown, tmp: &TempDir) -> SyncScheduler {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");
    let options = SyncOptions {
        sync_root: tmp.path().join("canvas"),
        ..SyncOptions::default()
    };
    SyncScheduler::new(pool, Arc::new(NoopCanvasClient), options, interval, shutdown)
}

#[tokio::test]
async fn empty_account_iteration_does_nothing() {
    let tmp = TempDir::new().unwrap();
    let scheduler = scheduler(Duration::from_secs(10), Shutdown::never(), &tmp).await;

    let stats = scheduler.run_once().await.expect("iteration should succeed");

    assert_eq!(stats, SyncStats::default());
}

#[tokio::test]
async fn shutdown_interrupts_the_sleep() {
    let tmp = TempDir::new().unwrap();
    let (stop, shutdown) = shutdown_channel();
    let scheduler = scheduler(Duration::from_secs(3600), shutdown, &tmp).await;

    let task = tokio::spawn(scheduler.start());

    // let the first iteration finish and the loop go to sleep
    tokio::time::sleep(Duration::from_millis(200)).await;
    stop.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("scheduler did not stop")
        .unwrap();
}

#[tokio::test]
async fn shutdown_before_start_runs_a_single_iteration() {
    let tmp = TempDir::new().unwrap();
    let (stop, shutdown) = shutdown_channel();
    stop.send(true).unwrap();
    let scheduler = scheduler(Duration::from_secs(3600), shutdown, &tmp).await;

    tokio::time::timeout(Duration::from_secs(5), scheduler.start())
        .await
        .expect("scheduler did not stop");
}

#[tokio::test]
async fn short_interval_keeps_looping_until_stopped() {
    let tmp = TempDir::new().unwrap();
    let (stop, shutdown) = shutdown_channel();
    let scheduler = scheduler(Duration::from_millis(50), shutdown, &tmp).await;

    let task = tokio::spawn(scheduler.start());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!task.is_finished());

    stop.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("scheduler did not stop")
        .unwrap();
}
