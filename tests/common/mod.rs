//! Shared helpers for Prodigy integration tests
#![allow(dead_code)]

use prodigy::{Protocol, ProtocolRunner, RunnerConfig};
use std::sync::Once;
use std::time::{Duration, Instant};

static INIT: Once = Once::new();

/// Install a test tracing subscriber once per binary (RUST_LOG controlled).
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Protocol `"P"` with an `"echo"` handler that responds with the request
/// payload and a `"never"` handler that never responds.
pub fn echo_protocol() -> Protocol {
    Protocol::builder("P")
        .on("echo", |mut request, _sender| async move {
            let body: Vec<u8> = request.payload_as()?;
            request.respond(Some(&body)).await
        })
        .on("never", |_request, _sender| async move { Ok(()) })
        .build()
}

/// Bind a runner to an OS-assigned loopback port, register the echo protocol,
/// and start it.
pub async fn spawn_echo_runner() -> ProtocolRunner {
    spawn_runner(echo_protocol()).await
}

/// Bind a runner to an OS-assigned loopback port, register `protocol`, and
/// start it.
pub async fn spawn_runner(protocol: Protocol) -> ProtocolRunner {
    let mut runner = ProtocolRunner::new(RunnerConfig::default());
    runner
        .bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("Failed to bind runner");
    runner.register_protocol(protocol).await;
    runner.run().expect("Failed to start runner");
    runner
}

/// Poll `condition` every 10ms until it holds or `deadline` elapses.
pub async fn wait_until(deadline: Duration, condition: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
