use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use strand_core::{DispatchContext, DispatcherConfig, SendOutcome, Timeout, load_dotenv};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CALLERS: usize = 4;
const SENDS_PER_CALLER: usize = 25;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (A) config を env から読んで context を起動
    let config = DispatcherConfig::from_env();
    config.log_summary();
    let context = Arc::new(DispatchContext::with_config(config).context("failed to start dispatcher")?);

    // (B) 複数スレッドから send: 全 action が同じ worker thread で動くことを確認
    let seen_threads = Arc::new(Mutex::new(BTreeSet::new()));
    let callers: Vec<_> = (0..CALLERS)
        .map(|caller| {
            let context = Arc::clone(&context);
            let seen_threads = Arc::clone(&seen_threads);
            thread::spawn(move || -> anyhow::Result<()> {
                for _ in 0..SENDS_PER_CALLER {
                    let seen_threads = Arc::clone(&seen_threads);
                    context.send(move || {
                        let name = thread::current().name().unwrap_or("<unnamed>").to_string();
                        seen_threads.lock().expect("seen_threads lock").insert(name);
                    })?;
                }
                info!(caller, sends = SENDS_PER_CALLER, "caller finished");
                Ok(())
            })
        })
        .collect();
    for caller in callers {
        caller.join().map_err(|_| anyhow!("caller thread panicked"))??;
    }
    info!(threads = ?seen_threads.lock().expect("seen_threads lock"), "actions ran on");

    // (C) worker が忙しい間に短い timeout で send すると cancel される
    let busy = {
        let context = Arc::clone(&context);
        thread::spawn(move || context.send(|| thread::sleep(Duration::from_millis(200))))
    };
    thread::sleep(Duration::from_millis(20));
    match context.send_timeout(|| info!("late action ran"), Duration::from_millis(10).into())? {
        SendOutcome::Canceled => info!("short-timeout send was canceled before it ran"),
        SendOutcome::Detached => warn!("short-timeout send raced the worker and was detached"),
        SendOutcome::Completed(()) => info!("short-timeout send completed"),
    }
    busy.join().map_err(|_| anyhow!("busy thread panicked"))??;

    // (D) action の panic は呼び出し側で再送出される
    let fault = panic::catch_unwind(AssertUnwindSafe(|| {
        context.send(|| -> () { panic!("demo fault") })
    }));
    if let Err(payload) = fault {
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .unwrap_or("<non-string panic>");
        info!(fault = message, "fault re-raised on the calling thread");
    }

    // (E) async から
    let answer = context
        .send_async(|| 6 * 7, Timeout::Infinite)
        .await?
        .into_value();
    info!(?answer, "async send completed");

    // (F) status を出して停止
    let status = context.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    context.shutdown().context("failed to stop dispatcher")?;
    info!(state = ?context.status().state, "done");
    Ok(())
}
