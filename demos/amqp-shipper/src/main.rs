mod cli;

use amqp_log_driver::amqp;
use amqp_log_driver::prelude::*;
use clap::Parser;
use log::{error, info};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// How often the main loop looks at the shutdown flag while stdin is idle.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn context(args: &cli::Args) -> DriverContext {
    let mut ctx = DriverContext {
        container_id: args.container_id.clone(),
        container_name: args.container_name.clone(),
        container_image_name: args.image_name.clone(),
        container_created: args.created.unwrap_or_else(chrono::Utc::now),
        hostname: args.hostname.clone(),
        ..DriverContext::default()
    };
    for (key, value) in args.driver_options() {
        ctx = ctx.with_option(key, value);
    }
    ctx
}

/// Forward stdin lines to a channel so the main loop can watch for signals.
fn spawn_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
    });
    receiver
}

fn main() {
    env_logger::init();
    let args = cli::Args::parse();

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&shutdown)) {
            eprintln!("Failed to install signal handler: {e}");
            std::process::exit(1);
        }
    }

    let mut registry = DriverRegistry::new();
    if let Err(e) = amqp::register(&mut registry) {
        eprintln!("Failed to register driver: {e}");
        std::process::exit(1);
    }

    let driver = registry
        .create(amqp::NAME, &context(&args))
        .unwrap_or_else(|e| {
            eprintln!("Failed to create {} driver: {e}", amqp::NAME);
            std::process::exit(1);
        });

    let source = if args.stderr {
        LogSource::Stderr
    } else {
        LogSource::Stdout
    };
    info!("Shipping {source} lines via the {} driver", driver.name());

    let lines = spawn_reader();
    let mut shipped = 0u64;
    let mut failed = 0u64;
    while !shutdown.load(Ordering::Relaxed) {
        match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => match driver.log(&LogMessage::new(line, source)) {
                Ok(()) => shipped += 1,
                Err(e) => {
                    failed += 1;
                    error!("{e}");
                }
            },
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("Stopping after {shipped} lines ({failed} failed)");
    if let Err(e) = driver.close() {
        error!("Failed to close driver: {e}");
        std::process::exit(1);
    }
}
