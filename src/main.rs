/*
 *  main.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{signal, SignalKind}; // Import specific Unix signals

use vumeter::capture::{SampleSource, StreamSource, ToneSource};
use vumeter::config::{self, Cli, Settings, SourceKind};
use vumeter::display::HeadlessSink;
use vumeter::render::{RenderHandle, spawn_render};
use vumeter::sampler::spawn_sampler;
use vumeter::{LevelMeter, StopFlag};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP and raises the stop flag.
#[cfg(unix)]
async fn signal_handler(stop: StopFlag) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    stop.raise();
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler(stop: StopFlag) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    stop.raise();
    Ok(())
}

fn open_source(settings: &Settings) -> anyhow::Result<Box<dyn SampleSource>> {
    Ok(match (settings.source, settings.input.as_deref()) {
        (SourceKind::File, Some(path)) => Box::new(
            StreamSource::open(path).with_context(|| format!("opening audio input {}", path.display()))?,
        ),
        (SourceKind::File, None) => anyhow::bail!("the file source needs audio.path or --input"),
        (SourceKind::Stdin, _) => Box::new(StreamSource::stdin()),
        (SourceKind::Tone, _) => Box::new(ToneSource::new(
            settings.sample_rate,
            settings.tone_hz,
            settings.noise,
        )),
    })
}

fn start_headless(meter: &Arc<LevelMeter>, settings: &Settings, stop: &StopFlag) -> anyhow::Result<RenderHandle> {
    let size = meter.frame_size();
    let mut sink = HeadlessSink::new(size.width, size.height);
    if let Some((path, every)) = &settings.snapshot {
        info!("snapshot every {} frames to {}", every, path.display());
        sink = sink.with_snapshots(path.clone(), *every);
    }
    Ok(spawn_render(Arc::clone(meter), sink, stop.clone())?)
}

/// Window on this thread (winit wants the main thread), render on its own.
#[cfg(feature = "emulator")]
fn run_window(meter: &Arc<LevelMeter>, stop: &StopFlag) -> anyhow::Result<u64> {
    use vumeter::display::EmulatorSink;
    use vumeter::display::emulator_window::{EmulatorWindow, EmulatorWindowConfig};

    let size = meter.frame_size();
    let sink = EmulatorSink::new(size.width, size.height);
    let state = sink.state();
    let render = spawn_render(Arc::clone(meter), sink, stop.clone())?;

    let window = EmulatorWindow::new(
        state,
        stop.clone(),
        EmulatorWindowConfig {
            title: format!("{} v{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE),
            ..EmulatorWindowConfig::default()
        },
    );
    let shown = window.run();
    render.stop();
    let frames = render.join();
    shown.context("emulator window")?;
    Ok(frames)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (merged, settings) = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        print!("{}", serde_yaml::to_string(&merged)?);
        return Ok(());
    }

    // Initialize the logger, RUST_LOG still wins over the configured level
    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("This {} worth the Squeeze", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let stop = StopFlag::new();
    let meter = Arc::new(LevelMeter::new(settings.width, settings.colours, settings.update_hz));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("starting signal runtime")?;
    {
        let stop = stop.clone();
        runtime.spawn(async move {
            if let Err(e) = signal_handler(stop).await {
                error!("signal handler failed: {}", e);
            }
        });
    }

    let source = open_source(&settings)?;
    let sampler = spawn_sampler(Arc::clone(&meter), source, settings.sampler(), stop.clone())
        .context("starting sampler thread")?;

    #[cfg(feature = "emulator")]
    let frames = if settings.window {
        run_window(&meter, &stop)?
    } else {
        start_headless(&meter, &settings, &stop)?.join()
    };

    #[cfg(not(feature = "emulator"))]
    let frames = {
        if settings.window && settings.snapshot.is_none() {
            info!("built without a window, running headless");
        }
        start_headless(&meter, &settings, &stop)?.join()
    };

    stop.raise();
    info!("{} frames rendered", frames);

    // a sampler parked on a blocking read is left to process exit
    if sampler.is_finished() {
        match sampler.join() {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("sampler ended with: {}", e),
            Err(_) => error!("sampler thread panicked"),
        }
    } else {
        info!("sampler still waiting on input, not joined");
    }

    runtime.shutdown_background();
    Ok(())
}
