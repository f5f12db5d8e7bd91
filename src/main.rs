/*
 *  main.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Process shell: CLI, logging, startup, signal handling and shutdown
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info, warn};
use tokio::sync::watch;

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{signal, SignalKind};

use paperpi::cache::CacheStore;
use paperpi::config::{self, Cli, Config};
use paperpi::constants::{APP_NAME, DEFAULT_SNAPSHOT_KEEP, SHUTDOWN_GRACE_SECONDS, URL, VERSION};
use paperpi::display::{DisplaySink, ScreenFactory};
use paperpi::engine::{self, EngineSettings, RotationEngine};
use paperpi::plugin::builtin::splash_screen::splash_entry;
use paperpi::plugin::registry::UnitEnvironment;
use paperpi::plugin::{PluginRegistry, UpdateOutcome};
use paperpi::snapshot::{SnapshotStore, UnitSnapshot};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("{} {} built {} for {}\n{}", APP_NAME, VERSION, BUILD_DATE, BUILD_TARGET, URL);
        return ExitCode::SUCCESS;
    }

    let registry = PluginRegistry::builtin();
    if let Some(code) = informational(&cli, &registry) {
        return code;
    }

    let config = match config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: configuration error: {}", APP_NAME, e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dump_config {
        return match config.to_yaml() {
            Ok(yaml) => {
                print!("{}", yaml);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: could not dump config: {}", APP_NAME, e);
                ExitCode::FAILURE
            }
        };
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(config.main.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", APP_NAME, VERSION, BUILD_DATE);

    // built by hand so abandoned plugin fetches cannot hold up the exit
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}: could not start the async runtime: {}", APP_NAME, e);
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(run(config, registry)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{}: {:#}", APP_NAME, e);
            ExitCode::FAILURE
        }
    };
    runtime.shutdown_timeout(Duration::from_secs(SHUTDOWN_GRACE_SECONDS));
    code
}

/// Flags that print something and exit without touching the screen
fn informational(cli: &Cli, registry: &PluginRegistry) -> Option<ExitCode> {
    if cli.list_plugins {
        print!("{}", registry.listing());
        return Some(ExitCode::SUCCESS);
    }

    if let Some(name) = cli.plugin_info.as_deref() {
        return Some(match registry.describe(name) {
            Some(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("unknown plugin '{}'\n\n{}", name, registry.listing());
                ExitCode::FAILURE
            }
        });
    }

    if let Some(args) = cli.run_plugin_func.as_deref() {
        let Some((target, rest)) = args.split_first() else {
            eprintln!("--run-plugin-func needs PLUGIN.FUNCTION");
            return Some(ExitCode::FAILURE);
        };
        return Some(match registry.run_helper(target, rest) {
            Ok(out) => {
                println!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{:#}", e);
                ExitCode::FAILURE
            }
        });
    }

    None
}

async fn run(config: Config, registry: PluginRegistry) -> anyhow::Result<()> {
    let display_config = config.main.display_config();
    let mut screen = ScreenFactory::create_from_config(&display_config)
        .with_context(|| format!("could not initialise the '{}' display", display_config.display_type))?;
    info!(
        "screen '{}' {:?} mode {}",
        display_config.display_type,
        screen.resolution(),
        display_config.effective_mode().as_str()
    );

    let cache_config = config.main.cache.clone().unwrap_or_default();
    let cache = Arc::new(CacheStore::new(cache_config.path.clone()).context("could not create the file cache")?);
    if let Some(age) = cache_config.max_age_seconds {
        cache.evict_older_than(Duration::from_secs(age), "");
    }

    let env = UnitEnvironment {
        resolution: screen.resolution(),
        screen_mode: display_config.effective_mode(),
        timeout: config.main.plugin_timeout(),
        cache: Some(Arc::clone(&cache)),
    };

    if config.main.splash() {
        show_splash(&registry, &env, screen.as_mut()).await;
    }

    let units = registry.build_units(&config.active_plugins(), &env);
    if units.is_empty() {
        cache.cleanup();
        bail!("no plugins could be loaded, check the plugins section of the configuration");
    }

    let snapshots = snapshot_store(&config);
    if let Some(store) = snapshots.as_ref() {
        for unit in &units {
            match store.load_latest(unit.name()) {
                Ok(Some(previous)) => debug!("'{}' last snapshot taken {}", unit.name(), previous.taken_at),
                Ok(None) => {}
                Err(e) => warn!("ignoring snapshot for '{}': {}", unit.name(), e),
            }
        }
    }

    let mut engine = RotationEngine::new(
        units,
        EngineSettings {
            max_refresh: config.main.max_refresh(),
            inactive_priority: config.main.inactive_priority(),
        },
    );

    let (tx, rx) = watch::channel(false);
    let signals = tokio::spawn(async move {
        if let Err(e) = signal_handler().await {
            error!("signal handling failed: {}", e);
        }
        tx.send(true).ok();
    });

    engine::run(&mut engine, screen.as_mut(), config.main.tick(), rx).await;
    signals.abort();

    info!("{} exiting, cleaning up", APP_NAME);
    if let Some(store) = snapshots.as_ref() {
        for unit in engine.units() {
            if let Err(e) = store.write(&UnitSnapshot::from_unit(unit)) {
                warn!("could not snapshot '{}': {}", unit.name(), e);
            }
        }
    }
    cache.cleanup();

    if config.main.no_wipe() {
        info!("leaving the last image on screen");
    } else if let Err(e) = screen.clear() {
        warn!("could not clear the screen on exit: {}", e);
    }
    Ok(())
}

async fn show_splash(registry: &PluginRegistry, env: &UnitEnvironment, screen: &mut dyn DisplaySink) {
    let mut splash = match registry.build_unit(&splash_entry(), env) {
        Ok(unit) => unit,
        Err(e) => {
            warn!("no splash screen: {}", e);
            return;
        }
    };
    if splash.force_update().await == UpdateOutcome::Changed {
        if let Err(e) = screen.write(splash.image()) {
            warn!("could not show the splash screen: {}", e);
        }
    }
}

fn snapshot_store(config: &Config) -> Option<SnapshotStore> {
    let snapshot = config.main.snapshot.clone().unwrap_or_default();
    if !snapshot.enabled.unwrap_or(false) {
        return None;
    }
    let dir = snapshot
        .dir
        .unwrap_or_else(|| std::env::temp_dir().join("paperpi_snapshots"));
    Some(SnapshotStore::new(dir, snapshot.keep.unwrap_or(DEFAULT_SNAPSHOT_KEEP)))
}

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
#[cfg(unix)]
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        },
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        },
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}
