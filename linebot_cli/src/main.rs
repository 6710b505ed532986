mod cli;
mod error_fmt;
mod logging;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use linebot_config::{Config, load_toml};

use crate::cli::{Cli, Commands, RtLock};
use crate::error_fmt::{config_error, exit_code_for_error, format_error_json, humanize};
use crate::run::RunArgs;

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| config_error(format!("reading {}: {e}", p.display())))?;
            load_toml(&text).map_err(|e| config_error(format!("parsing {}: {e}", p.display())))?
        }
        None => Config::default(),
    };
    cfg.validate().map_err(|e| config_error(format!("{e:#}")))?;
    Ok(cfg)
}

fn real_main(args: Cli) -> eyre::Result<()> {
    let cfg = load_config(args.config.as_deref())?;

    let level = args
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    logging::init(&level, args.json, &cfg.logging).map_err(|e| config_error(format!("{e:#}")))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("installing Ctrl-C handler")?;
    }

    match args.cmd {
        Commands::Run {
            track,
            max_run_ms,
            bump_after_ms,
            bump_mask,
            rt,
            rt_prio,
            rt_lock,
        } => {
            rt::setup_rt_once(rt, rt_prio, rt_lock.unwrap_or_else(RtLock::os_default));
            let report = run::run_line(
                &cfg,
                RunArgs {
                    track,
                    max_run_ms,
                    bump_after_ms,
                    bump_mask,
                },
                shutdown,
            )?;
            println!("{}", run::render_report(&report, args.json));
        }
        Commands::SelfCheck => {
            let check = run::self_check(&cfg)?;
            println!("{}", run::render_check(&check, args.json));
        }
    }
    Ok(())
}

fn main() {
    let _ = color_eyre::install();
    let args = Cli::parse();
    let json = args.json;

    if let Err(err) = real_main(args) {
        tracing::error!(error = %err, "command failed");
        if json {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}
