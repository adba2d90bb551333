//! Command-line entry point: `pathcap <config.json>`.

use std::process::ExitCode;

use pathcap::CaptureConfig;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("usage: pathcap <config.json>");
        return ExitCode::from(2);
    };

    let result = CaptureConfig::load(&config_path).and_then(|config| pathcap::run(&config));
    match result {
        Ok(summary) => {
            log::info!(
                "Capture complete: {} frames, {} features",
                summary.frames_written,
                summary.features_completed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
