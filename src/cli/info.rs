use anyhow::Result;

use super::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();

    println!("ScoreBridge");
    println!("===========");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!();

    println!("Configuration:");
    println!("- Config File: {}", ctx.config_path().display());
    match config.storage.resolved_path() {
        Some(path) => println!("- Storage: {}", path.display()),
        None => println!("- Storage: in-memory"),
    }
    if config.channel.enabled {
        println!("- Broadcast Channel: {}", config.channel.name);
    } else {
        println!("- Broadcast Channel: disabled");
    }
    println!(
        "- Poll Interval: {}",
        humantime::format_duration(config.scheduler.update_interval)
    );
    println!(
        "- Keep-alive Interval: {}",
        humantime::format_duration(config.surface.keep_alive)
    );
    println!("- Score Selectors: {}", config.selectors.score_elements.len());
    println!(
        "- Audio: {}",
        if cfg!(feature = "rodio") {
            "rodio"
        } else {
            "silent"
        }
    );
    Ok(())
}
