use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use scorebridge_selector::{ObserveTarget, ScoreResolver};
use serde_json::json;

use super::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ProbeArgs {
    /// HTML snapshot of the match page
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn cmd_probe(args: ProbeArgs, ctx: &CliContext) -> Result<()> {
    let html = tokio::fs::read_to_string(&args.page)
        .await
        .with_context(|| format!("Failed to read page {}", args.page.display()))?;
    let resolver =
        ScoreResolver::new(&ctx.config().selectors).context("Invalid selector configuration")?;
    let resolved = resolver.resolve_html(&html);
    let observe = match resolver.observe_target_html(&html) {
        ObserveTarget::Container(selector) => selector,
        ObserveTarget::Body => "body".to_string(),
    };

    if args.json {
        let value = match &resolved {
            Some(score) => json!({
                "found": true,
                "team_a": score.team_a,
                "team_b": score.team_b,
                "tier": score.tier,
                "observe": observe,
            }),
            None => json!({ "found": false, "observe": observe }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match resolved {
        Some(score) => println!(
            "{} - {} ({} tier)",
            score.team_a,
            score.team_b,
            score.tier.name()
        ),
        None => println!("no score pair found"),
    }
    println!("observing: {observe}");
    Ok(())
}
