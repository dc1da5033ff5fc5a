use std::{io::Write, time::Duration};

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use super::format::thousands;
use crate::rest::PlanSource;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExactCounts {
    /// Providers with at least one row, in the order they were asked for.
    pub counts: Vec<(String, u64)>,
    pub total: u64,
}

pub async fn count_providers<S, P>(source: &S, providers: &[P]) -> Result<ExactCounts>
where
    S: PlanSource,
    P: AsRef<str>,
{
    let pb = ProgressBar::new(providers.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    count_with_progress(source, providers, &pb).await
}

/// Counts each provider, clearing `pb` once done whether or not a request failed.
async fn count_with_progress<S, P>(
    source: &S,
    providers: &[P],
    pb: &ProgressBar,
) -> Result<ExactCounts>
where
    S: PlanSource,
    P: AsRef<str>,
{
    let result = count_each(source, providers, pb).await;
    pb.finish_and_clear();

    let result = result?;
    info!(
        "{} of {} providers have plans",
        result.counts.len(),
        providers.len()
    );

    Ok(result)
}

async fn count_each<S, P>(source: &S, providers: &[P], pb: &ProgressBar) -> Result<ExactCounts>
where
    S: PlanSource,
    P: AsRef<str>,
{
    let mut result = ExactCounts::default();

    for provider in providers {
        let provider = provider.as_ref();
        pb.set_message(provider.to_string());

        let count = source.count_exact(provider).await?;
        debug!("{}: {}", provider, count);
        pb.inc(1);

        if count > 0 {
            result.total += count;
            result.counts.push((provider.to_string(), count));
        }
    }

    Ok(result)
}

pub fn print_exact_counts<W: Write>(out: &mut W, counts: &ExactCounts) -> Result<()> {
    writeln!(out, "{}", "=== PROVIDERS WITH BROADBAND LABELS ===".bold())?;
    for (provider, count) in &counts.counts {
        writeln!(out, "  ✅ {}: {}", provider, thousands(*count).green())?;
    }

    writeln!(out)?;
    writeln!(out, "Total: {} plans", thousands(counts.total).bold())?;

    Ok(())
}
