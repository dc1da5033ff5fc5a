use std::{cmp::Reverse, io::Write};

use anyhow::Result;
use colored::Colorize;
use indexmap::IndexMap;

use super::format::thousands;
use crate::{providers::Candidate, rest::NULL_NAME};

/// Provider name to row count, in the order names were first seen.
pub type ProviderTally = IndexMap<String, u64>;

/// How many of a candidate's name tokens must appear among the fetched names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MatchPolicy {
    /// Present if any token matches.
    #[default]
    Any,

    /// Present only if every token matches.
    All,
}

pub fn tally<I, S>(names: I) -> ProviderTally
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut counts = ProviderTally::new();
    for name in names {
        counts
            .entry(name.into())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }
    counts
}

/// Highest count first, ties in the order they were first seen.
pub fn sorted_counts(tally: &ProviderTally) -> Vec<(&String, u64)> {
    let mut counts: Vec<(&String, u64)> = tally.iter().map(|(n, c)| (n, *c)).collect();
    counts.sort_by_key(|a| Reverse(a.1));
    counts
}

fn tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .replace('/', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Candidates whose name tokens are not found in the fetched provider names.
///
/// Matching is by substring against all fetched names lowercased and joined,
/// so a short token can match an unrelated provider.
pub fn find_missing<'a>(
    tally: &ProviderTally,
    candidates: &'a [Candidate],
    policy: MatchPolicy,
) -> Vec<&'a Candidate> {
    let haystack = tally
        .keys()
        .filter(|name| name.as_str() != NULL_NAME)
        .map(|name| name.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    candidates
        .iter()
        .filter(|candidate| {
            let parts = tokens(&candidate.name);
            if parts.is_empty() {
                return true;
            }

            let present = match policy {
                MatchPolicy::Any => parts.iter().any(|p| haystack.contains(p.as_str())),
                MatchPolicy::All => parts.iter().all(|p| haystack.contains(p.as_str())),
            };
            !present
        })
        .collect()
}

pub fn print_report<W: Write>(
    out: &mut W,
    tally: &ProviderTally,
    missing: &[&Candidate],
) -> Result<()> {
    writeln!(out, "{}", "=== PROVIDERS WITH BROADBAND LABELS ===".bold())?;
    for (name, count) in sorted_counts(tally) {
        writeln!(out, "  ✅ {}: {} plans", name, thousands(count).green())?;
    }

    let total: u64 = tally.values().sum();
    writeln!(out)?;
    writeln!(out, "Total: {} plans", thousands(total).bold())?;

    writeln!(out)?;
    writeln!(out, "{}", "=== MAJOR ISPs MISSING LABELS ===".bold())?;
    for candidate in missing {
        writeln!(out, "  ❌ {} - {}", candidate.name.red(), candidate.note)?;
    }

    Ok(())
}
