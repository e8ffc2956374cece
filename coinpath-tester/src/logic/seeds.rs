use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Widest seed range accepted from a single `a..b` token.
const MAX_RANGE_LEN: u64 = 10_000;

/// Resolve CLI seed tokens into a deduplicated, ordered seed list.
///
/// Accepts decimal integers (negative values use their magnitude), `0x` hex
/// literals, and ranges written `a..b` (exclusive) or `a..=b` (inclusive).
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        for seed in expand_token(token)? {
            if seen.insert(seed) {
                seeds.push(seed);
            }
        }
    }

    if seeds.is_empty() {
        bail!("no seeds given");
    }
    Ok(seeds)
}

fn expand_token(token: &str) -> Result<Vec<u64>> {
    if let Some((start, end)) = token.split_once("..") {
        let (end, inclusive) = match end.strip_prefix('=') {
            Some(end) => (end, true),
            None => (end, false),
        };
        let start = parse_seed(start)?;
        let end = parse_seed(end)?;
        let end = if inclusive {
            end.checked_add(1)
                .with_context(|| format!("seed range {token} overflows"))?
        } else {
            end
        };
        if end <= start {
            bail!("seed range {token} is empty");
        }
        if end - start > MAX_RANGE_LEN {
            bail!("seed range {token} spans more than {MAX_RANGE_LEN} seeds");
        }
        return Ok((start..end).collect());
    }
    Ok(vec![parse_seed(token)?])
}

fn parse_seed(token: &str) -> Result<u64> {
    let token = token.trim();
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        let hex = hex.replace('_', "");
        return u64::from_str_radix(&hex, 16)
            .with_context(|| format!("Unrecognized seed token: {token}"));
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    token
        .parse::<u64>()
        .with_context(|| format!("Unrecognized seed token: {token}"))
}
