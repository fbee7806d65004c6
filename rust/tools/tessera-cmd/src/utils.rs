//! Common utilities for tessera-cmd

use anyhow::{Context, Result};
use serde::Serialize;

/// Parses a comma-separated shape such as `2,3,4`. An empty string is a scalar shape.
pub fn parse_dims(s: &str) -> Result<Vec<u64>> {
    split_list(s)
        .map(|d| {
            d.parse::<u64>()
                .with_context(|| format!("Invalid dimension: '{d}'"))
        })
        .collect()
}

/// Parses a comma-separated list of numbers.
pub fn parse_values<T>(s: &str) -> Result<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    split_list(s)
        .map(|v| v.parse::<T>().with_context(|| format!("Invalid value: '{v}'")))
        .collect()
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty())
}

/// Writes `value` to stdout as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Formats an address the way the library logs it.
pub fn format_address(address: usize) -> String {
    format!("{address:#x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dims() {
        assert_eq!(parse_dims("2, 3,4").unwrap(), vec![2, 3, 4]);
        assert!(parse_dims("").unwrap().is_empty());
        assert!(parse_dims("2,x").is_err());
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values::<f32>("1.5,-2").unwrap(), vec![1.5, -2.0]);
        assert!(parse_values::<i32>("1,2.5").is_err());
    }
}
