//! Width normalization.
//!
//! Turns draft rows (keys carrying a [`WidthPolicy`]) into rows whose
//! widths add up exactly to the target width.
//!
//! # Remainder policy
//!
//! 1. Fixed keys, key insets and row insets are subtracted first.
//! 2. The rest is split between flexible keys by weight using integer floor
//!    division.  A key whose share falls below its minimum is pinned at the
//!    minimum and the split is redone for the others.  If the minimums alone
//!    do not fit, they are ignored for that row.
//! 3. Whatever floor division left over goes to the **last** flexible key.
//! 4. A row with no flexible key is centred: the row's leading inset gains
//!    half the leftover (rounded down) and the trailing inset the rest.
//!
//! The same inputs always produce the same widths.

use tracing::debug;

use crate::domain::configuration::LayoutConfiguration;
use crate::domain::input_set::KeyboardMode;
use crate::domain::layout::{LayoutError, LayoutRow, WidthPolicy};

/// Computes the character key width for a page.
///
/// `columns` is the largest key count over the page's non-bottom rows.  The
/// result is capped at `max_key_width`.
pub fn key_unit(total_width: u32, columns: u32, configuration: &LayoutConfiguration) -> u32 {
    if columns == 0 {
        return configuration.max_key_width;
    }
    let chrome = 2 * configuration.row_side_inset + columns * 2 * configuration.key_inset;
    let unit = total_width.saturating_sub(chrome) / columns;
    if unit < configuration.min_key_width {
        debug!(unit, columns, total_width, "key unit below configured minimum");
    }
    unit.min(configuration.max_key_width)
}

/// Assigns final widths to every key in `row` so that it spans `total_width`.
///
/// # Errors
///
/// Returns [`LayoutError::RowOverflow`] if fixed keys and insets alone exceed
/// `total_width`.
pub fn normalize_row(
    row: &mut LayoutRow,
    total_width: u32,
    mode: KeyboardMode,
    index: usize,
) -> Result<(), LayoutError> {
    let mut fixed = u64::from(row.insets.horizontal());
    let mut flexible: Vec<(usize, u32, u32)> = Vec::new();
    for (i, item) in row.items.iter().enumerate() {
        fixed += u64::from(item.insets.horizontal());
        match item.policy {
            WidthPolicy::Fixed(width) => fixed += u64::from(width),
            WidthPolicy::Flexible { weight, min } => flexible.push((i, weight, min)),
        }
    }

    let total = u64::from(total_width);
    if fixed > total {
        return Err(LayoutError::RowOverflow {
            mode,
            row: index,
            required: u32::try_from(fixed).unwrap_or(u32::MAX),
            available: total_width,
        });
    }
    let available = total - fixed;

    let Some(&(last_flexible, _, _)) = flexible.last() else {
        let leftover = u32::try_from(available).unwrap_or(u32::MAX);
        row.insets.leading += leftover / 2;
        row.insets.trailing += leftover - leftover / 2;
        return Ok(());
    };

    let shares = split_by_weight(available, &flexible);
    let assigned: u64 = shares.iter().sum();
    for (&(i, _, _), share) in flexible.iter().zip(&shares) {
        row.items[i].width = u32::try_from(*share).unwrap_or(u32::MAX);
    }
    let remainder = u32::try_from(available - assigned).unwrap_or(u32::MAX);
    row.items[last_flexible].width += remainder;
    Ok(())
}

/// Weighted split with minimum pinning; returns one share per flexible key.
fn split_by_weight(available: u64, flexible: &[(usize, u32, u32)]) -> Vec<u64> {
    let total_min: u64 = flexible.iter().map(|&(_, _, min)| u64::from(min)).sum();
    let honour_minimums = total_min <= available;
    let mut pinned = vec![false; flexible.len()];

    loop {
        let pinned_total: u64 = flexible
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| **p)
            .map(|(&(_, _, min), _)| u64::from(min))
            .sum();
        let pool = available - pinned_total;
        let weight_total: u64 = flexible
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| !**p)
            .map(|(&(_, weight, _), _)| u64::from(weight))
            .sum();

        let shares: Vec<u64> = flexible
            .iter()
            .zip(&pinned)
            .map(|(&(_, weight, min), p)| {
                if *p {
                    u64::from(min)
                } else if weight_total == 0 {
                    0
                } else {
                    pool * u64::from(weight) / weight_total
                }
            })
            .collect();

        if !honour_minimums {
            return shares;
        }
        let under = flexible
            .iter()
            .zip(&pinned)
            .zip(&shares)
            .position(|((&(_, _, min), p), share)| !*p && *share < u64::from(min));
        match under {
            Some(i) => pinned[i] = true,
            None => return shares,
        }
    }
}
