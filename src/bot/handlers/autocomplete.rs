//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggests valid values as the user types, so that category parameters rarely fail
//! validation.

use crate::{bot::BotData, core::report, errors::Error};

/// Provides autocomplete suggestions for category names.
///
/// Returns every category whose name contains the partial input, in declaration
/// order. There are fewer categories than Discord's 25-suggestion limit.
pub async fn autocomplete_category(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching_categories(partial)
}

fn matching_categories(partial: &str) -> Vec<String> {
    let partial_lower = partial.trim().to_lowercase();
    report::categories()
        .iter()
        .map(|category| category.as_str())
        .filter(|name| name.contains(&partial_lower))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_categories() {
        assert_eq!(matching_categories("").len(), 13);
        assert_eq!(matching_categories("FO"), vec!["food".to_string()]);
        assert_eq!(
            matching_categories("t"),
            vec![
                "transfer",
                "payment",
                "rent",
                "transport",
                "entertainment",
                "healthcare",
                "utilities",
                "other",
            ]
        );
        assert!(matching_categories("xyz").is_empty());
    }
}
