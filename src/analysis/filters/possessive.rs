use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Strips a trailing English possessive: `fox's` -> `fox`.
pub struct PossessiveFilter;

const SUFFIXES: [&str; 3] = ["'s", "\u{2019}s", "\u{ff07}s"];

impl TokenFilter for PossessiveFilter {
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for token in &mut tokens {
            let lower = token.text.to_lowercase();
            if let Some(suffix) = SUFFIXES.iter().find(|s| lower.ends_with(*s)) {
                let keep = token.text.len() - suffix.len();
                if keep > 0 && token.text.is_char_boundary(keep) {
                    token.text.truncate(keep);
                }
            }
        }
        tokens
    }

    fn name(&self) -> &str {
        "possessive"
    }
}
