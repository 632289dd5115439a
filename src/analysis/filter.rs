use crate::analysis::token::Token;

pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;

    /// Applied to prefix and wildcard patterns, which skip the token pipeline.
    /// Only filters that keep a term recognizable under a pattern override this.
    fn normalize(&self, pattern: String) -> String {
        pattern
    }

    fn name(&self) -> &str;
}
