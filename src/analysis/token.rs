use serde::{Serialize, Deserialize};

/// One analyzed term of a text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: u32,     // ordinal among the field's tokens, for phrase matching
    pub offset: usize,     // byte offset in the original text
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize) -> Self {
        Token { text, position, offset }
    }
}
