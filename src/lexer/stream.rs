use std::collections::VecDeque;

use crate::lexer::token::Token;
use crate::lexer::Lexer;
use crate::parser::ParseError;

/// Buffered lookahead over the lexer. Tokens are pulled lazily; lex errors
/// surface through `read`/`peek` unchanged.
pub struct TokenStream {
    lexer: Lexer,
    queue: VecDeque<Token>,
}

impl TokenStream {
    pub fn new(lexer: Lexer) -> Self {
        TokenStream {
            lexer,
            queue: VecDeque::new(),
        }
    }

    pub fn read(&mut self) -> Result<Token, ParseError> {
        self.fill(1)?;
        Ok(self.queue.pop_front().unwrap())
    }

    pub fn peek(&mut self, position: usize) -> Result<&Token, ParseError> {
        self.fill(position + 1)?;
        Ok(&self.queue[position])
    }

    fn fill(&mut self, amount: usize) -> Result<(), ParseError> {
        while self.queue.len() < amount {
            let token = self.lexer.read()?;
            self.queue.push_back(token);
        }
        Ok(())
    }
}
