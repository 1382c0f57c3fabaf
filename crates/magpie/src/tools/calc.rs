use serde::{Deserialize, Serialize};

use crate::errors::{AgentError, AgentResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalcResult {
    pub value: f64,
}

/// Evaluate an arithmetic expression with a restricted recursive descent
/// parser. Only numeric literals, parentheses, unary minus and the
/// `+ - * / % ^` operators are accepted; any other input fails to parse.
pub fn calculate(expression: &str) -> AgentResult<CalcResult> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(AgentError::InvalidExpression(
            "empty expression".to_string(),
        ));
    }

    let mut parser = Parser::new(&tokens);
    let value = parser.parse_expression()?;
    if parser.peek().is_some() {
        return Err(AgentError::InvalidExpression(
            "unexpected trailing input".to_string(),
        ));
    }

    // Division by zero and overflow surface here rather than mid-parse.
    if !value.is_finite() {
        return Err(AgentError::InvalidExpression(
            "expression did not evaluate to a finite number".to_string(),
        ));
    }

    Ok(CalcResult { value })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Power,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> AgentResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Multiply);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Divide);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Modulo);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Power);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal.parse::<f64>().map_err(|_| {
                    AgentError::InvalidExpression(format!("invalid number literal '{}'", literal))
                })?;
                tokens.push(Token::Number(number));
            }
            c => {
                return Err(AgentError::InvalidExpression(format!(
                    "unexpected character '{}'",
                    c
                )))
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn parse_expression(&mut self) -> AgentResult<f64> {
        let mut left = self.parse_term()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.next();
                    left += self.parse_term()?;
                }
                Token::Minus => {
                    self.next();
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> AgentResult<f64> {
        let mut left = self.parse_factor()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Multiply => {
                    self.next();
                    left *= self.parse_factor()?;
                }
                Token::Divide => {
                    self.next();
                    left /= self.parse_factor()?;
                }
                Token::Modulo => {
                    self.next();
                    left %= self.parse_factor()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // Unary minus binds looser than '^', so -2^2 is -(2^2).
    fn parse_factor(&mut self) -> AgentResult<f64> {
        if let Some(Token::Minus) = self.peek() {
            self.next();
            Ok(-self.parse_factor()?)
        } else {
            self.parse_power()
        }
    }

    fn parse_power(&mut self) -> AgentResult<f64> {
        let base = self.parse_primary()?;
        if let Some(Token::Power) = self.peek() {
            self.next();
            // Right associative, and the exponent may itself be signed.
            let exponent = self.parse_factor()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn parse_primary(&mut self) -> AgentResult<f64> {
        match self.next().cloned() {
            Some(Token::Number(number)) => Ok(number),
            Some(Token::LParen) => {
                let value = self.parse_expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(AgentError::InvalidExpression(
                        "expected closing parenthesis".to_string(),
                    )),
                }
            }
            Some(token) => Err(AgentError::InvalidExpression(format!(
                "unexpected token {:?}",
                token
            ))),
            None => Err(AgentError::InvalidExpression(
                "unexpected end of expression".to_string(),
            )),
        }
    }
}
