//! Safe arithmetic evaluation.
//!
//! A small recursive-descent parser over numbers, `+ - * / % **`,
//! parentheses, the constants `pi` and `e`, and an allow-list of functions.
//! Nothing is ever executed beyond that grammar.

use triage_core::{AppError, AppResult};

const MAX_DEPTH: usize = 64;

/// Evaluates a normalized arithmetic expression.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str) -> AppResult<f64>;
}

/// Grammar-restricted evaluator.
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/' | '%') unary)*
/// unary   := ('+' | '-') unary | power
/// power   := primary ('**' unary)?
/// primary := number | name | name '(' args ')' | '(' expr ')'
/// ```
///
/// Names may carry a `math.` prefix. Functions: `sqrt`, `abs`, `pow`,
/// `round`. Constants: `pi`, `e`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafeEvaluator;

impl ExpressionEvaluator for SafeEvaluator {
    fn evaluate(&self, expression: &str) -> AppResult<f64> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };

        let value = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(syntax_error());
        }

        if !value.is_finite() {
            return Err(AppError::Evaluation(
                "numerical result out of range".to_string(),
            ));
        }

        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
}

fn syntax_error() -> AppError {
    AppError::Evaluation("invalid syntax".to_string())
}

fn tokenize(input: &str) -> AppResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            _ if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent only when digits follow, so "2e" stays 2 * e
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal.parse::<f64>().map_err(|_| syntax_error())?;
                tokens.push(Token::Number(value));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::StarStar);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '+' | '-' | '/' | '%' | '(' | ')' | ',' => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
                i += 1;
            }
            _ => return Err(syntax_error()),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> AppResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(syntax_error())
        }
    }

    fn enter(&mut self) -> AppResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(AppError::Evaluation(
                "expression too deeply nested".to_string(),
            ));
        }
        Ok(())
    }

    fn expr(&mut self) -> AppResult<f64> {
        let mut value = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                value += self.term()?;
            } else if self.eat(&Token::Minus) {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> AppResult<f64> {
        let mut value = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                value *= self.unary()?;
            } else if self.eat(&Token::Slash) {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(AppError::Evaluation("division by zero".to_string()));
                }
                value /= rhs;
            } else if self.eat(&Token::Percent) {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(AppError::Evaluation("modulo by zero".to_string()));
                }
                // Result takes the sign of the divisor
                value -= rhs * (value / rhs).floor();
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> AppResult<f64> {
        self.enter()?;
        let value = if self.eat(&Token::Minus) {
            -self.unary()?
        } else if self.eat(&Token::Plus) {
            self.unary()?
        } else {
            self.power()?
        };
        self.depth -= 1;
        Ok(value)
    }

    fn power(&mut self) -> AppResult<f64> {
        let base = self.primary()?;
        if self.eat(&Token::StarStar) {
            let exponent = self.unary()?;
            return power(base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> AppResult<f64> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(value)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let value = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(value)
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                let bare = name.strip_prefix("math.").unwrap_or(&name).to_string();
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    call(&bare, &args)
                } else {
                    constant(&bare)
                }
            }
            _ => Err(syntax_error()),
        }
    }

    fn arguments(&mut self) -> AppResult<Vec<f64>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(args);
        }
    }
}

fn power(base: f64, exponent: f64) -> AppResult<f64> {
    if base == 0.0 && exponent < 0.0 {
        return Err(AppError::Evaluation(
            "0.0 cannot be raised to a negative power".to_string(),
        ));
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(AppError::Evaluation("math domain error".to_string()));
    }
    Ok(base.powf(exponent))
}

fn constant(name: &str) -> AppResult<f64> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => Err(AppError::Evaluation(format!(
            "name '{}' is not defined",
            name
        ))),
    }
}

fn call(name: &str, args: &[f64]) -> AppResult<f64> {
    let arity = |expected: &str| {
        AppError::Evaluation(format!("{}() takes {} argument(s)", name, expected))
    };

    match name {
        "sqrt" => match args {
            [x] if *x < 0.0 => Err(AppError::Evaluation("math domain error".to_string())),
            [x] => Ok(x.sqrt()),
            _ => Err(arity("exactly one")),
        },
        "abs" | "fabs" => match args {
            [x] => Ok(x.abs()),
            _ => Err(arity("exactly one")),
        },
        "pow" => match args {
            [base, exponent] => power(*base, *exponent),
            _ => Err(arity("exactly two")),
        },
        "round" => match args {
            [x] => Ok(x.round_ties_even()),
            [x, digits] => {
                let factor = 10f64.powi(*digits as i32);
                Ok((x * factor).round_ties_even() / factor)
            }
            _ => Err(arity("one or two")),
        },
        _ => Err(AppError::Evaluation(format!(
            "name '{}' is not defined",
            name
        ))),
    }
}
