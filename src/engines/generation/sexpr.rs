use crate::error::{PicEvolveError, Result};

/// Nested token structure of genome text
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c == '(' || c == ')' || c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
            if !c.is_whitespace() {
                tokens.push(&text[i..i + 1]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

/// Read exactly one expression from `text`
pub fn parse(text: &str) -> Result<SExpr> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Err(PicEvolveError::MalformedGenome("empty genome".to_string()));
    }

    // Open lists waiting for their closing paren
    let mut stack: Vec<Vec<SExpr>> = Vec::new();
    let mut finished: Option<SExpr> = None;

    for token in tokens {
        if finished.is_some() {
            return Err(PicEvolveError::MalformedGenome(format!(
                "unexpected trailing token '{}'",
                token
            )));
        }
        match token {
            "(" => stack.push(Vec::new()),
            ")" => {
                let items = stack.pop().ok_or_else(|| {
                    PicEvolveError::MalformedGenome("unbalanced ')'".to_string())
                })?;
                let list = SExpr::List(items);
                match stack.last_mut() {
                    Some(parent) => parent.push(list),
                    None => finished = Some(list),
                }
            }
            atom => {
                let atom = SExpr::Atom(atom.to_string());
                match stack.last_mut() {
                    Some(parent) => parent.push(atom),
                    None => finished = Some(atom),
                }
            }
        }
    }

    if !stack.is_empty() {
        return Err(PicEvolveError::MalformedGenome("unbalanced '('".to_string()));
    }
    finished.ok_or_else(|| PicEvolveError::MalformedGenome("empty genome".to_string()))
}
