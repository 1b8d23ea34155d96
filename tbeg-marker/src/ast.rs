//! PURPOSE: The parsed-but-not-yet-resolved shape of a marker expression.
//! CONTEXT: `parser.rs` builds these from a token stream; `resolve.rs` turns
//! them into the `CellContent` variants the rest of the pipeline consumes.

/// A single marker argument: `value` alone (positional) or `key=value`
/// (named).
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub key: Option<String>,
    pub value: ArgValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Ident(String),
    Number(f64),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Ident(s) => Some(s),
            ArgValue::Number(_) => None,
        }
    }
}

/// A dotted name (`obj.path.to.field`) or a call-like marker
/// (`repeat(collection, range, ...)`).
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerExpr {
    /// Bare name or dotted path, no parentheses: `${name}`, `${it.name}`.
    Path(Vec<String>),
    /// `name(args...)`.
    Call { name: String, args: Vec<Arg> },
}
