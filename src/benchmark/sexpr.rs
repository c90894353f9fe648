//! Minimal, forgiving S-expression reader for solver models
//!
//! Solver output is not always well formed (truncated on timeout, mixed
//! with diagnostics), so the reader never fails: unbalanced input is closed
//! at end of text and stray closing parentheses are dropped.

/// S-expression node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexp {
    /// Symbol, keyword or numeral
    Atom(String),
    /// String literal with SMT-LIB `""` escapes decoded
    Str(String),
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom(a) => Some(a),
            _ => None,
        }
    }

    /// Canonical single-line rendering
    pub fn render(&self) -> String {
        match self {
            Sexp::Atom(a) => a.clone(),
            Sexp::Str(s) => format!("\"{}\"", s.replace('"', "\"\"")),
            Sexp::List(items) => {
                let inner: Vec<String> = items.iter().map(Sexp::render).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}

/// A `define-fun` assignment found in a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: Sexp,
}

impl Binding {
    /// Value as model text: string literals decoded, everything else rendered
    pub fn value_text(&self) -> String {
        match &self.value {
            Sexp::Str(s) => s.clone(),
            other => other.render(),
        }
    }
}

/// Parse every top-level form in `text`
pub fn parse_all(text: &str) -> Vec<Sexp> {
    let mut stack: Vec<Vec<Sexp>> = vec![Vec::new()];
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                chars.next();
                stack.push(Vec::new());
            }
            ')' => {
                chars.next();
                if stack.len() > 1 {
                    let list = stack.pop().unwrap_or_default();
                    push(&mut stack, Sexp::List(list));
                }
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                while let Some(c) = chars.next() {
                    if c == '"' {
                        if chars.peek() == Some(&'"') {
                            chars.next();
                            s.push('"');
                        } else {
                            break;
                        }
                    } else {
                        s.push(c);
                    }
                }
                push(&mut stack, Sexp::Str(s));
            }
            '|' => {
                chars.next();
                let mut s = String::from("|");
                for c in chars.by_ref() {
                    s.push(c);
                    if c == '|' {
                        break;
                    }
                }
                push(&mut stack, Sexp::Atom(s));
            }
            _ => {
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';') {
                        break;
                    }
                    atom.push(c);
                    chars.next();
                }
                push(&mut stack, Sexp::Atom(atom));
            }
        }
    }

    while stack.len() > 1 {
        let list = stack.pop().unwrap_or_default();
        push(&mut stack, Sexp::List(list));
    }
    stack.pop().unwrap_or_default()
}

fn push(stack: &mut [Vec<Sexp>], node: Sexp) {
    if let Some(top) = stack.last_mut() {
        top.push(node);
    }
}

/// Collect every `define-fun` binding, depth first, in order of appearance
pub fn bindings(forms: &[Sexp]) -> Vec<Binding> {
    let mut out = Vec::new();
    for form in forms {
        collect(form, &mut out);
    }
    out
}

fn collect(node: &Sexp, out: &mut Vec<Binding>) {
    let Sexp::List(items) = node else {
        return;
    };
    if items.first().and_then(Sexp::as_atom) == Some("define-fun") && items.len() >= 5 {
        if let (Some(name), Some(value)) = (items[1].as_atom(), items.last()) {
            out.push(Binding {
                name: name.to_string(),
                value: value.clone(),
            });
            return;
        }
    }
    for item in items {
        collect(item, out);
    }
}
