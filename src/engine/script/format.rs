//! Python literal rendering for generated scripts.

use std::path::Path;

/// A value that can be written as a Python literal or expression
pub trait PyLiteral {
    fn py(&self) -> String;
}

impl PyLiteral for bool {
    fn py(&self) -> String {
        if *self { "True" } else { "False" }.to_string()
    }
}

impl PyLiteral for i32 {
    fn py(&self) -> String {
        self.to_string()
    }
}

impl PyLiteral for i64 {
    fn py(&self) -> String {
        self.to_string()
    }
}

impl PyLiteral for u64 {
    fn py(&self) -> String {
        self.to_string()
    }
}

impl PyLiteral for f64 {
    fn py(&self) -> String {
        py_float(*self)
    }
}

impl PyLiteral for &str {
    fn py(&self) -> String {
        py_string(self)
    }
}

impl PyLiteral for String {
    fn py(&self) -> String {
        py_string(self)
    }
}

/// Raw Python expression, written as-is
#[derive(Debug, Clone, PartialEq)]
pub struct Expr(pub String);

impl PyLiteral for Expr {
    fn py(&self) -> String {
        self.0.clone()
    }
}

/// Shortest float literal with at most four decimals, always with a point
pub fn py_float(value: f64) -> String {
    if !value.is_finite() {
        return "0.0".to_string();
    }
    if value.fract() == 0.0 {
        return format!("{:.1}", value);
    }
    let formatted = format!("{:.4}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        format!("{}.0", trimmed)
    }
}

/// Double-quoted Python string literal
pub fn py_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn py_path(path: &Path) -> String {
    py_string(&path.to_string_lossy())
}

/// `clip = func(clip, name=value, ...)` builder.
#[derive(Debug, Clone)]
pub struct Call {
    func: String,
    args: Vec<String>,
}

impl Call {
    /// Call taking the current clip as its first positional argument
    pub fn on_clip(func: &str) -> Self {
        Self {
            func: func.to_string(),
            args: vec!["clip".to_string()],
        }
    }

    /// Call without positional arguments
    pub fn bare(func: &str) -> Self {
        Self {
            func: func.to_string(),
            args: Vec::new(),
        }
    }

    pub fn kw(mut self, name: &str, value: impl PyLiteral) -> Self {
        self.args.push(format!("{}={}", name, value.py()));
        self
    }

    pub fn kw_opt<T: PyLiteral>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.kw(name, value),
            None => self,
        }
    }

    /// Keyword argument written only when `value` differs from `default`
    pub fn kw_unless<T: PyLiteral + PartialEq>(self, name: &str, value: T, default: T) -> Self {
        if value == default {
            self
        } else {
            self.kw(name, value)
        }
    }

    pub fn expr(&self) -> String {
        format!("{}({})", self.func, self.args.join(", "))
    }

    /// Statement rebinding `clip` to the call's result
    pub fn assign(&self) -> String {
        format!("clip = {}", self.expr())
    }
}
