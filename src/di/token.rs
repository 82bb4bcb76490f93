use std::borrow::Cow;
use std::fmt;

/// Injection token identifying a provider inside a module.
///
/// Type tokens are derived from `std::any::type_name`, which also works for
/// trait objects (`Token::of::<dyn Repository>()`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(Cow<'static, str>);

impl Token {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human readable name with module paths stripped from the outermost type.
    pub fn name(&self) -> String {
        short_name(&self.0)
    }
}

pub(crate) fn short_name(full: &str) -> String {
    let (head, tail) = match full.find('<') {
        Some(pos) => full.split_at(pos),
        None => (full, ""),
    };
    let (prefix, path) = match head.strip_prefix("dyn ") {
        Some(rest) => ("dyn ", rest),
        None => ("", head),
    };
    let last = path.rsplit("::").next().unwrap_or(path);
    format!("{prefix}{last}{tail}")
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

impl From<&'static str> for Token {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}
