use regex::Regex;

/// Values captured from `:name` and `*` segments of a matched route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(String, String)>> for PathParams {
    fn from(value: Vec<(String, String)>) -> Self {
        Self(value)
    }
}

/// Compiled route pattern.
///
/// `:name` matches one segment, `*` matches anything. Matching is case
/// insensitive and tolerates a trailing slash. A non-`end` pattern matches
/// any path that starts with it on a segment boundary.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    keys: Vec<String>,
}

impl PathPattern {
    pub fn new(path: &str, end: bool) -> Result<Self, regex::Error> {
        let trimmed = path.trim_end_matches('/');
        let mut pattern = String::from("(?i)^");
        let mut keys = Vec::new();
        let mut wildcards = 0;
        let mut chars = trimmed.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                ':' => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if next.is_alphanumeric() || next == '_' {
                            name.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if name.is_empty() {
                        pattern.push(':');
                    } else {
                        keys.push(name);
                        pattern.push_str("([^/]+?)");
                    }
                }
                '*' => {
                    keys.push(wildcards.to_string());
                    wildcards += 1;
                    pattern.push_str("(.*)");
                }
                other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        pattern.push_str(if end { "/?$" } else { "(?:/|$)" });

        Ok(Self {
            source: path.to_string(),
            regex: Regex::new(&pattern)?,
            keys,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(path)?;
        let params = self
            .keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| {
                captures
                    .get(i + 1)
                    .map(|m| (key.clone(), m.as_str().to_string()))
            })
            .collect::<Vec<_>>();
        Some(PathParams(params))
    }
}

pub fn add_leading_slash(path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

pub fn strip_end_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Joins path fragments into one route path, e.g. `("api", "cats", ":id")`
/// becomes `/api/cats/:id`. Never returns an empty string.
pub fn join_paths(parts: &[&str]) -> String {
    let mut joined = String::new();
    for part in parts {
        let part = part.trim_matches('/');
        if !part.is_empty() {
            joined.push('/');
            joined.push_str(part);
        }
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_params() {
        let pattern = PathPattern::new("/cats/:id/owners/:owner_id", true).unwrap();
        let params = pattern.captures("/cats/7/owners/42").unwrap();
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("owner_id"), Some("42"));
        assert!(pattern.captures("/cats/7").is_none());
    }

    #[test]
    fn test_end_and_prefix_matching() {
        let exact = PathPattern::new("/cats", true).unwrap();
        assert!(exact.is_match("/cats"));
        assert!(exact.is_match("/cats/"));
        assert!(exact.is_match("/CATS"));
        assert!(!exact.is_match("/cats/1"));

        let prefix = PathPattern::new("/cats", false).unwrap();
        assert!(prefix.is_match("/cats/1"));
        assert!(!prefix.is_match("/catsup"));

        let root = PathPattern::new("/", false).unwrap();
        assert!(root.is_match("/anything/at/all"));
    }

    #[test]
    fn test_wildcards() {
        let pattern = PathPattern::new("/api*", false).unwrap();
        assert!(pattern.is_match("/api/cats"));
        let params = PathPattern::new("/files/*", true)
            .unwrap()
            .captures("/files/a/b.txt")
            .unwrap();
        assert_eq!(params.get("0"), Some("a/b.txt"));
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths(&["api", "cats/", ":id"]), "/api/cats/:id");
        assert_eq!(join_paths(&["", "/"]), "/");
        assert_eq!(join_paths(&["", "cats", ""]), "/cats");
        assert_eq!(add_leading_slash("cats"), "/cats");
        assert_eq!(strip_end_slash("/cats/"), "/cats");
    }
}
