use serde::Serialize;
use std::fmt;

/// Command reply, shaped like a RESP value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Null,
    Integer(i64),
    Bulk(String),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn bulk(s: impl Into<String>) -> Self {
        Reply::Bulk(s.into())
    }

    /// Elements of an array reply, empty for anything else
    pub fn as_array(&self) -> &[Reply] {
        match self {
            Reply::Array(items) => items,
            _ => &[],
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Reply::Bulk(s) => Some(s),
            _ => None,
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Reply::Null => write!(f, "(nil)"),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(s) => write!(f, "\"{}\"", s),
            Reply::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Reply::Array(items) => {
                let width = items.len().to_string().len();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                        write!(f, "{:indent$}", "", indent = depth * (width + 2))?;
                    }
                    write!(f, "{:>width$}) ", i + 1, width = width)?;
                    item.write_indented(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

/// Renders like redis-cli output
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let reply = Reply::Array(vec![Reply::Array(vec![
            Reply::bulk("name"),
            Reply::bulk("Alice"),
            Reply::bulk("email"),
            Reply::Null,
        ])]);
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"[["name","Alice","email",null]]"#
        );
        assert_eq!(serde_json::to_string(&Reply::Integer(3)).unwrap(), "3");
    }

    #[test]
    fn test_display() {
        assert_eq!(Reply::Integer(1).to_string(), "(integer) 1");
        assert_eq!(Reply::Array(vec![]).to_string(), "(empty array)");
        assert_eq!(
            Reply::Array(vec![Reply::bulk("a"), Reply::Null]).to_string(),
            "1) \"a\"\n2) (nil)"
        );
    }

    #[test]
    fn test_accessors() {
        let reply = Reply::Array(vec![Reply::bulk("k")]);
        assert_eq!(reply.as_array()[0].as_str(), Some("k"));
        assert_eq!(Reply::Integer(2).as_integer(), Some(2));
        assert!(Reply::Null.as_array().is_empty());
    }
}
