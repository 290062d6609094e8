use std::collections::HashMap;

use crate::config::BindType;
use crate::error::DriverError;
use crate::traits::PlaceholderStyle;
use crate::types::{BindValues, SqlValue};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Sql(String),
    Named(String),
}

/// A statement with its named placeholders located and values bound by name.
///
/// Placeholders are `:name` tokens outside of quoted strings (including
/// `E'...'` escape strings and `$tag$...$tag$` dollar quotes), quoted
/// identifiers and comments; `::` casts are left alone. Rendering rewrites
/// them into the driver's positional syntax.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    text: String,
    segments: Vec<Segment>,
    bound: HashMap<String, SqlValue>,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Index of the quote closing the run opened at `open`. In an escape string a
/// backslash escapes the character after it.
fn quote_end(chars: &[char], open: usize, escapes: bool) -> Option<usize> {
    let quote = chars[open];
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if escapes => i += 2,
            c if c == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Length of the `$tag$` delimiter starting at `open`, if there is one. The
/// tag is empty or an identifier, so `$1` is not a delimiter.
fn dollar_tag_len(chars: &[char], open: usize) -> Option<usize> {
    if open > 0 && (is_name_char(chars[open - 1]) || chars[open - 1] == '$') {
        return None;
    }
    let tag_start = open + 1;
    if chars.get(tag_start).is_some_and(|&c| c != '$' && !is_name_start(c)) {
        return None;
    }
    let tag_end = chars[tag_start..]
        .iter()
        .position(|&c| !is_name_char(c))
        .map(|p| tag_start + p)?;
    (chars[tag_end] == '$').then_some(tag_end + 1 - open)
}

impl PreparedStatement {
    /// Scans `text` for named placeholders.
    pub fn prepare(text: &str) -> Result<Self, DriverError> {
        let chars: Vec<char> = text.chars().collect();
        let mut segments = Vec::new();
        let mut sql = String::with_capacity(text.len());
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '\'' | '"' => {
                    let escapes = c == '\''
                        && i > 0
                        && matches!(chars[i - 1], 'e' | 'E')
                        && (i < 2 || !is_name_char(chars[i - 2]));
                    let end = quote_end(&chars, i, escapes).ok_or_else(|| {
                        DriverError::new(format!("unterminated quote at offset {}", i))
                    })?;
                    sql.extend(&chars[i..=end]);
                    // A doubled quote is an escaped quote; the scan simply
                    // resumes at the second one as a new quoted run.
                    i = end + 1;
                }
                '$' => {
                    let end = match dollar_tag_len(&chars, i) {
                        Some(len) => {
                            let tag = &chars[i..i + len];
                            chars[i + len..]
                                .windows(len)
                                .position(|w| w == tag)
                                .map(|p| i + len + p + len)
                                .ok_or_else(|| {
                                    DriverError::new(format!(
                                        "unterminated dollar quote at offset {}",
                                        i
                                    ))
                                })?
                        }
                        None => i + 1,
                    };
                    sql.extend(&chars[i..end]);
                    i = end;
                }
                '-' if chars.get(i + 1) == Some(&'-') => {
                    let end = chars[i..]
                        .iter()
                        .position(|&n| n == '\n')
                        .map(|p| i + p)
                        .unwrap_or(chars.len());
                    sql.extend(&chars[i..end]);
                    i = end;
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    let end = chars[i + 2..]
                        .windows(2)
                        .position(|w| w == ['*', '/'])
                        .map(|p| i + 2 + p + 2)
                        .ok_or_else(|| {
                            DriverError::new(format!("unterminated comment at offset {}", i))
                        })?;
                    sql.extend(&chars[i..end]);
                    i = end;
                }
                ':' if chars.get(i + 1) == Some(&':') => {
                    sql.push_str("::");
                    i += 2;
                }
                ':' if chars.get(i + 1).copied().is_some_and(is_name_start) => {
                    let start = i + 1;
                    let end = chars[start..]
                        .iter()
                        .position(|&n| !is_name_char(n))
                        .map(|p| start + p)
                        .unwrap_or(chars.len());
                    if !sql.is_empty() {
                        segments.push(Segment::Sql(std::mem::take(&mut sql)));
                    }
                    segments.push(Segment::Named(chars[start..end].iter().collect()));
                    i = end;
                }
                _ => {
                    sql.push(c);
                    i += 1;
                }
            }
        }
        if !sql.is_empty() {
            segments.push(Segment::Sql(sql));
        }

        Ok(Self {
            text: text.to_string(),
            segments,
            bound: HashMap::new(),
        })
    }

    /// The statement text as given to `prepare`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Distinct placeholder names, in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Named(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn has_placeholder(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Named(n) if n == name))
    }

    /// Binds a value by name. Returns false, binding nothing, when the
    /// statement has no such placeholder.
    pub fn bind(&mut self, name: &str, value: SqlValue) -> bool {
        let name = name.strip_prefix(':').unwrap_or(name);
        if !self.has_placeholder(name) {
            return false;
        }
        self.bound.insert(name.to_string(), value);
        true
    }

    /// Binds every value, applying any configured coercion first.
    pub fn bind_all(
        &mut self,
        values: &BindValues,
        bind_types: &HashMap<String, BindType>,
    ) -> Result<(), DriverError> {
        for (name, value) in values.iter() {
            let value = match bind_types.get(name) {
                Some(bind_type) => bind_type.coerce(value.clone()).map_err(|e| {
                    DriverError::new(format!("cannot bind :{}: {}", name, e.message))
                })?,
                None => value.clone(),
            };
            if !self.bind(name, value) {
                log::trace!("ignoring value for :{}, not used by statement", name);
            }
        }
        Ok(())
    }

    /// Renders positional SQL and its parameter list. List values expand to
    /// one placeholder per element; an empty list renders as `NULL`.
    pub fn render(&self, style: PlaceholderStyle) -> Result<(String, Vec<SqlValue>), DriverError> {
        let mut sql = String::with_capacity(self.text.len());
        let mut params = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Sql(text) => sql.push_str(text),
                Segment::Named(name) => {
                    let value = self.bound.get(name).ok_or_else(|| {
                        DriverError::new(format!("no value bound for parameter :{}", name))
                    })?;
                    match value {
                        SqlValue::List(items) if items.is_empty() => sql.push_str("NULL"),
                        SqlValue::List(items) => {
                            for (i, item) in items.iter().enumerate() {
                                if i > 0 {
                                    sql.push_str(", ");
                                }
                                params.push(item.clone());
                                sql.push_str(&style.render(params.len()));
                            }
                        }
                        other => {
                            params.push(other.clone());
                            sql.push_str(&style.render(params.len()));
                        }
                    }
                }
            }
        }

        Ok((sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str, values: BindValues) -> (String, Vec<SqlValue>) {
        let mut stmt = PreparedStatement::prepare(text).unwrap();
        stmt.bind_all(&values, &HashMap::new()).unwrap();
        stmt.render(PlaceholderStyle::Dollar).unwrap()
    }

    #[test]
    fn test_named_to_positional() {
        let (sql, params) = render(
            "SELECT id FROM users WHERE status = :status AND role = :role",
            BindValues::from([("status", "active"), ("role", "admin")]),
        );
        assert_eq!(sql, "SELECT id FROM users WHERE status = $1 AND role = $2");
        assert_eq!(params, vec![SqlValue::from("active"), SqlValue::from("admin")]);
    }

    #[test]
    fn test_repeated_placeholder_repeats_value() {
        let (sql, params) = render(
            "SELECT * FROM t WHERE a = :v OR b = :v",
            BindValues::from([("v", 1)]),
        );
        assert_eq!(sql, "SELECT * FROM t WHERE a = $1 OR b = $2");
        assert_eq!(params, vec![SqlValue::Int32(1), SqlValue::Int32(1)]);
    }

    #[test]
    fn test_list_expands() {
        let (sql, params) = render(
            "SELECT * FROM t WHERE id IN (:ids) AND x = :x",
            BindValues::new().with("ids", vec![1, 2, 3]).with("x", "y"),
        );
        assert_eq!(sql, "SELECT * FROM t WHERE id IN ($1, $2, $3) AND x = $4");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_empty_list_renders_null() {
        let (sql, params) = render(
            "SELECT * FROM t WHERE id IN (:ids)",
            BindValues::new().with("ids", Vec::<i64>::new()),
        );
        assert_eq!(sql, "SELECT * FROM t WHERE id IN (NULL)");
        assert!(params.is_empty());
    }

    #[test]
    fn test_quotes_comments_and_casts_are_not_placeholders() {
        let text = "SELECT ':nope', \"col:x\", a::text -- :c\n FROM t /* :d */ WHERE b = :b";
        let stmt = PreparedStatement::prepare(text).unwrap();
        assert_eq!(stmt.placeholders(), vec!["b"]);

        let (sql, _) = render(text, BindValues::from([("b", 1)]));
        assert_eq!(
            sql,
            "SELECT ':nope', \"col:x\", a::text -- :c\n FROM t /* :d */ WHERE b = $1"
        );
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let stmt = PreparedStatement::prepare("SELECT 'it''s :x' WHERE y = :y").unwrap();
        assert_eq!(stmt.placeholders(), vec!["y"]);
    }

    #[test]
    fn test_dollar_quoted_bodies_are_not_placeholders() {
        let text = "SELECT $$a:b$$, $fn$ :x $$ :y $fn$ WHERE id = :id";
        let stmt = PreparedStatement::prepare(text).unwrap();
        assert_eq!(stmt.placeholders(), vec!["id"]);

        let (sql, _) = render(text, BindValues::from([("id", 1)]));
        assert_eq!(sql, "SELECT $$a:b$$, $fn$ :x $$ :y $fn$ WHERE id = $1");
    }

    #[test]
    fn test_positional_dollar_is_not_a_quote() {
        let stmt = PreparedStatement::prepare("SELECT $1, :a WHERE b = $2").unwrap();
        assert_eq!(stmt.placeholders(), vec!["a"]);
        assert!(PreparedStatement::prepare("SELECT $tag$ :a").is_err());
    }

    #[test]
    fn test_escape_string_backslash_quote() {
        let stmt = PreparedStatement::prepare(r"SELECT E'it\'s :x', e'\\' WHERE y = :y").unwrap();
        assert_eq!(stmt.placeholders(), vec!["y"]);

        // Outside an escape string a backslash is an ordinary character.
        let stmt = PreparedStatement::prepare(r"SELECT 'a\' WHERE z = :z").unwrap();
        assert_eq!(stmt.placeholders(), vec!["z"]);
    }

    #[test]
    fn test_unused_values_are_ignored() {
        let (sql, params) = render("SELECT 1", BindValues::from([("unused", 1)]));
        assert_eq!(sql, "SELECT 1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let stmt = PreparedStatement::prepare("SELECT * FROM t WHERE id = :id").unwrap();
        let err = stmt.render(PlaceholderStyle::Dollar).unwrap_err();
        assert!(err.message.contains(":id"));
    }

    #[test]
    fn test_question_style_and_coercion() {
        let mut stmt = PreparedStatement::prepare("SELECT * FROM t LIMIT :limit").unwrap();
        let bind_types = HashMap::from([("limit".to_string(), BindType::Int)]);
        stmt.bind_all(&BindValues::from([("limit", "10")]), &bind_types)
            .unwrap();

        let (sql, params) = stmt.render(PlaceholderStyle::Question).unwrap();
        assert_eq!(sql, "SELECT * FROM t LIMIT ?");
        assert_eq!(params, vec![SqlValue::Int64(10)]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(PreparedStatement::prepare("SELECT 'oops").is_err());
    }
}
