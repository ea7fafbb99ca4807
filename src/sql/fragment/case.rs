//! Case fragments: pick the first non-null discriminating column.
//!
//! Used to render the "which subclass table matched" expression of joined
//! inheritance. Each `when` maps a qualified column to the value returned
//! when that column is not null.

use serde::Serialize;

/// Case fragment rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStyle {
    /// `case when a.c is not null then v ... end`
    Ansi,
    /// `decode(...)`
    Decode,
    /// nested `casewhen(a.c is not null, v, ...)`
    Hsql,
}

/// Case fragment builder.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CaseFragment {
    style: CaseStyle,
    return_column_name: Option<String>,
    cases: Vec<(String, String)>,
}

impl CaseFragment {
    pub fn new(style: CaseStyle) -> Self {
        Self {
            style,
            return_column_name: None,
            cases: Vec::new(),
        }
    }

    pub fn style(&self) -> CaseStyle {
        self.style
    }

    /// Render ` as <name>` after the expression.
    pub fn set_return_column_name(mut self, name: impl Into<String>) -> Self {
        self.return_column_name = Some(name.into());
        self
    }

    /// Return column alias built from `name` plus `suffix`. A quoted name
    /// stays quoted, with backticks, around the suffixed text.
    pub fn set_return_column_name_with_suffix(self, name: &str, suffix: &str) -> Self {
        let unquoted = [('`', '`'), ('"', '"'), ('[', ']')]
            .iter()
            .find_map(|&(open, close)| name.strip_prefix(open)?.strip_suffix(close));
        let alias = match unquoted {
            Some(inner) => format!("`{inner}{suffix}`"),
            None => format!("{name}{suffix}"),
        };
        self.set_return_column_name(alias)
    }

    /// Add `when alias.column is not null` returning `value`. A repeated
    /// column keeps its position and takes the new value.
    pub fn add_when_column_not_null(mut self, alias: &str, column: &str, value: impl Into<String>) -> Self {
        let key = if alias.is_empty() {
            column.to_string()
        } else {
            format!("{alias}.{column}")
        };
        let value = value.into();
        match self.cases.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.cases.push((key, value)),
        }
        self
    }

    pub fn to_fragment_string(&self) -> String {
        let mut buf = match self.style {
            CaseStyle::Ansi => self.render_ansi(),
            CaseStyle::Decode => self.render_decode(),
            CaseStyle::Hsql => self.render_hsql(),
        };
        if let Some(name) = &self.return_column_name {
            buf.push_str(" as ");
            buf.push_str(name);
        }
        buf
    }

    fn render_ansi(&self) -> String {
        let mut buf = String::from("case");
        for (column, value) in &self.cases {
            buf.push_str(" when ");
            buf.push_str(column);
            buf.push_str(" is not null then ");
            buf.push_str(value);
        }
        buf.push_str(" end");
        buf
    }

    // decode(last_col, col1, v1, ..., last_value)
    fn render_decode(&self) -> String {
        let mut buf = String::new();
        if let Some(((last_column, last_value), rest)) = self.cases.split_last() {
            buf.push_str(last_column);
            for (column, value) in rest {
                buf.push_str(", ");
                buf.push_str(column);
                buf.push_str(", ");
                buf.push_str(value);
            }
            buf.push_str(", ");
            buf.push_str(last_value);
        }
        format!("decode({buf})")
    }

    fn render_hsql(&self) -> String {
        let mut buf = String::new();
        for (column, value) in &self.cases {
            buf.push_str(" casewhen(");
            buf.push_str(column);
            buf.push_str(" is not null, ");
            buf.push_str(value);
            buf.push_str(", ");
        }
        buf.push_str("-1");
        buf.push_str(&")".repeat(self.cases.len()));
        buf
    }
}
