//! Indented writer for the HOCON-style feature config text

use std::fmt::Display;

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub struct ConfigWriter {
    out: String,
    depth: usize,
}

impl ConfigWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `name: {` and one level deeper
    pub fn open(&mut self, name: &str) -> &mut Self {
        self.line(format_args!("{name}: {{"));
        self.depth += 1;
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line("}")
    }

    pub fn field(&mut self, key: &str, value: impl Display) -> &mut Self {
        self.line(format_args!("{key}: {value}"))
    }

    /// Field whose value is a double-quoted string
    pub fn quoted(&mut self, key: &str, value: &str) -> &mut Self {
        self.field(key, quote(value))
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    fn line(&mut self, text: impl Display) -> &mut Self {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(&text.to_string());
        self.out.push('\n');
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
