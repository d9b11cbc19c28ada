//! Indented source output.

/// Line-oriented source buffer with block indentation.
#[derive(Debug, Clone)]
pub struct SourceWriter {
    output: String,
    indent: usize,
}

impl SourceWriter {
    /// Create a writer at the given indentation level.
    pub fn new(indent: usize) -> Self {
        Self {
            output: String::new(),
            indent,
        }
    }

    /// Current indentation level.
    pub fn indent(&self) -> usize {
        self.indent
    }

    fn indent_str(&self) -> String {
        "    ".repeat(self.indent)
    }

    /// Write one indented line.
    pub fn line(&mut self, text: impl AsRef<str>) {
        self.output.push_str(&self.indent_str());
        self.output.push_str(text.as_ref());
        self.output.push('\n');
    }

    /// Write `{` and indent.
    pub fn open_block(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    /// Dedent and write `}`.
    pub fn close_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    /// Get the written source.
    pub fn finish(self) -> String {
        self.output
    }
}

impl Default for SourceWriter {
    fn default() -> Self {
        Self::new(0)
    }
}
