//! Fragment writer.
//!
//! All emitters build their output through [`Fragment`], which owns the
//! indentation discipline: templates are written as readable multi-line
//! string literals, dedented to their common margin, then re-indented to
//! wherever they land in the generated file. Blank lines never carry
//! trailing spaces.

/// Accumulates one output fragment.
#[derive(Debug, Default)]
pub struct Fragment {
    buf: String,
}

impl Fragment {
    pub fn new() -> Fragment {
        Fragment::default()
    }

    /// Append a single line at the given indent. An empty `text` produces
    /// a bare newline.
    pub fn line(&mut self, indent: usize, text: &str) {
        if text.is_empty() {
            self.buf.push('\n');
            return;
        }
        for _ in 0..indent {
            self.buf.push(' ');
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Append a multi-line template: strip the common leading margin and
    /// re-indent every non-empty line to `indent`.
    pub fn block(&mut self, indent: usize, text: &str) {
        for line in dedent(text) {
            self.line(indent, &line);
        }
    }

    /// Append schema comment lines as `//`-style comments.
    pub fn comments(&mut self, indent: usize, comments: &[String]) {
        for comment in comments {
            self.line(indent, &format!("// {comment}"));
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// Split `text` into lines, drop leading and trailing empty lines, and
/// strip the smallest indent shared by the non-empty lines.
pub fn dedent(text: &str) -> Vec<String> {
    let mut lines: Vec<&str> = text.split('\n').map(|l| l.trim_end()).collect();
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let margin = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    lines
        .into_iter()
        .map(|l| if l.is_empty() { String::new() } else { l[margin..].to_owned() })
        .collect()
}
