//! Mapped operands and their memory-access expressions.

use fusekernel_graph::{Layout, MatrixDesc, ScalarType, Terminal, TerminalKind, VectorDesc};

use crate::{CodegenError, Dialect, Result};

/// Loop index variables an access expression is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpace<'a> {
    /// One-dimensional iteration over vector elements.
    Linear(&'a str),
    /// Two-dimensional iteration over matrix elements.
    Grid {
        /// Row index variable.
        row: &'a str,
        /// Column index variable.
        col: &'a str,
    },
}

/// Code-generation view of one terminal operand.
///
/// Identity is the operand name; the descriptor carries everything needed to
/// declare the kernel parameter and to address one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappedOperand {
    terminal: Terminal,
}

impl MappedOperand {
    /// Wrap a terminal.
    pub fn new(terminal: Terminal) -> Self {
        Self { terminal }
    }

    /// Operand name, used as the kernel parameter name.
    pub fn name(&self) -> &str {
        self.terminal.name()
    }

    /// Element type.
    pub fn scalar_type(&self) -> ScalarType {
        self.terminal.scalar_type()
    }

    /// Operand kind.
    pub fn kind(&self) -> TerminalKind {
        self.terminal.kind()
    }

    /// Underlying terminal.
    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// Check if the operand lives in device memory (and is passed by pointer).
    pub fn is_handle(&self) -> bool {
        self.kind() != TerminalKind::Scalar
    }

    /// Kernel parameter declaration.
    ///
    /// Handles become pointers; sizes, offsets and strides are baked into the
    /// access expressions as literals. Scalars are passed by value.
    pub fn parameter(&self, dialect: Dialect) -> String {
        let ty = self.scalar_type().c_name();
        if self.is_handle() {
            dialect.pointer_parameter(ty, self.name())
        } else {
            dialect.value_parameter(ty, self.name())
        }
    }

    /// Expression reading or writing the element at the current index.
    pub fn generate_access(&self, space: IndexSpace<'_>) -> Result<String> {
        match (&self.terminal, space) {
            (Terminal::Scalar(s), _) => Ok(s.name.clone()),
            (Terminal::Vector(v), IndexSpace::Linear(i)) => Ok(vector_access(v, i)),
            (Terminal::Matrix(m), IndexSpace::Grid { row, col }) => Ok(matrix_access(m, row, col)),
            (Terminal::Vector(_), IndexSpace::Grid { .. }) => Err(self.incompatible(
                "a vector cannot be addressed in a two-dimensional index space",
            )),
            (Terminal::Matrix(_), IndexSpace::Linear(_)) => Err(self.incompatible(
                "a matrix cannot be addressed in a one-dimensional index space",
            )),
        }
    }

    /// Expression reading the container element at a computed index.
    ///
    /// `index` is already-emitted source; the container's start and stride
    /// are applied around it. Only vectors can be indexed this way.
    pub fn generate_indexed(&self, index: &str) -> Result<String> {
        match &self.terminal {
            Terminal::Vector(v) => Ok(format!(
                "{}[{}]",
                v.name,
                offset(&group(index), v.start, v.stride)
            )),
            Terminal::Matrix(_) => Err(CodegenError::NotImplemented(format!(
                "single-index element access into matrix '{}'",
                self.name()
            ))),
            Terminal::Scalar(_) => Err(self.incompatible("a scalar cannot be indexed")),
        }
    }

    /// Reject names that are not C identifiers or that collide with the
    /// identifiers generated kernels declare themselves.
    pub fn check_name(&self) -> Result<()> {
        check_identifier(self.name())
    }

    pub(crate) fn incompatible(&self, reason: &str) -> CodegenError {
        CodegenError::IncompatibleOperand {
            name: self.name().to_string(),
            kind: self.kind(),
            reason: reason.to_string(),
        }
    }
}

impl From<Terminal> for MappedOperand {
    fn from(terminal: Terminal) -> Self {
        Self::new(terminal)
    }
}

impl From<&Terminal> for MappedOperand {
    fn from(terminal: &Terminal) -> Self {
        Self::new(terminal.clone())
    }
}

/// Identifiers introduced by generated kernels: loop variables, bounds,
/// blocked-loop locals and the builtins the loop headers use.
const RESERVED: &[&str] = &[
    "i", "j", "M", "N", "i_chunk", "i_end", "j_chunk", "j_end", "min", "threadIdx", "blockIdx",
    "blockDim", "gridDim",
];

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "half", "if", "int", "kernel", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "global", "local", "private", "constant",
];

/// Check that `name` can be used verbatim in generated source.
pub fn check_identifier(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(CodegenError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return invalid("empty name"),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return invalid("must start with a letter or underscore")
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return invalid("must contain only letters, digits and underscores");
    }
    if name.starts_with("__") {
        return invalid("double-underscore names are reserved");
    }
    if KEYWORDS.contains(&name) {
        return invalid("is a keyword");
    }
    if RESERVED.contains(&name) {
        return invalid("collides with a generated identifier");
    }
    if name.ends_with("_private") {
        return invalid("collides with a generated register name");
    }
    Ok(())
}

fn vector_access(v: &VectorDesc, i: &str) -> String {
    format!("{}[{}]", v.name, offset(i, v.start, v.stride))
}

fn matrix_access(m: &MatrixDesc, row: &str, col: &str) -> String {
    let r = offset(row, m.start.0, m.stride.0);
    let c = offset(col, m.start.1, m.stride.1);
    match m.layout {
        Layout::RowMajor => format!("{}[{}*{} + {}]", m.name, group(&r), m.internal_cols, c),
        Layout::ColumnMajor => format!("{}[{} + {}*{}]", m.name, r, group(&c), m.internal_rows),
    }
}

/// `start + index*stride`, dropping identity terms.
fn offset(index: &str, start: usize, stride: usize) -> String {
    match (start, stride) {
        (0, 1) => index.to_string(),
        (0, s) => format!("{index}*{s}"),
        (b, 1) => format!("{b} + {index}"),
        (b, s) => format!("{b} + {index}*{s}"),
    }
}

/// Parenthesize `expr` unless it is atomic or already one enclosed group.
fn group(expr: &str) -> String {
    if !expr.contains(['+', '-', '*', '/', ' ']) || is_enclosed(expr) {
        expr.to_string()
    } else {
        format!("({expr})")
    }
}

fn is_enclosed(expr: &str) -> bool {
    if !(expr.starts_with('(') && expr.ends_with(')')) {
        return false;
    }
    let mut depth = 0usize;
    for (pos, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && pos + 1 < expr.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}
