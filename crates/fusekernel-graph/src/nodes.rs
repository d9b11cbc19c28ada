//! Graph node definitions.
//!
//! Defines the operator set, the terminal operands a node can reference, and
//! the node record stored in an [`ExpressionGraph`](crate::ExpressionGraph).

use std::fmt;
use std::str::FromStr;

use crate::{GraphError, NodeId, ScalarType};

/// Operator family, the coarse arity tag of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorFamily {
    /// One operand (math functions, negation).
    Unary,
    /// Two operands.
    Binary,
}

/// Traversal policy of an operator.
///
/// Decides whether a node is expanded in place or is itself the unit of code
/// generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorClass {
    /// Unary function applied to a single sub-expression.
    Unary,
    /// Plain element access `lhs[rhs]`.
    Access,
    /// Produces a reduction; computed by a separate kernel.
    Reducing,
    /// Elementwise binary arithmetic or assignment.
    Elementwise,
}

/// Operator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorType {
    // ========================================================================
    // Unary
    // ========================================================================
    /// Absolute value.
    Abs,
    /// Arithmetic negation.
    Negate,
    /// Square root.
    Sqrt,
    /// Natural exponential.
    Exp,
    /// Natural logarithm.
    Log,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Hyperbolic tangent.
    Tanh,
    /// Round down.
    Floor,
    /// Round up.
    Ceil,

    // ========================================================================
    // Binary elementwise
    // ========================================================================
    /// Assignment `lhs = rhs`.
    Assign,
    /// Accumulation `lhs += rhs`.
    InplaceAdd,
    /// Accumulation `lhs -= rhs`.
    InplaceSub,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Scalar multiplication.
    Mult,
    /// Scalar division.
    Div,
    /// Elementwise product.
    ElementProd,
    /// Elementwise division.
    ElementDiv,

    // ========================================================================
    // Binary access
    // ========================================================================
    /// Element access `lhs[rhs]`.
    Access,

    // ========================================================================
    // Binary reducing
    // ========================================================================
    /// Matrix-vector product.
    MatVecProd,
    /// Inner product of two vectors.
    InnerProd,
}

impl OperatorType {
    /// All operators, in declaration order.
    pub const ALL: [OperatorType; 23] = [
        OperatorType::Abs,
        OperatorType::Negate,
        OperatorType::Sqrt,
        OperatorType::Exp,
        OperatorType::Log,
        OperatorType::Sin,
        OperatorType::Cos,
        OperatorType::Tan,
        OperatorType::Tanh,
        OperatorType::Floor,
        OperatorType::Ceil,
        OperatorType::Assign,
        OperatorType::InplaceAdd,
        OperatorType::InplaceSub,
        OperatorType::Add,
        OperatorType::Sub,
        OperatorType::Mult,
        OperatorType::Div,
        OperatorType::ElementProd,
        OperatorType::ElementDiv,
        OperatorType::Access,
        OperatorType::MatVecProd,
        OperatorType::InnerProd,
    ];

    /// Get the operator family.
    pub fn family(&self) -> OperatorFamily {
        match self.class() {
            OperatorClass::Unary => OperatorFamily::Unary,
            _ => OperatorFamily::Binary,
        }
    }

    /// Get the traversal policy.
    pub fn class(&self) -> OperatorClass {
        use OperatorType::*;
        match self {
            Abs | Negate | Sqrt | Exp | Log | Sin | Cos | Tan | Tanh | Floor | Ceil => {
                OperatorClass::Unary
            }
            Access => OperatorClass::Access,
            MatVecProd | InnerProd => OperatorClass::Reducing,
            Assign | InplaceAdd | InplaceSub | Add | Sub | Mult | Div | ElementProd
            | ElementDiv => OperatorClass::Elementwise,
        }
    }

    /// Check if this operator produces a reduction.
    pub fn is_reducing(&self) -> bool {
        self.class() == OperatorClass::Reducing
    }

    /// Check if this operator can be the root of a statement.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            OperatorType::Assign | OperatorType::InplaceAdd | OperatorType::InplaceSub
        )
    }

    /// Check if the assignment target is also read (accumulating forms).
    pub fn reads_target(&self) -> bool {
        matches!(self, OperatorType::InplaceAdd | OperatorType::InplaceSub)
    }

    /// Inline source spelling.
    ///
    /// Binary operators yield the infix token, unary operators the function
    /// name, plain access the empty string. Reducing operators have no inline
    /// spelling.
    pub fn symbol(&self) -> Option<&'static str> {
        use OperatorType::*;
        let symbol = match self {
            Abs => "fabs",
            Negate => "-",
            Sqrt => "sqrt",
            Exp => "exp",
            Log => "log",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Tanh => "tanh",
            Floor => "floor",
            Ceil => "ceil",
            Assign => "=",
            InplaceAdd => "+=",
            InplaceSub => "-=",
            Add => "+",
            Sub => "-",
            Mult | ElementProd => "*",
            Div | ElementDiv => "/",
            Access => "",
            MatVecProd | InnerProd => return None,
        };
        Some(symbol)
    }

    /// Inline spelling for operands of element type `ty`.
    ///
    /// Same as [`symbol`](Self::symbol) except that the absolute value of an
    /// integer is spelled `abs` rather than `fabs`.
    pub fn symbol_for(&self, ty: ScalarType) -> Option<&'static str> {
        match self {
            OperatorType::Abs if !ty.is_float() => Some("abs"),
            _ => self.symbol(),
        }
    }

    /// Canonical snake_case name.
    pub fn name(&self) -> &'static str {
        use OperatorType::*;
        match self {
            Abs => "abs",
            Negate => "negate",
            Sqrt => "sqrt",
            Exp => "exp",
            Log => "log",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Tanh => "tanh",
            Floor => "floor",
            Ceil => "ceil",
            Assign => "assign",
            InplaceAdd => "inplace_add",
            InplaceSub => "inplace_sub",
            Add => "add",
            Sub => "sub",
            Mult => "mult",
            Div => "div",
            ElementProd => "element_prod",
            ElementDiv => "element_div",
            Access => "access",
            MatVecProd => "mat_vec_prod",
            InnerProd => "inner_prod",
        }
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperatorType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        OperatorType::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| GraphError::UnknownOperator(s.to_string()))
    }
}

/// Storage order of a dense matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    /// Consecutive elements of a row are adjacent.
    #[default]
    RowMajor,
    /// Consecutive elements of a column are adjacent.
    ColumnMajor,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::RowMajor => write!(f, "row_major"),
            Layout::ColumnMajor => write!(f, "column_major"),
        }
    }
}

/// Kind of a terminal operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKind {
    /// Host scalar passed by value.
    Scalar,
    /// Dense vector in device memory.
    Vector,
    /// Dense matrix in device memory.
    Matrix,
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalKind::Scalar => write!(f, "scalar"),
            TerminalKind::Vector => write!(f, "vector"),
            TerminalKind::Matrix => write!(f, "matrix"),
        }
    }
}

/// Host scalar descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScalarDesc {
    /// Stable operand name.
    pub name: String,
    /// Element type.
    pub scalar_type: ScalarType,
}

/// Dense vector descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VectorDesc {
    /// Stable operand name.
    pub name: String,
    /// Element type.
    pub scalar_type: ScalarType,
    /// Logical number of elements.
    pub size: usize,
    /// Offset of the first element.
    pub start: usize,
    /// Distance between consecutive elements.
    pub stride: usize,
}

impl VectorDesc {
    /// Create a contiguous vector descriptor.
    pub fn new(name: impl Into<String>, scalar_type: ScalarType, size: usize) -> Self {
        Self {
            name: name.into(),
            scalar_type,
            size,
            start: 0,
            stride: 1,
        }
    }

    /// Set the range (offset and stride) of this view.
    pub fn with_range(mut self, start: usize, stride: usize) -> Self {
        self.start = start;
        self.stride = stride;
        self
    }
}

/// Dense matrix descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatrixDesc {
    /// Stable operand name.
    pub name: String,
    /// Element type.
    pub scalar_type: ScalarType,
    /// Storage order.
    pub layout: Layout,
    /// Logical row count.
    pub rows: usize,
    /// Logical column count.
    pub cols: usize,
    /// Allocated (padded) row count.
    pub internal_rows: usize,
    /// Allocated (padded) column count.
    pub internal_cols: usize,
    /// Offset of the first element, as (row, column).
    pub start: (usize, usize),
    /// Distance between consecutive rows and columns of the view.
    pub stride: (usize, usize),
}

impl MatrixDesc {
    /// Create an unpadded, contiguous matrix descriptor.
    pub fn new(
        name: impl Into<String>,
        scalar_type: ScalarType,
        layout: Layout,
        rows: usize,
        cols: usize,
    ) -> Self {
        Self {
            name: name.into(),
            scalar_type,
            layout,
            rows,
            cols,
            internal_rows: rows,
            internal_cols: cols,
            start: (0, 0),
            stride: (1, 1),
        }
    }

    /// Set the allocated (padded) sizes.
    pub fn with_internal_size(mut self, rows: usize, cols: usize) -> Self {
        self.internal_rows = rows;
        self.internal_cols = cols;
        self
    }

    /// Set the range (offsets and strides) of this view.
    pub fn with_range(mut self, start: (usize, usize), stride: (usize, usize)) -> Self {
        self.start = start;
        self.stride = stride;
        self
    }

    /// Check if the matrix is stored row by row.
    pub fn is_row_major(&self) -> bool {
        self.layout == Layout::RowMajor
    }
}

/// A terminal operand referenced by a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// Host scalar.
    Scalar(ScalarDesc),
    /// Dense vector.
    Vector(VectorDesc),
    /// Dense matrix.
    Matrix(MatrixDesc),
}

impl Terminal {
    /// Host scalar terminal.
    pub fn scalar(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Terminal::Scalar(ScalarDesc {
            name: name.into(),
            scalar_type,
        })
    }

    /// Contiguous vector terminal.
    pub fn vector(name: impl Into<String>, scalar_type: ScalarType, size: usize) -> Self {
        Terminal::Vector(VectorDesc::new(name, scalar_type, size))
    }

    /// Unpadded matrix terminal.
    pub fn matrix(
        name: impl Into<String>,
        scalar_type: ScalarType,
        layout: Layout,
        rows: usize,
        cols: usize,
    ) -> Self {
        Terminal::Matrix(MatrixDesc::new(name, scalar_type, layout, rows, cols))
    }

    /// Stable operand name.
    pub fn name(&self) -> &str {
        match self {
            Terminal::Scalar(s) => &s.name,
            Terminal::Vector(v) => &v.name,
            Terminal::Matrix(m) => &m.name,
        }
    }

    /// Element type.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Terminal::Scalar(s) => s.scalar_type,
            Terminal::Vector(v) => v.scalar_type,
            Terminal::Matrix(m) => m.scalar_type,
        }
    }

    /// Operand kind.
    pub fn kind(&self) -> TerminalKind {
        match self {
            Terminal::Scalar(_) => TerminalKind::Scalar,
            Terminal::Vector(_) => TerminalKind::Vector,
            Terminal::Matrix(_) => TerminalKind::Matrix,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}<{}>", self.name(), self.kind(), self.scalar_type())
    }
}

/// Child reference of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Child {
    /// Interior sub-expression in the same graph.
    Node(NodeId),
    /// Terminal operand.
    Terminal(Terminal),
}

impl Child {
    /// Get the sub-expression index, if this is an interior reference.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Child::Node(id) => Some(*id),
            Child::Terminal(_) => None,
        }
    }

    /// Get the terminal, if this is a terminal reference.
    pub fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            Child::Node(_) => None,
            Child::Terminal(t) => Some(t),
        }
    }
}

impl From<NodeId> for Child {
    fn from(id: NodeId) -> Self {
        Child::Node(id)
    }
}

impl From<Terminal> for Child {
    fn from(terminal: Terminal) -> Self {
        Child::Terminal(terminal)
    }
}

impl fmt::Display for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Node(id) => write!(f, "{}", id),
            Child::Terminal(t) => write!(f, "{}", t),
        }
    }
}

/// One entry in a graph's flat node sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    /// The operation.
    pub op: OperatorType,
    /// Left (or single) operand.
    pub lhs: Child,
    /// Right operand; `None` for unary operators.
    pub rhs: Option<Child>,
}

impl Node {
    /// Create a unary node.
    pub fn unary(op: OperatorType, operand: impl Into<Child>) -> Self {
        Self {
            op,
            lhs: operand.into(),
            rhs: None,
        }
    }

    /// Create a binary node.
    pub fn binary(op: OperatorType, lhs: impl Into<Child>, rhs: impl Into<Child>) -> Self {
        Self {
            op,
            lhs: lhs.into(),
            rhs: Some(rhs.into()),
        }
    }

    /// Iterate over the children of this node.
    pub fn children(&self) -> impl Iterator<Item = &Child> {
        std::iter::once(&self.lhs).chain(self.rhs.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_classification() {
        assert_eq!(OperatorType::Sqrt.class(), OperatorClass::Unary);
        assert_eq!(OperatorType::Sqrt.family(), OperatorFamily::Unary);
        assert_eq!(OperatorType::Access.class(), OperatorClass::Access);
        assert_eq!(OperatorType::Access.family(), OperatorFamily::Binary);
        assert!(OperatorType::MatVecProd.is_reducing());
        assert!(OperatorType::InnerProd.is_reducing());
        assert!(!OperatorType::ElementProd.is_reducing());
    }

    #[test]
    fn test_symbols() {
        assert_eq!(OperatorType::Assign.symbol(), Some("="));
        assert_eq!(OperatorType::Add.symbol(), Some("+"));
        assert_eq!(OperatorType::Abs.symbol(), Some("fabs"));
        assert_eq!(OperatorType::Abs.symbol_for(ScalarType::F64), Some("fabs"));
        assert_eq!(OperatorType::Abs.symbol_for(ScalarType::I32), Some("abs"));
        assert_eq!(OperatorType::Sqrt.symbol_for(ScalarType::U64), Some("sqrt"));
        assert_eq!(OperatorType::Access.symbol(), Some(""));
        assert_eq!(OperatorType::InnerProd.symbol(), None);
    }

    #[test]
    fn test_assignment_forms() {
        assert!(OperatorType::Assign.is_assignment());
        assert!(!OperatorType::Assign.reads_target());
        assert!(OperatorType::InplaceAdd.reads_target());
        assert!(!OperatorType::Add.is_assignment());
    }

    #[test]
    fn test_operator_names_round_trip() {
        for op in OperatorType::ALL {
            assert_eq!(op.name().parse::<OperatorType>().unwrap(), op);
        }
        assert!(matches!(
            "mat_mat_prod".parse::<OperatorType>(),
            Err(GraphError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_terminal_accessors() {
        let t = Terminal::matrix("A", ScalarType::F64, Layout::ColumnMajor, 4, 3);
        assert_eq!(t.name(), "A");
        assert_eq!(t.kind(), TerminalKind::Matrix);
        assert_eq!(t.scalar_type(), ScalarType::F64);
        assert_eq!(t.to_string(), "A:matrix<f64>");
    }

    #[test]
    fn test_node_children() {
        let x = Terminal::vector("x", ScalarType::F32, 8);
        let unary = Node::unary(OperatorType::Exp, x.clone());
        assert_eq!(unary.children().count(), 1);

        let binary = Node::binary(OperatorType::Add, x, NodeId::new(2));
        assert_eq!(binary.children().count(), 2);
        assert_eq!(binary.rhs.as_ref().and_then(Child::as_node), Some(NodeId::new(2)));
    }
}
