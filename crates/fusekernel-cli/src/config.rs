//! TOML kernel descriptions.
//!
//! A description names the operands once and lists each statement as an
//! explicit node sequence, root first:
//!
//! ```toml
//! [kernel]
//! name = "axpy"
//! template = "vector"
//!
//! [[operands]]
//! name = "x"
//! kind = "vector"
//! type = "f32"
//! size = 1024
//!
//! [[statements]]
//! nodes = [
//!     { op = "inplace_add", lhs = { operand = "y" }, rhs = { node = 1 } },
//!     { op = "mult", lhs = { operand = "alpha" }, rhs = { operand = "x" } },
//! ]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use fusekernel_codegen::{Decomposition, Dialect, Profile, SaxpyTemplate, TemplateKind};
use fusekernel_graph::{
    Child, ExpressionGraph, Layout, MatrixDesc, Node, NodeId, OperatorType, ScalarType,
    StatementBatch, Terminal, VectorDesc,
};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Parsed kernel description file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelDescription {
    /// Kernel identity and target.
    #[serde(default)]
    pub kernel: KernelSection,
    /// Launch profile; a template default is used when absent.
    #[serde(default)]
    pub profile: Option<Profile>,
    /// Operand declarations.
    #[serde(default)]
    pub operands: Vec<OperandSpec>,
    /// Statements, fused in order.
    #[serde(default)]
    pub statements: Vec<StatementSpec>,
}

/// `[kernel]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelSection {
    /// Kernel function name.
    pub name: Option<String>,
    /// `vector` or `matrix`.
    #[serde(default = "default_template")]
    pub template: String,
    /// `opencl` or `cuda`.
    #[serde(default = "default_dialect")]
    pub dialect: String,
}

impl Default for KernelSection {
    fn default() -> Self {
        Self {
            name: None,
            template: default_template(),
            dialect: default_dialect(),
        }
    }
}

fn default_template() -> String {
    "vector".to_string()
}

fn default_dialect() -> String {
    "opencl".to_string()
}

fn default_stride() -> usize {
    1
}

fn default_matrix_stride() -> (usize, usize) {
    (1, 1)
}

/// Storage order as spelled in descriptions.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutSpec {
    /// Row-major.
    #[default]
    RowMajor,
    /// Column-major.
    ColumnMajor,
}

impl From<LayoutSpec> for Layout {
    fn from(spec: LayoutSpec) -> Self {
        match spec {
            LayoutSpec::RowMajor => Layout::RowMajor,
            LayoutSpec::ColumnMajor => Layout::ColumnMajor,
        }
    }
}

/// One `[[operands]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperandSpec {
    /// Host scalar.
    Scalar {
        /// Operand name.
        name: String,
        /// Element type.
        #[serde(rename = "type")]
        scalar_type: String,
    },
    /// Dense vector.
    Vector {
        /// Operand name.
        name: String,
        /// Element type.
        #[serde(rename = "type")]
        scalar_type: String,
        /// Element count.
        size: usize,
        /// Offset of the first element.
        #[serde(default)]
        start: usize,
        /// Distance between elements.
        #[serde(default = "default_stride")]
        stride: usize,
    },
    /// Dense matrix.
    Matrix {
        /// Operand name.
        name: String,
        /// Element type.
        #[serde(rename = "type")]
        scalar_type: String,
        /// Storage order.
        #[serde(default)]
        layout: LayoutSpec,
        /// Logical rows.
        rows: usize,
        /// Logical columns.
        cols: usize,
        /// Allocated rows.
        internal_rows: Option<usize>,
        /// Allocated columns.
        internal_cols: Option<usize>,
        /// Offset as `[row, col]`.
        #[serde(default)]
        start: (usize, usize),
        /// Strides as `[row, col]`.
        #[serde(default = "default_matrix_stride")]
        stride: (usize, usize),
    },
}

impl OperandSpec {
    /// Declared name.
    pub fn name(&self) -> &str {
        match self {
            OperandSpec::Scalar { name, .. }
            | OperandSpec::Vector { name, .. }
            | OperandSpec::Matrix { name, .. } => name,
        }
    }

    /// Build the terminal.
    pub fn to_terminal(&self) -> CliResult<Terminal> {
        let terminal = match self {
            OperandSpec::Scalar { name, scalar_type } => {
                Terminal::scalar(name.clone(), scalar_type.parse::<ScalarType>()?)
            }
            OperandSpec::Vector {
                name,
                scalar_type,
                size,
                start,
                stride,
            } => {
                if *stride == 0 {
                    return Err(CliError::Config(format!(
                        "vector '{name}' has a zero stride"
                    )));
                }
                Terminal::Vector(
                    VectorDesc::new(name.clone(), scalar_type.parse()?, *size)
                        .with_range(*start, *stride),
                )
            }
            OperandSpec::Matrix {
                name,
                scalar_type,
                layout,
                rows,
                cols,
                internal_rows,
                internal_cols,
                start,
                stride,
            } => {
                let internal = (internal_rows.unwrap_or(*rows), internal_cols.unwrap_or(*cols));
                if internal.0 < *rows || internal.1 < *cols {
                    return Err(CliError::Config(format!(
                        "matrix '{name}' has internal size {}x{} smaller than {rows}x{cols}",
                        internal.0, internal.1
                    )));
                }
                Terminal::Matrix(
                    MatrixDesc::new(name.clone(), scalar_type.parse()?, (*layout).into(), *rows, *cols)
                        .with_internal_size(internal.0, internal.1)
                        .with_range(*start, *stride),
                )
            }
        };
        Ok(terminal)
    }
}

/// One `[[statements]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatementSpec {
    /// Nodes, root first.
    pub nodes: Vec<NodeSpec>,
}

/// One node of a statement.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    /// Operator name (`assign`, `add`, `sqrt`, ...).
    pub op: String,
    /// Left (or only) operand.
    pub lhs: ChildSpec,
    /// Right operand of binary operators.
    pub rhs: Option<ChildSpec>,
}

/// Reference to a node or a declared operand.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChildSpec {
    /// `{ node = 1 }`
    Node {
        /// Node index within the statement.
        node: u32,
    },
    /// `{ operand = "x" }`
    Operand {
        /// Declared operand name.
        operand: String,
    },
}

impl KernelDescription {
    /// Load a description from a file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path)?;
        let description = Self::parse(&text)?;
        debug!(
            path = %path.display(),
            operands = description.operands.len(),
            statements = description.statements.len(),
            "loaded kernel description"
        );
        Ok(description)
    }

    /// Parse a description from TOML text.
    pub fn parse(text: &str) -> CliResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Selected template.
    pub fn template_kind(&self) -> CliResult<TemplateKind> {
        Ok(self.kernel.template.parse()?)
    }

    /// Target dialect, optionally overridden from the command line.
    pub fn dialect(&self, override_name: Option<&str>) -> CliResult<Dialect> {
        Ok(override_name
            .unwrap_or(self.kernel.dialect.as_str())
            .parse()?)
    }

    /// Launch profile, or the template's default.
    pub fn profile(&self) -> CliResult<Profile> {
        if let Some(profile) = &self.profile {
            return Ok(profile.clone());
        }
        Ok(match self.template_kind()? {
            TemplateKind::Vector => Profile::default(),
            TemplateKind::Matrix => Profile::matrix((16, 16), (16, 16), Decomposition::Global),
        })
    }

    /// Declared operands by name.
    pub fn terminals(&self) -> CliResult<BTreeMap<String, Terminal>> {
        let mut terminals = BTreeMap::new();
        for spec in &self.operands {
            let terminal = spec.to_terminal()?;
            if terminals.insert(spec.name().to_string(), terminal).is_some() {
                return Err(CliError::Config(format!(
                    "operand '{}' is declared twice",
                    spec.name()
                )));
            }
        }
        Ok(terminals)
    }

    /// Build and validate every statement.
    pub fn batch(&self) -> CliResult<StatementBatch> {
        let terminals = self.terminals()?;
        self.statements
            .iter()
            .enumerate()
            .map(|(i, statement)| {
                statement.to_graph(&terminals).map_err(|e| match e {
                    CliError::Graph(g) => {
                        CliError::Validation(format!("statement {i}: {g}"))
                    }
                    other => other,
                })
            })
            .collect()
    }

    /// Assemble the template for a batch built from this description.
    pub fn template<'a>(
        &self,
        batch: &'a StatementBatch,
        dialect_override: Option<&str>,
    ) -> CliResult<SaxpyTemplate<'a>> {
        let kind = self.template_kind()?;
        let mut template = SaxpyTemplate::new(kind, batch, self.profile()?)
            .with_dialect(self.dialect(dialect_override)?);
        if let Some(name) = &self.kernel.name {
            template = template.with_name(name.clone());
        }
        Ok(template)
    }
}

impl StatementSpec {
    fn to_graph(&self, terminals: &BTreeMap<String, Terminal>) -> CliResult<ExpressionGraph> {
        let nodes = self
            .nodes
            .iter()
            .map(|spec| -> CliResult<Node> {
                let op: OperatorType = spec.op.parse()?;
                let lhs = resolve(&spec.lhs, terminals)?;
                let rhs = spec
                    .rhs
                    .as_ref()
                    .map(|child| resolve(child, terminals))
                    .transpose()?;
                Ok(Node { op, lhs, rhs })
            })
            .collect::<CliResult<Vec<_>>>()?;
        Ok(ExpressionGraph::new(nodes)?)
    }
}

fn resolve(child: &ChildSpec, terminals: &BTreeMap<String, Terminal>) -> CliResult<Child> {
    match child {
        ChildSpec::Node { node } => Ok(Child::Node(NodeId::new(*node))),
        ChildSpec::Operand { operand } => terminals
            .get(operand)
            .cloned()
            .map(Child::Terminal)
            .ok_or_else(|| CliError::Config(format!("unknown operand '{operand}'"))),
    }
}
