//! SAXPY kernel templates.
//!
//! A template wraps the fetch / compute / write-back body in the loops of its
//! index space and declares the kernel around it. The vector template runs
//! one loop over `0..N`; the matrix template nests a row loop over `0..M`
//! and a column loop over `0..N`.

use std::fmt;
use std::str::FromStr;

use fusekernel_graph::{StatementBatch, TerminalKind};
use tracing::{debug, info};

use crate::cache::{fetch_all, write_back_all};
use crate::emit::emit_statement;
use crate::{
    check_identifier, AccessCache, CodegenError, Dialect, IndexSpace, MappingTable, OperandSet,
    Profile, ReadSet, Result, SourceWriter,
};

/// One loop of a template's index space.
struct LoopDim {
    var: &'static str,
    bound: &'static str,
    dim: u32,
}

const VECTOR_LOOPS: &[LoopDim] = &[LoopDim {
    var: "i",
    bound: "N",
    dim: 0,
}];

const MATRIX_LOOPS: &[LoopDim] = &[
    LoopDim {
        var: "i",
        bound: "M",
        dim: 0,
    },
    LoopDim {
        var: "j",
        bound: "N",
        dim: 1,
    },
];

/// Which container shape a template iterates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Elementwise over vectors.
    Vector,
    /// Elementwise over matrices.
    Matrix,
}

impl TemplateKind {
    fn loops(&self) -> &'static [LoopDim] {
        match self {
            TemplateKind::Vector => VECTOR_LOOPS,
            TemplateKind::Matrix => MATRIX_LOOPS,
        }
    }

    /// Names of the size parameters bounding the loops, outermost first.
    pub fn bounds(&self) -> Vec<&'static str> {
        self.loops().iter().map(|l| l.bound).collect()
    }

    /// Index variables the access expressions are written against.
    pub fn index_space(&self) -> IndexSpace<'static> {
        match self {
            TemplateKind::Vector => IndexSpace::Linear("i"),
            TemplateKind::Matrix => IndexSpace::Grid { row: "i", col: "j" },
        }
    }

    /// Check if operands of `kind` may appear in this template.
    pub fn accepts(&self, kind: TerminalKind) -> bool {
        matches!(
            (self, kind),
            (_, TerminalKind::Scalar)
                | (TemplateKind::Vector, TerminalKind::Vector)
                | (TemplateKind::Matrix, TerminalKind::Matrix)
        )
    }

    /// Kernel name used when none is given.
    pub fn default_kernel_name(&self) -> &'static str {
        match self {
            TemplateKind::Vector => "vector_saxpy",
            TemplateKind::Matrix => "matrix_saxpy",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Vector => write!(f, "vector"),
            TemplateKind::Matrix => write!(f, "matrix"),
        }
    }
}

impl FromStr for TemplateKind {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vector" | "vector_saxpy" => Ok(TemplateKind::Vector),
            "matrix" | "matrix_saxpy" => Ok(TemplateKind::Matrix),
            other => Err(CodegenError::UnknownTemplate(other.to_string())),
        }
    }
}

/// Elementwise kernel template over a statement batch.
#[derive(Debug, Clone)]
pub struct SaxpyTemplate<'a> {
    kind: TemplateKind,
    batch: &'a StatementBatch,
    profile: Profile,
    dialect: Dialect,
    name: String,
}

impl<'a> SaxpyTemplate<'a> {
    /// Create a template of the given kind.
    pub fn new(kind: TemplateKind, batch: &'a StatementBatch, profile: Profile) -> Self {
        Self {
            kind,
            batch,
            profile,
            dialect: Dialect::default(),
            name: kind.default_kernel_name().to_string(),
        }
    }

    /// Vector template.
    pub fn vector(batch: &'a StatementBatch, profile: Profile) -> Self {
        Self::new(TemplateKind::Vector, batch, profile)
    }

    /// Matrix template.
    pub fn matrix(batch: &'a StatementBatch, profile: Profile) -> Self {
        Self::new(TemplateKind::Matrix, batch, profile)
    }

    /// Set the target dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the kernel name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Template kind.
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Launch profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Check the batch and profile without generating source.
    pub fn check(&self) -> Result<OperandSet> {
        let tables = self.mapping_tables()?;
        self.operands(&tables)
    }

    /// Generate the kernel.
    pub fn generate(&self) -> Result<GeneratedKernel> {
        let tables = self.mapping_tables()?;
        let operands = self.operands(&tables)?;
        let reads = ReadSet::collect(&tables);
        let space = self.kind.index_space();

        let mut cache = AccessCache::new();
        let mut body = SourceWriter::new(1);

        for l in self.kind.loops() {
            self.profile
                .loop_header(&mut body, self.dialect, l.var, l.bound, l.dim);
            body.open_block();
        }

        fetch_all(&tables, &reads, space, &mut cache, &mut body)?;
        let fetched = cache.len();
        for (graph, table) in self.batch.iter().zip(&tables) {
            body.line(emit_statement(graph, table, &cache, space)?);
        }
        write_back_all(&tables, space, &mut cache, &mut body)?;

        for _ in self.kind.loops() {
            body.close_block();
        }

        let mut parameters: Vec<String> = operands
            .iter()
            .map(|operand| operand.parameter(self.dialect))
            .collect();
        parameters.extend(
            self.kind
                .bounds()
                .into_iter()
                .map(|bound| self.dialect.value_parameter("unsigned int", bound)),
        );

        info!(
            kernel = %self.name,
            template = %self.kind,
            dialect = %self.dialect,
            statements = self.batch.len(),
            operands = operands.len(),
            fetched,
            "generated kernel"
        );

        Ok(GeneratedKernel {
            name: self.name.clone(),
            dialect: self.dialect,
            parameters,
            body: body.finish(),
            local_size: self.profile.local_sizes(),
            global_size: self.profile.global_sizes(),
        })
    }

    /// Validate the profile and build one mapping table per statement.
    fn mapping_tables(&self) -> Result<Vec<MappingTable>> {
        self.profile.validate()?;
        if self.kind == TemplateKind::Vector && self.profile.dimensions() != 1 {
            return Err(CodegenError::InvalidProfile(
                "the vector template needs a one-dimensional profile".to_string(),
            ));
        }
        if self.batch.is_empty() {
            return Err(CodegenError::EmptyBatch);
        }

        self.batch
            .iter()
            .enumerate()
            .map(|(i, graph)| {
                debug!(statement = i, nodes = graph.len(), "mapping statement");
                MappingTable::build(graph)
            })
            .collect()
    }

    fn operands(&self, tables: &[MappingTable]) -> Result<OperandSet> {
        check_identifier(&self.name)?;
        let operands = OperandSet::collect(tables)?;
        if let Some(bad) = operands.iter().find(|o| !self.kind.accepts(o.kind())) {
            return Err(bad.incompatible(&format!("not supported by the {} template", self.kind)));
        }
        Ok(operands)
    }
}

/// Generated kernel source and launch shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKernel {
    /// Kernel function name.
    pub name: String,
    /// Target dialect.
    pub dialect: Dialect,
    /// Parameter declarations in order.
    pub parameters: Vec<String>,
    /// Function body, indented, without the enclosing braces.
    pub body: String,
    /// Work-group shape.
    pub local_size: (usize, usize),
    /// Total work-items per dimension.
    pub global_size: (usize, usize),
}

impl GeneratedKernel {
    /// Kernel signature line.
    pub fn signature(&self) -> String {
        format!(
            "{} {}({})",
            self.dialect.kernel_qualifier(),
            self.name,
            self.parameters.join(", ")
        )
    }

    /// Complete kernel source.
    pub fn source(&self) -> String {
        format!("{}\n{{\n{}}}\n", self.signature(), self.body)
    }
}

impl fmt::Display for GeneratedKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Decomposition;
    use fusekernel_graph::{GraphBuilder, Layout, ScalarType, Terminal};

    fn vector(name: &str) -> Terminal {
        Terminal::vector(name, ScalarType::F32, 1024)
    }

    fn copy_batch() -> StatementBatch {
        StatementBatch::new().with(GraphBuilder::new().assign(vector("y"), vector("x")).unwrap())
    }

    #[test]
    fn test_template_kind() {
        assert_eq!(TemplateKind::Vector.bounds(), vec!["N"]);
        assert_eq!(TemplateKind::Matrix.bounds(), vec!["M", "N"]);
        assert!(TemplateKind::Vector.accepts(TerminalKind::Scalar));
        assert!(!TemplateKind::Vector.accepts(TerminalKind::Matrix));
        assert!(!TemplateKind::Matrix.accepts(TerminalKind::Vector));
        assert_eq!("matrix".parse::<TemplateKind>().unwrap(), TemplateKind::Matrix);
        assert!("tensor".parse::<TemplateKind>().is_err());
    }

    #[test]
    fn test_vector_copy_source() {
        let batch = copy_batch();
        let kernel = SaxpyTemplate::vector(&batch, Profile::vector(128, 8, Decomposition::Global))
            .generate()
            .unwrap();

        let expected = "\
__kernel void vector_saxpy(__global float* x, __global float* y, unsigned int N)
{
    for (unsigned int i = get_global_id(0); i < N; i += get_global_size(0))
    {
        float x_private = x[i];
        float y_private;
        (y_private = x_private);
        y[i] = y_private;
    }
}
";
        assert_eq!(kernel.source(), expected);
        assert_eq!(kernel.global_size, (1024, 1));
    }

    #[test]
    fn test_vector_rejects_matrix_operand() {
        let a = Terminal::matrix("A", ScalarType::F32, Layout::RowMajor, 4, 4);
        let b = Terminal::matrix("B", ScalarType::F32, Layout::RowMajor, 4, 4);
        let batch = StatementBatch::new().with(GraphBuilder::new().assign(b, a).unwrap());

        let err = SaxpyTemplate::vector(&batch, Profile::default())
            .generate()
            .unwrap_err();
        assert!(matches!(err, CodegenError::IncompatibleOperand { .. }));
    }

    #[test]
    fn test_vector_rejects_two_dimensional_profile() {
        let batch = copy_batch();
        let profile = Profile::matrix((16, 16), (2, 2), Decomposition::Global);
        assert!(matches!(
            SaxpyTemplate::vector(&batch, profile).generate(),
            Err(CodegenError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_empty_batch() {
        let batch = StatementBatch::new();
        assert!(matches!(
            SaxpyTemplate::vector(&batch, Profile::default()).generate(),
            Err(CodegenError::EmptyBatch)
        ));
    }

    #[test]
    fn test_check_reports_operands() {
        let batch = copy_batch();
        let operands = SaxpyTemplate::vector(&batch, Profile::default())
            .check()
            .unwrap();
        assert_eq!(operands.len(), 2);
    }

    #[test]
    fn test_signature_cuda() {
        let batch = copy_batch();
        let kernel = SaxpyTemplate::vector(&batch, Profile::default())
            .with_dialect(Dialect::Cuda)
            .with_name("copy")
            .generate()
            .unwrap();
        assert_eq!(
            kernel.signature(),
            "extern \"C\" __global__ void copy(float* __restrict__ x, float* __restrict__ y, unsigned int N)"
        );
        assert_eq!(kernel.to_string(), kernel.source());
    }

    #[test]
    fn test_invalid_kernel_name() {
        let batch = copy_batch();
        let result = SaxpyTemplate::vector(&batch, Profile::default())
            .with_name("../copy")
            .generate();
        assert!(matches!(result, Err(CodegenError::InvalidName { name, .. }) if name == "../copy"));
    }

    #[test]
    fn test_operand_shadowing_loop_bound() {
        let batch = StatementBatch::new().with(
            GraphBuilder::new()
                .assign(vector("y"), Terminal::vector("N", ScalarType::F32, 1024))
                .unwrap(),
        );
        assert!(matches!(
            SaxpyTemplate::vector(&batch, Profile::default()).check(),
            Err(CodegenError::InvalidName { name, .. }) if name == "N"
        ));
    }
}
