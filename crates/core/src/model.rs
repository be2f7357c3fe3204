//! Value records returned by host queries.
//!
//! These are plain data: cloning one never touches the host.

use serde::{Deserialize, Serialize};

// ============================================================================
// Symbols
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    #[default]
    Function,
    ImportAddress,
    ImportedFunction,
    Data,
    ImportedData,
    External,
    LibraryFunction,
    SymbolicFunction,
    LocalLabel,
}

impl SymbolKind {
    /// Script-facing name of the kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::ImportAddress => "ImportAddress",
            Self::ImportedFunction => "ImportedFunction",
            Self::Data => "Data",
            Self::ImportedData => "ImportedData",
            Self::External => "External",
            Self::LibraryFunction => "LibraryFunction",
            Self::SymbolicFunction => "SymbolicFunction",
            Self::LocalLabel => "LocalLabel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Fully qualified name.
    pub name: String,
    pub short_name: String,
    pub address: u64,
    pub kind: SymbolKind,
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionSemantics {
    #[default]
    Default,
    ReadOnlyCode,
    ReadOnlyData,
    ReadWriteData,
    External,
}

impl SectionSemantics {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ReadOnlyCode => "code",
            Self::ReadOnlyData | Self::ReadWriteData => "data",
            Self::External => "external",
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWriteData)
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, Self::ReadOnlyCode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub start: u64,
    pub length: u64,
    pub semantics: SectionSemantics,
}

impl Section {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end()
    }
}

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagType {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Name of the tag type this tag belongs to.
    pub tag_type: String,
    pub data: String,
}

// ============================================================================
// Control flow
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    #[default]
    Unconditional,
    False,
    True,
    Call,
    Return,
    Syscall,
    Indirect,
    Exception,
    Unresolved,
    UserDefined,
}

impl BranchKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unconditional => "unconditional",
            Self::False => "false",
            Self::True => "true",
            Self::Call => "call",
            Self::Return => "return",
            Self::Syscall => "syscall",
            Self::Indirect => "indirect",
            Self::Exception => "exception",
            Self::Unresolved => "unresolved",
            Self::UserDefined => "user_defined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEdge {
    pub kind: BranchKind,
    /// Start address of the block the edge leaves.
    pub source: u64,
    /// Start address of the block the edge enters.
    pub target: u64,
    pub back_edge: bool,
}

// ============================================================================
// Intermediate language
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IlLevel {
    Low,
    Medium,
    High,
}

impl IlLevel {
    pub const ALL: [IlLevel; 3] = [IlLevel::Low, IlLevel::Medium, IlLevel::High];

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Low => "LLIL",
            Self::Medium => "MLIL",
            Self::High => "HLIL",
        }
    }
}

/// One IL form of a function, already lifted by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IlFunction {
    pub level: IlLevel,
    pub function_start: u64,
    /// Rendered text of each instruction, indexed by instruction index.
    pub instructions: Vec<String>,
    pub basic_block_count: usize,
}

impl IlFunction {
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        self.instructions.get(index).map(String::as_str)
    }
}

// ============================================================================
// Variables
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    #[default]
    Stack,
    Register,
    Flag,
}

impl VariableKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::Register => "register",
            Self::Flag => "flag",
        }
    }
}

/// Identity of a function variable. Carries no name or type: those are
/// obtained with [`Function::resolve_variable`](crate::Function::resolve_variable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub kind: VariableKind,
    pub index: u32,
    /// Stack offset or register id, depending on `kind`.
    pub storage: i64,
}

/// Immutable resolved view of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariable {
    pub name: String,
    pub type_name: String,
}
