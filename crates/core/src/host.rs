//! Host traits: the query interface the scripting engine consumes.
//!
//! Implementations are provided by the analysis host. The engine never
//! reimplements analysis; it only calls these. All queries are synchronous
//! and side-effect-free on the analysis state unless the method name says
//! otherwise (`set_*`, `write`, `add_*`, `remove_*`, `store_*`).
//!
//! Mutating methods take `&self`: host objects are shared handles and the
//! host owns their synchronization.

use std::rc::Rc;

use crate::metadata::Metadata;
use crate::model::{
    BlockEdge, IlFunction, IlLevel, ResolvedVariable, Section, Symbol, Tag, TagType, VariableRef,
};

/// A loaded binary and its analysis database.
pub trait BinaryView {
    /// Name of the file backing the view.
    fn filename(&self) -> String;

    fn start(&self) -> u64;

    fn length(&self) -> u64;

    fn end(&self) -> u64 {
        self.start().saturating_add(self.length())
    }

    /// Architecture name, if the view has a default architecture.
    fn arch(&self) -> Option<String>;

    fn entry_point(&self) -> Option<u64>;

    /// Translate a virtual address into a file offset. `None` when the
    /// address is not backed by file data.
    fn data_offset_for_address(&self, addr: u64) -> Option<u64>;

    fn sections(&self) -> Vec<Section>;

    /// Sections containing `addr`, in declaration order.
    fn sections_at(&self, addr: u64) -> Vec<Section> {
        self.sections()
            .into_iter()
            .filter(|s| s.contains(addr))
            .collect()
    }

    fn symbols(&self) -> Vec<Symbol>;

    /// Primary symbol defined exactly at `addr`.
    fn symbol_at(&self, addr: u64) -> Option<Symbol>;

    fn comment_at(&self, addr: u64) -> Option<String>;

    /// Set the comment at `addr`. An empty comment removes it.
    fn set_comment_at(&self, addr: u64, comment: &str);

    fn functions(&self) -> Vec<Rc<dyn Function>>;

    /// Function starting exactly at `addr`.
    fn function_at(&self, addr: u64) -> Option<Rc<dyn Function>> {
        self.functions().into_iter().find(|f| f.start() == addr)
    }

    /// Functions with a basic block containing `addr`.
    fn functions_containing(&self, addr: u64) -> Vec<Rc<dyn Function>> {
        self.functions()
            .into_iter()
            .filter(|f| f.block_at(addr).is_some())
            .collect()
    }

    /// Read up to `len` bytes at `addr`. Short reads are not errors.
    fn read(&self, addr: u64, len: usize) -> Vec<u8>;

    /// Write `data` at `addr`, returning the number of bytes written.
    fn write(&self, addr: u64, data: &[u8]) -> usize;

    fn tag_types(&self) -> Vec<TagType>;

    /// Create (or return the existing) tag type named `name`.
    fn create_tag_type(&self, name: &str, icon: &str) -> TagType;

    fn tags_at(&self, addr: u64) -> Vec<Tag>;

    /// Attach a tag. Returns `false` when the tag type does not exist.
    fn add_tag(&self, addr: u64, tag: Tag) -> bool;

    /// Returns `true` if a matching tag was removed.
    fn remove_tag(&self, addr: u64, tag: &Tag) -> bool;

    fn store_metadata(&self, key: &str, value: Metadata);

    fn query_metadata(&self, key: &str) -> Option<Metadata>;

    fn remove_metadata(&self, key: &str);
}

/// An analyzed function.
pub trait Function {
    fn start(&self) -> u64;

    fn name(&self) -> String;

    fn symbol(&self) -> Option<Symbol>;

    /// The view owning this function, if it is still alive.
    fn view(&self) -> Option<Rc<dyn BinaryView>>;

    /// Function-level comment (empty when none).
    fn comment(&self) -> String;

    fn set_comment(&self, comment: &str);

    fn basic_blocks(&self) -> Vec<Rc<dyn BasicBlock>>;

    /// Basic block containing `addr`.
    fn block_at(&self, addr: u64) -> Option<Rc<dyn BasicBlock>> {
        self.basic_blocks().into_iter().find(|b| b.contains(addr))
    }

    fn variables(&self) -> Vec<VariableRef>;

    /// Resolve a variable handle to its current name and type.
    fn resolve_variable(&self, var: &VariableRef) -> Option<ResolvedVariable>;

    /// IL form at `level`, `None` when the host has not produced it.
    fn il(&self, level: IlLevel) -> Option<Rc<IlFunction>>;

    fn llil(&self) -> Option<Rc<IlFunction>> {
        self.il(IlLevel::Low)
    }

    fn mlil(&self) -> Option<Rc<IlFunction>> {
        self.il(IlLevel::Medium)
    }

    fn hlil(&self) -> Option<Rc<IlFunction>> {
        self.il(IlLevel::High)
    }
}

/// A basic block of native code.
pub trait BasicBlock {
    fn start(&self) -> u64;

    /// Exclusive end address.
    fn end(&self) -> u64;

    fn length(&self) -> u64 {
        self.end().saturating_sub(self.start())
    }

    fn contains(&self, addr: u64) -> bool {
        addr >= self.start() && addr < self.end()
    }

    /// Position of the block within its function.
    fn index(&self) -> usize;

    fn function(&self) -> Option<Rc<dyn Function>>;

    fn outgoing_edges(&self) -> Vec<BlockEdge>;

    fn incoming_edges(&self) -> Vec<BlockEdge>;

    fn instruction_count(&self) -> usize;
}
