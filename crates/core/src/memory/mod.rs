//! In-memory analysis database.
//!
//! A complete host implementation backed by a TOML description. The CLI uses
//! it as its analysis host; tests use it as a deterministic fixture.
//!
//! ```toml
//! [view]
//! filename = "hello.bin"
//! start = "0x401000"
//! arch = "x86_64"
//! data = "55 48 89 e5 c3"
//!
//! [[sections]]
//! name = ".text"
//! start = "0x401000"
//! length = 5
//! semantics = "read_only_code"
//!
//! [[functions]]
//! start = "0x401000"
//! name = "main"
//! llil = ["push(rbp)", "rbp = rsp", "return pop"]
//!
//! [[functions.blocks]]
//! start = "0x401000"
//! end = "0x401005"
//! ```

mod function;
mod view;

pub use function::{MemoryBlock, MemoryFunction};
pub use view::MemoryView;

use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;

use crate::address::Address;
use crate::error::DatabaseError;
use crate::model::{BranchKind, SectionSemantics, SymbolKind, TagType, VariableKind};

// ---------------------------------------------------------------------------
// Top-level description
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Database {
    pub view: ViewDef,
    #[serde(default)]
    pub segments: Vec<SegmentDef>,
    #[serde(default)]
    pub sections: Vec<SectionDef>,
    #[serde(default)]
    pub symbols: Vec<SymbolDef>,
    #[serde(default)]
    pub comments: Vec<CommentDef>,
    #[serde(default)]
    pub tag_types: Vec<TagType>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}

#[derive(Debug, Deserialize)]
pub struct ViewDef {
    pub filename: String,
    pub start: Address,
    /// Defaults to the size of `data`.
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub entry_point: Option<Address>,
    /// Hex bytes; whitespace is ignored.
    #[serde(default)]
    pub data: String,
}

/// Maps a virtual address range onto file offsets.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SegmentDef {
    pub start: Address,
    pub length: u64,
    pub file_offset: u64,
}

#[derive(Debug, Deserialize)]
pub struct SectionDef {
    pub name: String,
    pub start: Address,
    pub length: u64,
    #[serde(default)]
    pub semantics: SectionSemantics,
}

#[derive(Debug, Deserialize)]
pub struct SymbolDef {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    pub address: Address,
    #[serde(default)]
    pub kind: SymbolKind,
}

#[derive(Debug, Deserialize)]
pub struct CommentDef {
    pub address: Address,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FunctionDef {
    pub start: Address,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
    #[serde(default)]
    pub variables: Vec<VariableDef>,
    #[serde(default)]
    pub llil: Option<Vec<String>>,
    #[serde(default)]
    pub mlil: Option<Vec<String>>,
    #[serde(default)]
    pub hlil: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BlockDef {
    pub start: Address,
    pub end: Address,
    /// Defaults to the block length (one byte per instruction).
    #[serde(default)]
    pub instructions: Option<usize>,
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
}

#[derive(Debug, Deserialize)]
pub struct EdgeDef {
    pub target: Address,
    #[serde(default)]
    pub kind: BranchKind,
    #[serde(default)]
    pub back_edge: bool,
}

#[derive(Debug, Deserialize)]
pub struct VariableDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub kind: VariableKind,
    #[serde(default)]
    pub storage: i64,
}

impl Database {
    pub fn from_toml(text: &str) -> Result<Self, DatabaseError> {
        toml::from_str(text).map_err(|e| DatabaseError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DatabaseError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Validate the description and materialize the host objects.
    pub fn build(self) -> Result<Rc<MemoryView>, DatabaseError> {
        self.validate()?;
        let data = decode_hex(&self.view.data)?;
        Ok(MemoryView::from_database(self, data))
    }

    fn validate(&self) -> Result<(), DatabaseError> {
        for func in &self.functions {
            for block in &func.blocks {
                if block.end < block.start {
                    return Err(DatabaseError::Validation(format!(
                        "function {:#x}: block {:#x} ends before it starts",
                        func.start.get(),
                        block.start.get()
                    )));
                }
            }
        }
        for seg in &self.segments {
            if seg.start.get().checked_add(seg.length).is_none() {
                return Err(DatabaseError::Validation(format!(
                    "segment {:#x} overflows the address space",
                    seg.start.get()
                )));
            }
        }
        Ok(())
    }
}

/// Convenience: parse and build in one step.
pub fn load_view(text: &str) -> Result<Rc<MemoryView>, DatabaseError> {
    Database::from_toml(text)?.build()
}

fn decode_hex(text: &str) -> Result<Vec<u8>, DatabaseError> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(DatabaseError::Validation(
            "view data has an odd number of hex digits".to_string(),
        ));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0].to_digit(16);
            let lo = pair[1].to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                _ => Err(DatabaseError::Validation(format!(
                    "invalid hex byte '{}{}' in view data",
                    pair[0], pair[1]
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BasicBlock, BinaryView, Function};
    use crate::model::IlLevel;
    use crate::{HostRef, Metadata, Tag};

    const SAMPLE: &str = r#"
[view]
filename = "sample.bin"
start = "0x401000"
arch = "x86_64"
entry_point = "0x401000"
data = "55 48 89 e5 90 90 c3 00 11 22 33 44"

[[segments]]
start = "0x401000"
length = 12
file_offset = 0x200

[[sections]]
name = ".text"
start = "0x401000"
length = 8
semantics = "read_only_code"

[[sections]]
name = ".data"
start = "0x401008"
length = 4
semantics = "read_write_data"

[[symbols]]
name = "main"
address = "0x401000"
kind = "function"

[[comments]]
address = "0x401004"
text = "padding"

[[tag_types]]
name = "Bookmark"
icon = "*"

[[functions]]
start = "0x401000"
comment = "entry"
llil = ["push(rbp)", "rbp = rsp", "return"]
hlil = ["return"]

[[functions.blocks]]
start = "0x401000"
end = "0x401004"
instructions = 2
edges = [{ target = "0x401004", kind = "unconditional" }]

[[functions.blocks]]
start = "0x401004"
end = "0x401007"

[[functions.variables]]
name = "var_8"
type = "int32_t"
storage = -8
"#;

    fn view() -> Rc<MemoryView> {
        load_view(SAMPLE).unwrap()
    }

    #[test]
    fn view_basics() {
        let v = view();
        assert_eq!(v.filename(), "sample.bin");
        assert_eq!(v.start(), 0x401000);
        assert_eq!(v.length(), 12);
        assert_eq!(v.end(), 0x40100c);
        assert_eq!(v.arch().as_deref(), Some("x86_64"));
        assert_eq!(v.entry_point(), Some(0x401000));
    }

    #[test]
    fn file_offsets_follow_segments() {
        let v = view();
        assert_eq!(v.data_offset_for_address(0x401000), Some(0x200));
        assert_eq!(v.data_offset_for_address(0x401004), Some(0x204));
        assert_eq!(v.data_offset_for_address(0x500000), None);
    }

    #[test]
    fn sections_and_symbols() {
        let v = view();
        let at = v.sections_at(0x401009);
        assert_eq!(at.len(), 1);
        assert_eq!(at[0].name, ".data");
        assert!(v.sections_at(0x300000).is_empty());

        let sym = v.symbol_at(0x401000).unwrap();
        assert_eq!(sym.name, "main");
        assert_eq!(sym.short_name, "main");
        assert!(v.symbol_at(0x401001).is_none());
    }

    #[test]
    fn comments_round_trip() {
        let v = view();
        assert_eq!(v.comment_at(0x401004).as_deref(), Some("padding"));
        v.set_comment_at(0x401000, "start here");
        assert_eq!(v.comment_at(0x401000).as_deref(), Some("start here"));
        v.set_comment_at(0x401000, "");
        assert!(v.comment_at(0x401000).is_none());
    }

    #[test]
    fn read_and_write_are_clamped() {
        let v = view();
        assert_eq!(v.read(0x401000, 4), vec![0x55, 0x48, 0x89, 0xe5]);
        assert_eq!(v.read(0x40100a, 10), vec![0x33, 0x44]);
        assert!(v.read(0x300000, 4).is_empty());

        assert_eq!(v.write(0x40100b, &[0xaa, 0xbb]), 1);
        assert_eq!(v.read(0x40100b, 1), vec![0xaa]);
    }

    #[test]
    fn functions_and_blocks() {
        let v = view();
        let f = v.function_at(0x401000).unwrap();
        assert_eq!(f.name(), "main");
        assert_eq!(f.comment(), "entry");
        assert_eq!(f.basic_blocks().len(), 2);

        let b = f.block_at(0x401005).unwrap();
        assert_eq!(b.index(), 1);
        assert_eq!(b.start(), 0x401004);
        assert_eq!(b.instruction_count(), 3);
        assert_eq!(b.incoming_edges().len(), 1);
        assert_eq!(b.incoming_edges()[0].source, 0x401000);
        assert_eq!(b.function().unwrap().start(), 0x401000);

        assert_eq!(v.functions_containing(0x401002).len(), 1);
        assert!(v.functions_containing(0x401008).is_empty());
        let as_dyn: Rc<dyn BinaryView> = v.clone();
        assert_eq!(HostRef::new(&f.view().unwrap()), HostRef::new(&as_dyn));
    }

    #[test]
    fn il_forms_are_optional() {
        let v = view();
        let f = v.function_at(0x401000).unwrap();
        assert_eq!(f.llil().unwrap().instruction_count(), 3);
        assert!(f.mlil().is_none());
        assert_eq!(f.il(IlLevel::High).unwrap().text(0), Some("return"));
    }

    #[test]
    fn variables_resolve() {
        let v = view();
        let f = v.function_at(0x401000).unwrap();
        let vars = f.variables();
        assert_eq!(vars.len(), 1);
        let resolved = f.resolve_variable(&vars[0]).unwrap();
        assert_eq!(resolved.name, "var_8");
        assert_eq!(resolved.type_name, "int32_t");
    }

    #[test]
    fn tags_require_known_type() {
        let v = view();
        let tag = Tag { tag_type: "Bookmark".into(), data: "look".into() };
        assert!(v.add_tag(0x401000, tag.clone()));
        assert!(!v.add_tag(0x401000, Tag { tag_type: "Nope".into(), data: String::new() }));
        assert_eq!(v.tags_at(0x401000), vec![tag.clone()]);
        assert!(v.remove_tag(0x401000, &tag));
        assert!(v.tags_at(0x401000).is_empty());

        let created = v.create_tag_type("Bug", "!");
        assert_eq!(created.name, "Bug");
        assert_eq!(v.tag_types().len(), 2);
        assert_eq!(v.create_tag_type("Bug", "?").icon, "!");
    }

    #[test]
    fn metadata_store() {
        let v = view();
        v.store_metadata("answer", Metadata::Signed(42));
        assert_eq!(v.query_metadata("answer"), Some(Metadata::Signed(42)));
        v.remove_metadata("answer");
        assert!(v.query_metadata("answer").is_none());
    }

    #[test]
    fn default_function_name() {
        let v = load_view(
            r#"
[view]
filename = "x"
start = 0x1000
length = 16

[[functions]]
start = "0x1008"
"#,
        )
        .unwrap();
        assert_eq!(v.function_at(0x1008).unwrap().name(), "sub_1008");
        assert_eq!(v.length(), 16);
        // no segments: identity mapping from view start
        assert_eq!(v.data_offset_for_address(0x1008), Some(8));
    }

    #[test]
    fn bad_block_bounds_rejected() {
        let err = load_view(
            r#"
[view]
filename = "x"
start = 0

[[functions]]
start = 0

[[functions.blocks]]
start = 8
end = 4
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[test]
    fn bad_hex_rejected() {
        let err = load_view("[view]\nfilename = \"x\"\nstart = 0\ndata = \"zz\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid hex byte"));
        let err = load_view("[view]\nfilename = \"x\"\nstart = 0\ndata = \"abc\"\n").unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[test]
    fn parse_errors_reported() {
        let err = load_view("[view]\nstart = 0\n").unwrap_err();
        assert!(matches!(err, DatabaseError::Parse(_)));
    }
}
