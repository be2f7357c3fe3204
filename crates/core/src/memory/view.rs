use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::function::MemoryFunction;
use super::{Database, SegmentDef};
use crate::host::{BinaryView, Function};
use crate::metadata::Metadata;
use crate::model::{Section, Symbol, SymbolKind, Tag, TagType};

/// A binary view whose bytes and analysis live entirely in memory.
#[derive(Debug)]
pub struct MemoryView {
    filename: String,
    start: u64,
    length: u64,
    arch: Option<String>,
    entry_point: Option<u64>,
    data: RefCell<Vec<u8>>,
    segments: Vec<SegmentDef>,
    sections: Vec<Section>,
    symbols: Vec<Symbol>,
    comments: RefCell<BTreeMap<u64, String>>,
    tag_types: RefCell<Vec<TagType>>,
    tags: RefCell<BTreeMap<u64, Vec<Tag>>>,
    metadata: RefCell<BTreeMap<String, Metadata>>,
    functions: Vec<Rc<MemoryFunction>>,
}

impl MemoryView {
    pub(super) fn from_database(db: Database, data: Vec<u8>) -> Rc<Self> {
        let Database {
            view,
            segments,
            sections,
            symbols,
            comments,
            tag_types,
            functions,
        } = db;

        let mut symbols: Vec<Symbol> = symbols
            .into_iter()
            .map(|s| Symbol {
                short_name: s.short_name.unwrap_or_else(|| s.name.clone()),
                name: s.name,
                address: s.address.get(),
                kind: s.kind,
            })
            .collect();

        // Named functions without a symbol get one, like an auto-defined
        // symbol in a real database.
        for func in &functions {
            let start = func.start.get();
            if let Some(name) = &func.name {
                if !symbols.iter().any(|s| s.address == start) {
                    symbols.push(Symbol {
                        name: name.clone(),
                        short_name: name.clone(),
                        address: start,
                        kind: SymbolKind::Function,
                    });
                }
            }
        }

        let sections = sections
            .into_iter()
            .map(|s| Section {
                name: s.name,
                start: s.start.get(),
                length: s.length,
                semantics: s.semantics,
            })
            .collect();

        let comments = comments
            .into_iter()
            .filter(|c| !c.text.is_empty())
            .map(|c| (c.address.get(), c.text))
            .collect();

        let length = view.length.unwrap_or(data.len() as u64);

        Rc::new_cyclic(|weak_view| {
            let functions = functions
                .into_iter()
                .map(|def| {
                    let symbol = symbols
                        .iter()
                        .find(|s| s.address == def.start.get())
                        .cloned();
                    MemoryFunction::build(def, symbol, weak_view.clone())
                })
                .collect();

            MemoryView {
                filename: view.filename,
                start: view.start.get(),
                length,
                arch: view.arch,
                entry_point: view.entry_point.map(|a| a.get()),
                data: RefCell::new(data),
                segments,
                sections,
                symbols,
                comments: RefCell::new(comments),
                tag_types: RefCell::new(tag_types),
                tags: RefCell::new(BTreeMap::new()),
                metadata: RefCell::new(BTreeMap::new()),
                functions,
            }
        })
    }

    /// Index into the backing byte buffer for `addr`.
    fn data_index(&self, addr: u64) -> Option<usize> {
        let offset = addr.checked_sub(self.start)?;
        let index = usize::try_from(offset).ok()?;
        (index < self.data.borrow().len()).then_some(index)
    }
}

impl BinaryView for MemoryView {
    fn filename(&self) -> String {
        self.filename.clone()
    }

    fn start(&self) -> u64 {
        self.start
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn arch(&self) -> Option<String> {
        self.arch.clone()
    }

    fn entry_point(&self) -> Option<u64> {
        self.entry_point
    }

    fn data_offset_for_address(&self, addr: u64) -> Option<u64> {
        if self.segments.is_empty() {
            return (addr >= self.start && addr < self.end()).then(|| addr - self.start);
        }
        self.segments
            .iter()
            .find(|seg| addr >= seg.start.get() && addr - seg.start.get() < seg.length)
            .map(|seg| seg.file_offset + (addr - seg.start.get()))
    }

    fn sections(&self) -> Vec<Section> {
        self.sections.clone()
    }

    fn symbols(&self) -> Vec<Symbol> {
        self.symbols.clone()
    }

    fn symbol_at(&self, addr: u64) -> Option<Symbol> {
        self.symbols.iter().find(|s| s.address == addr).cloned()
    }

    fn comment_at(&self, addr: u64) -> Option<String> {
        self.comments.borrow().get(&addr).cloned()
    }

    fn set_comment_at(&self, addr: u64, comment: &str) {
        let mut comments = self.comments.borrow_mut();
        if comment.is_empty() {
            comments.remove(&addr);
        } else {
            comments.insert(addr, comment.to_string());
        }
    }

    fn functions(&self) -> Vec<Rc<dyn Function>> {
        self.functions
            .iter()
            .map(|f| f.clone() as Rc<dyn Function>)
            .collect()
    }

    fn read(&self, addr: u64, len: usize) -> Vec<u8> {
        let Some(index) = self.data_index(addr) else {
            return Vec::new();
        };
        let data = self.data.borrow();
        let end = index.saturating_add(len).min(data.len());
        data[index..end].to_vec()
    }

    fn write(&self, addr: u64, bytes: &[u8]) -> usize {
        let Some(index) = self.data_index(addr) else {
            return 0;
        };
        let mut data = self.data.borrow_mut();
        let count = bytes.len().min(data.len() - index);
        data[index..index + count].copy_from_slice(&bytes[..count]);
        count
    }

    fn tag_types(&self) -> Vec<TagType> {
        self.tag_types.borrow().clone()
    }

    fn create_tag_type(&self, name: &str, icon: &str) -> TagType {
        let mut types = self.tag_types.borrow_mut();
        if let Some(existing) = types.iter().find(|t| t.name == name) {
            return existing.clone();
        }
        let created = TagType {
            name: name.to_string(),
            icon: icon.to_string(),
        };
        types.push(created.clone());
        created
    }

    fn tags_at(&self, addr: u64) -> Vec<Tag> {
        self.tags.borrow().get(&addr).cloned().unwrap_or_default()
    }

    fn add_tag(&self, addr: u64, tag: Tag) -> bool {
        if !self.tag_types.borrow().iter().any(|t| t.name == tag.tag_type) {
            return false;
        }
        self.tags.borrow_mut().entry(addr).or_default().push(tag);
        true
    }

    fn remove_tag(&self, addr: u64, tag: &Tag) -> bool {
        let mut tags = self.tags.borrow_mut();
        let Some(list) = tags.get_mut(&addr) else {
            return false;
        };
        let Some(pos) = list.iter().position(|t| t == tag) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            tags.remove(&addr);
        }
        true
    }

    fn store_metadata(&self, key: &str, value: Metadata) {
        self.metadata.borrow_mut().insert(key.to_string(), value);
    }

    fn query_metadata(&self, key: &str) -> Option<Metadata> {
        self.metadata.borrow().get(key).cloned()
    }

    fn remove_metadata(&self, key: &str) {
        self.metadata.borrow_mut().remove(key);
    }
}
