use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::view::MemoryView;
use super::FunctionDef;
use crate::host::{BasicBlock, BinaryView, Function};
use crate::model::{
    BlockEdge, IlFunction, IlLevel, ResolvedVariable, Symbol, VariableRef,
};

#[derive(Debug)]
pub struct MemoryFunction {
    start: u64,
    symbol: Option<Symbol>,
    comment: RefCell<String>,
    blocks: Vec<Rc<MemoryBlock>>,
    variables: Vec<(VariableRef, ResolvedVariable)>,
    il: [Option<Rc<IlFunction>>; 3],
    view: Weak<MemoryView>,
}

impl MemoryFunction {
    pub(super) fn build(
        def: FunctionDef,
        symbol: Option<Symbol>,
        view: Weak<MemoryView>,
    ) -> Rc<Self> {
        let start = def.start.get();
        let block_count = def.blocks.len();

        let outgoing: Vec<Vec<BlockEdge>> = def
            .blocks
            .iter()
            .map(|b| {
                b.edges
                    .iter()
                    .map(|e| BlockEdge {
                        kind: e.kind,
                        source: b.start.get(),
                        target: e.target.get(),
                        back_edge: e.back_edge,
                    })
                    .collect()
            })
            .collect();

        let variables = def
            .variables
            .into_iter()
            .enumerate()
            .map(|(index, v)| {
                let var = VariableRef {
                    kind: v.kind,
                    index: index as u32,
                    storage: v.storage,
                };
                let resolved = ResolvedVariable {
                    name: v.name,
                    type_name: v.type_name,
                };
                (var, resolved)
            })
            .collect();

        let lift = |level: IlLevel, text: Option<Vec<String>>| {
            text.map(|instructions| {
                Rc::new(IlFunction {
                    level,
                    function_start: start,
                    instructions,
                    basic_block_count: block_count,
                })
            })
        };
        let il = [
            lift(IlLevel::Low, def.llil),
            lift(IlLevel::Medium, def.mlil),
            lift(IlLevel::High, def.hlil),
        ];

        let block_defs = def.blocks;
        Rc::new_cyclic(|weak_fn| {
            let blocks = block_defs
                .iter()
                .enumerate()
                .map(|(index, b)| {
                    let incoming = outgoing
                        .iter()
                        .flatten()
                        .filter(|e| e.target == b.start.get())
                        .cloned()
                        .collect();
                    let (start, end) = (b.start.get(), b.end.get());
                    Rc::new(MemoryBlock {
                        start,
                        end,
                        index,
                        instructions: b
                            .instructions
                            .unwrap_or_else(|| (end - start) as usize),
                        outgoing: outgoing[index].clone(),
                        incoming,
                        function: weak_fn.clone(),
                    })
                })
                .collect();

            MemoryFunction {
                start,
                symbol,
                comment: RefCell::new(def.comment),
                blocks,
                variables,
                il,
                view,
            }
        })
    }
}

impl Function for MemoryFunction {
    fn start(&self) -> u64 {
        self.start
    }

    fn name(&self) -> String {
        match &self.symbol {
            Some(sym) => sym.name.clone(),
            None => format!("sub_{:x}", self.start),
        }
    }

    fn symbol(&self) -> Option<Symbol> {
        self.symbol.clone()
    }

    fn view(&self) -> Option<Rc<dyn BinaryView>> {
        self.view.upgrade().map(|v| v as Rc<dyn BinaryView>)
    }

    fn comment(&self) -> String {
        self.comment.borrow().clone()
    }

    fn set_comment(&self, comment: &str) {
        *self.comment.borrow_mut() = comment.to_string();
    }

    fn basic_blocks(&self) -> Vec<Rc<dyn BasicBlock>> {
        self.blocks
            .iter()
            .map(|b| b.clone() as Rc<dyn BasicBlock>)
            .collect()
    }

    fn variables(&self) -> Vec<VariableRef> {
        self.variables.iter().map(|(v, _)| *v).collect()
    }

    fn resolve_variable(&self, var: &VariableRef) -> Option<ResolvedVariable> {
        self.variables
            .iter()
            .find(|(v, _)| v == var)
            .map(|(_, r)| r.clone())
    }

    fn il(&self, level: IlLevel) -> Option<Rc<IlFunction>> {
        let slot = match level {
            IlLevel::Low => 0,
            IlLevel::Medium => 1,
            IlLevel::High => 2,
        };
        self.il[slot].clone()
    }
}

#[derive(Debug)]
pub struct MemoryBlock {
    start: u64,
    end: u64,
    index: usize,
    instructions: usize,
    outgoing: Vec<BlockEdge>,
    incoming: Vec<BlockEdge>,
    function: Weak<MemoryFunction>,
}

impl BasicBlock for MemoryBlock {
    fn start(&self) -> u64 {
        self.start
    }

    fn end(&self) -> u64 {
        self.end
    }

    fn index(&self) -> usize {
        self.index
    }

    fn function(&self) -> Option<Rc<dyn Function>> {
        self.function.upgrade().map(|f| f as Rc<dyn Function>)
    }

    fn outgoing_edges(&self) -> Vec<BlockEdge> {
        self.outgoing.clone()
    }

    fn incoming_edges(&self) -> Vec<BlockEdge> {
        self.incoming.clone()
    }

    fn instruction_count(&self) -> usize {
        self.instructions
    }
}
