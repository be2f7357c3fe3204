//! Context snapshot and the dirty-tracking cache.

use binlua_core::{BasicBlock, BinaryView, Function, HostRef};

/// The host's focus state at one point in time.
///
/// Object fields compare by handle identity, integers by value. A `None`
/// handle is an ordinary, comparable "absent" value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub view: Option<HostRef<dyn BinaryView>>,
    pub function: Option<HostRef<dyn Function>>,
    pub block: Option<HostRef<dyn BasicBlock>>,
    pub address: u64,
    pub selection_start: u64,
    pub selection_end: u64,
}

/// Live snapshot plus the one last committed by the synchronizer.
#[derive(Debug, Default)]
pub struct ContextCache {
    pub live: ContextSnapshot,
    /// `None` until the first commit, so the first sync always runs.
    cached: Option<ContextSnapshot>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_changed(&self) -> bool {
        self.cached.as_ref() != Some(&self.live)
    }

    pub fn commit(&mut self) {
        self.cached = Some(self.live.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binlua_core::memory::load_view;
    use std::rc::Rc;

    fn committed() -> ContextCache {
        let mut cache = ContextCache::new();
        cache.commit();
        cache
    }

    #[test]
    fn fresh_cache_reports_change() {
        let cache = ContextCache::new();
        assert!(cache.has_changed());
        assert!(!committed().has_changed());
    }

    #[test]
    fn each_field_marks_dirty() {
        let view: Rc<dyn BinaryView> =
            load_view("[view]\nfilename = \"a\"\nstart = 0\n").unwrap();

        let setters: Vec<Box<dyn Fn(&mut ContextSnapshot)>> = vec![
            Box::new(|s: &mut ContextSnapshot| s.address = 0x2000),
            Box::new(|s: &mut ContextSnapshot| s.selection_start = 1),
            Box::new(|s: &mut ContextSnapshot| s.selection_end = 9),
            Box::new(move |s: &mut ContextSnapshot| s.view = Some(HostRef::new(&view))),
        ];
        for set in setters {
            let mut cache = committed();
            set(&mut cache.live);
            assert!(cache.has_changed());
            cache.commit();
            assert!(!cache.has_changed());
        }
    }

    #[test]
    fn same_value_is_not_a_change() {
        let mut cache = committed();
        cache.live.address = 0x2000;
        cache.commit();
        cache.live.address = 0x2000;
        assert!(!cache.has_changed());
    }

    #[test]
    fn handles_compare_by_identity() {
        let text = "[view]\nfilename = \"same\"\nstart = 0\n";
        let a: Rc<dyn BinaryView> = load_view(text).unwrap();
        let b: Rc<dyn BinaryView> = load_view(text).unwrap();

        let mut cache = committed();
        cache.live.view = Some(HostRef::new(&a));
        cache.commit();
        cache.live.view = Some(HostRef::new(&a));
        assert!(!cache.has_changed());
        cache.live.view = Some(HostRef::new(&b));
        assert!(cache.has_changed());
        cache.live.view = None;
        assert!(cache.has_changed());
    }
}
