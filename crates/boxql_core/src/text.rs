//! String interning for boxql.
//!
//! Names in a parsed document (field names, aliases, fragment names, type
//! conditions) are interned once so comparisons during validation are integer
//! comparisons.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// An interned text identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Text(u32);

impl Text {
    /// Creates a new text from a raw index.
    #[must_use]
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

/// A string interner that deduplicates strings.
///
/// Single-threaded: one interner backs one parsed document and the validation
/// run over it.
#[derive(Debug)]
pub struct Interner {
    map: RefCell<FxHashMap<Rc<str>, Text>>,
    strings: RefCell<Vec<Rc<str>>>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    /// Creates a new interner with the built-in scalar names pre-registered.
    #[must_use]
    pub fn new() -> Self {
        let interner = Self {
            map: RefCell::new(FxHashMap::default()),
            strings: RefCell::new(Vec::new()),
        };

        for name in [
            "Int",
            "Float",
            "String",
            "Boolean",
            "ID",
            "__typename",
            "skip",
            "include",
            "if",
        ] {
            interner.intern(name);
        }

        interner
    }

    /// Interns a string, returning its identifier.
    pub fn intern(&self, s: &str) -> Text {
        if let Some(&id) = self.map.borrow().get(s) {
            return id;
        }

        let mut strings = self.strings.borrow_mut();
        let id = Text(strings.len() as u32);
        let shared: Rc<str> = Rc::from(s);
        strings.push(Rc::clone(&shared));
        self.map.borrow_mut().insert(shared, id);
        id
    }

    /// Gets the string for an identifier.
    #[must_use]
    pub fn get(&self, id: Text) -> String {
        self.resolve(id).map(|s| s.to_string()).unwrap_or_default()
    }

    /// Gets a shared handle to the string for an identifier.
    #[must_use]
    pub fn resolve(&self, id: Text) -> Option<Rc<str>> {
        self.strings.borrow().get(id.0 as usize).cloned()
    }

    /// Looks up an already interned string without interning it.
    #[must_use]
    pub fn lookup(&self, s: &str) -> Option<Text> {
        self.map.borrow().get(s).copied()
    }

    /// Returns the number of interned strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.borrow().len()
    }

    /// Returns true if no strings are interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.borrow().is_empty()
    }
}
