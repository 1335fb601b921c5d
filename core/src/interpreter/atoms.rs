//! Interned exception atoms
//!
//! An exception category is identified by an atom: a small integer handed out
//! once per distinct name. Catch filters compare atoms, never strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

/* ===================== Atom Table ===================== */

#[derive(Default)]
struct AtomTable {
    names: Vec<&'static str>,
    index: HashMap<&'static str, u32>,
}

fn table() -> &'static RwLock<AtomTable> {
    static TABLE: OnceLock<RwLock<AtomTable>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(AtomTable::default()))
}

/// Interned exception category
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom(u32);

impl Atom {
    /// Intern `name`, creating the atom on first use
    pub fn intern(name: &str) -> Atom {
        if let Some(atom) = Atom::lookup(name) {
            return atom;
        }

        let mut table = table().write().unwrap_or_else(|e| e.into_inner());
        if let Some(&id) = table.index.get(name) {
            return Atom(id);
        }

        // Atoms live for the whole process.
        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let id = table.names.len() as u32;
        table.names.push(name);
        table.index.insert(name, id);
        Atom(id)
    }

    /// Find an existing atom without creating one
    pub fn lookup(name: &str) -> Option<Atom> {
        let table = table().read().unwrap_or_else(|e| e.into_inner());
        table.index.get(name).copied().map(Atom)
    }

    pub fn as_str(&self) -> &'static str {
        let table = table().read().unwrap_or_else(|e| e.into_inner());
        table.names.get(self.0 as usize).copied().unwrap_or("")
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({})", self.as_str())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Atom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Atom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Atom::intern(&name))
    }
}

/* ===================== Built-in Categories ===================== */

/// Exception categories raised by the core itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Except {
    NoData,
    EntityNotFound,
    DuplicateName,
    InvalidValue,
    NotImplemented,
    ArgumentMissed,
    WrongDataType,
    ServerRefused,
    Timeout,
}

impl Except {
    pub fn name(&self) -> &'static str {
        match self {
            Except::NoData => "NoData",
            Except::EntityNotFound => "EntityNotFound",
            Except::DuplicateName => "DuplicateName",
            Except::InvalidValue => "InvalidValue",
            Except::NotImplemented => "NotImplemented",
            Except::ArgumentMissed => "ArgumentMissed",
            Except::WrongDataType => "WrongDataType",
            Except::ServerRefused => "ServerRefused",
            Except::Timeout => "Timeout",
        }
    }

    pub fn atom(&self) -> Atom {
        Atom::intern(self.name())
    }
}
