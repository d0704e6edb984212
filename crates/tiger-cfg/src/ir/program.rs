//! Whole-program containers: classes, vtables, methods

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::block::Body;
use super::types::{Dec, Type};
use crate::error::{CfgError, CfgResult};

/// A class with its (flattened, inherited-first) field layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    #[serde(default)]
    pub fields: Vec<Dec>,
}

/// One dispatch slot: method name and the class whose body implements it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtableEntry {
    pub method: String,
    pub owner: String,
}

/// Dispatch table of a class, slots in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vtable {
    pub class_id: String,
    pub entries: Vec<VtableEntry>,
}

impl Vtable {
    pub fn owner_of(&self, method: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.method == method)
            .map(|entry| entry.owner.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub class_id: String,
    pub name: String,
    pub ret_ty: Type,
    #[serde(default)]
    pub formals: Vec<Dec>,
    #[serde(default)]
    pub locals: Vec<Dec>,
    pub body: Body,
}

impl Method {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_id, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainMethod {
    #[serde(default)]
    pub locals: Vec<Dec>,
    pub body: Body,
}

/// A lowered program: class layouts, vtables, every method body, and main
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub vtables: Vec<Vtable>,
    #[serde(default)]
    pub methods: Vec<Method>,
    pub main: MainMethod,
}

/// Names a method body within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodRef {
    Main,
    Method(usize),
}

impl Program {
    /// A program made of a single main body
    pub fn from_main(body: Body) -> Self {
        Program {
            classes: Vec::new(),
            vtables: Vec::new(),
            methods: Vec::new(),
            main: MainMethod { locals: Vec::new(), body },
        }
    }

    pub fn body(&self, method: MethodRef) -> CfgResult<&Body> {
        match method {
            MethodRef::Main => Ok(&self.main.body),
            MethodRef::Method(i) => self
                .methods
                .get(i)
                .map(|m| &m.body)
                .ok_or(CfgError::MissingMethod(method)),
        }
    }

    pub fn method_name(&self, method: MethodRef) -> String {
        match self.method(method) {
            Some(m) => m.qualified_name(),
            None if method == MethodRef::Main => "main".to_string(),
            None => method.to_string(),
        }
    }

    /// Main first, then methods in declaration order
    pub fn method_refs(&self) -> impl Iterator<Item = MethodRef> {
        std::iter::once(MethodRef::Main).chain((0..self.methods.len()).map(MethodRef::Method))
    }

    pub fn method(&self, method: MethodRef) -> Option<&Method> {
        match method {
            MethodRef::Main => None,
            MethodRef::Method(i) => self.methods.get(i),
        }
    }

    pub fn find_method(&self, class_id: &str, name: &str) -> Option<MethodRef> {
        self.methods
            .iter()
            .position(|m| m.class_id == class_id && m.name == name)
            .map(MethodRef::Method)
    }

    /// Resolve a virtual call on an object of dynamic class `class_id`.
    ///
    /// Goes through the class vtable; programs without one for the class
    /// fall back to a method declared directly on it.
    pub fn resolve_virtual(&self, class_id: &str, name: &str) -> Option<MethodRef> {
        match self.vtables.iter().find(|v| v.class_id == class_id) {
            Some(vtable) => self.find_method(vtable.owner_of(name)?, name),
            None => self.find_method(class_id, name),
        }
    }

    pub fn class(&self, id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Fields of `this` that a method body can name directly: its class's
    /// fields minus any formal or local of the same name. Empty for main.
    ///
    /// These names outlive the body and may be read or written by any
    /// virtual call it makes.
    pub fn fields_in_scope(&self, method: MethodRef) -> FxHashSet<String> {
        let Some(m) = self.method(method) else {
            return FxHashSet::default();
        };
        let Some(class) = self.class(&m.class_id) else {
            return FxHashSet::default();
        };
        let shadowed = |name: &str| m.formals.iter().chain(&m.locals).any(|dec| dec.id == name);
        class
            .fields
            .iter()
            .filter(|field| !shadowed(&field.id))
            .map(|field| field.id.clone())
            .collect()
    }

    /// Run a fallible analysis over every body
    pub fn analyze<T, E>(
        &self,
        mut f: impl FnMut(MethodRef, &Body) -> Result<T, E>,
    ) -> Result<PerMethod<T>, E> {
        let main = f(MethodRef::Main, &self.main.body)?;
        let methods = self
            .methods
            .iter()
            .enumerate()
            .map(|(i, m)| f(MethodRef::Method(i), &m.body))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(PerMethod { main, methods })
    }

    /// Rebuild the program with every body replaced by `f`'s output
    pub fn try_map_bodies<E>(
        &self,
        mut f: impl FnMut(MethodRef, &Body) -> Result<Body, E>,
    ) -> Result<Program, E> {
        let main = MainMethod {
            locals: self.main.locals.clone(),
            body: f(MethodRef::Main, &self.main.body)?,
        };
        let methods = self
            .methods
            .iter()
            .enumerate()
            .map(|(i, m)| {
                Ok(Method {
                    body: f(MethodRef::Method(i), &m.body)?,
                    ..m.clone()
                })
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Program {
            classes: self.classes.clone(),
            vtables: self.vtables.clone(),
            methods,
            main,
        })
    }
}

/// One value per method body of a program, indexed by [`MethodRef`]
#[derive(Debug, Clone, PartialEq)]
pub struct PerMethod<T> {
    pub main: T,
    pub methods: Vec<T>,
}

impl<T> PerMethod<T> {
    pub fn get(&self, method: MethodRef) -> CfgResult<&T> {
        match method {
            MethodRef::Main => Ok(&self.main),
            MethodRef::Method(i) => self.methods.get(i).ok_or(CfgError::MissingMethod(method)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MethodRef, &T)> {
        std::iter::once((MethodRef::Main, &self.main))
            .chain(self.methods.iter().enumerate().map(|(i, t)| (MethodRef::Method(i), t)))
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodRef::Main => write!(f, "main"),
            MethodRef::Method(i) => write!(f, "method#{}", i),
        }
    }
}
