use core::fmt;
use std::{cell::RefCell, collections::HashMap, rc::Rc};

use itertools::Itertools;

use crate::{error::SnekError, value::Value};

/// A lexical scope. Frames are shared: every closure created in a frame and
/// every child frame keeps its parent alive.
pub struct Frame {
    bindings: RefCell<HashMap<Rc<str>, Value>>,
    parent: Option<Rc<Frame>>,
    sealed: bool,
}

impl Frame {
    /// A parentless frame whose bindings can never change afterwards. Used for
    /// the builtin frame.
    pub(crate) fn root(bindings: HashMap<Rc<str>, Value>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(bindings),
            parent: None,
            sealed: true,
        })
    }

    pub fn new(parent: &Rc<Frame>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
            sealed: false,
        })
    }

    pub fn parent(&self) -> Option<&Rc<Frame>> {
        self.parent.as_ref()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    fn ensure_writable(&self, name: &str) -> Result<(), SnekError> {
        if self.sealed {
            return Err(SnekError::evaluation(format!("cannot modify builtin binding '{}'", name)));
        }
        Ok(())
    }

    /// Binds `name` in this frame, replacing any binding it already has here
    pub fn define(&self, name: impl Into<Rc<str>>, value: Value) -> Result<(), SnekError> {
        let name = name.into();
        self.ensure_writable(&name)?;
        self.bindings.borrow_mut().insert(name, value);
        Ok(())
    }

    /// Finds the nearest binding of `name`, searching outwards through the parents
    pub fn lookup(&self, name: &str) -> Result<Value, SnekError> {
        let mut frame = self;
        loop {
            if let Some(value) = frame.bindings.borrow().get(name) {
                return Ok(value.clone());
            }
            match &frame.parent {
                Some(parent) => frame = &**parent,
                None => return Err(SnekError::unbound(name)),
            }
        }
    }

    /// Overwrites the nearest existing binding of `name` in place
    pub fn assign(&self, name: &str, value: Value) -> Result<Value, SnekError> {
        let mut frame = self;
        loop {
            if frame.contains_local(name) {
                frame.ensure_writable(name)?;
                frame.bindings.borrow_mut().insert(Rc::from(name), value.clone());
                return Ok(value);
            }
            match &frame.parent {
                Some(parent) => frame = &**parent,
                None => return Err(SnekError::unbound(name)),
            }
        }
    }

    /// Removes `name` from this frame only, parents are never consulted
    pub fn delete(&self, name: &str) -> Result<Value, SnekError> {
        if !self.contains_local(name) {
            return Err(SnekError::unbound(name));
        }
        self.ensure_writable(name)?;
        self.bindings.borrow_mut()
            .remove(name)
            .ok_or_else(|| SnekError::unbound(name))
    }

    // Drops every binding so closures defined here release their hold on
    // this frame
    pub(crate) fn clear(&self) {
        if !self.sealed {
            let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
            drop(bindings);
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.bindings.borrow().keys().sorted().join(", ");
        f.debug_struct("Frame")
            .field("bindings", &format_args!("[{}]", names))
            .field("has_parent", &self.parent.is_some())
            .field("sealed", &self.sealed)
            .finish()
    }
}
