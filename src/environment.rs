//! Scope frames.
//!
//! Every frame lives in one arena owned by the interpreter and is addressed by
//! an [`EnvId`].  Closures hold the id of the frame they captured, not an
//! owning pointer, so a frame that defines a function never keeps itself alive
//! through that function.  Frames are reclaimed by [`Environments::collect`],
//! a mark-and-sweep over everything reachable from the given roots.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::{debug, info};

use crate::callable::{Callable, Instance};
use crate::error::{LoxError, Result};
use crate::value::Value;

/// Handle to a frame in [`Environments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(usize);

/// One scope frame: its own bindings plus a link to the enclosing frame.
#[derive(Debug)]
struct Frame<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<EnvId>,
}

/// Arena of frames.  Freed slots are reused.
#[derive(Debug, Default)]
pub struct Environments<'a> {
    frames: Vec<Option<Frame<'a>>>,
    free: Vec<usize>,
    allocated_since_collect: usize,
}

impl<'a> Environments<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an empty frame whose parent is `enclosing`.
    pub fn push(&mut self, enclosing: Option<EnvId>) -> EnvId {
        let frame = Frame {
            values: HashMap::new(),
            enclosing,
        };

        self.allocated_since_collect += 1;

        match self.free.pop() {
            Some(slot) => {
                self.frames[slot] = Some(frame);
                EnvId(slot)
            }
            None => {
                self.frames.push(Some(frame));
                EnvId(self.frames.len() - 1)
            }
        }
    }

    /// Number of frames currently allocated.
    pub fn live(&self) -> usize {
        self.frames.len() - self.free.len()
    }

    pub fn allocated_since_collect(&self) -> usize {
        self.allocated_since_collect
    }

    fn frame(&self, env: EnvId) -> Option<&Frame<'a>> {
        self.frames.get(env.0).and_then(Option::as_ref)
    }

    fn frame_mut(&mut self, env: EnvId) -> Option<&mut Frame<'a>> {
        self.frames.get_mut(env.0).and_then(Option::as_mut)
    }

    /// Bind `name` in `env`, replacing any existing binding.
    pub fn define(&mut self, env: EnvId, name: &str, value: Value<'a>) {
        match self.frame_mut(env) {
            Some(frame) => {
                frame.values.insert(name.to_string(), value);
            }
            None => debug!("Dropping definition of '{}' into freed frame {:?}", name, env),
        }
    }

    /// Search `env` and its ancestors for `name`.
    pub fn get(&self, env: EnvId, name: &str, line: usize) -> Result<Value<'a>> {
        let mut current: Option<EnvId> = Some(env);

        while let Some(frame) = current.and_then(|id| self.frame(id)) {
            if let Some(value) = frame.values.get(name) {
                return Ok(value.clone());
            }
            current = frame.enclosing;
        }

        Err(undefined(name, line))
    }

    /// Overwrite the nearest existing binding.  Never creates one.
    pub fn assign(&mut self, env: EnvId, name: &str, value: Value<'a>, line: usize) -> Result<()> {
        let mut current: Option<EnvId> = Some(env);

        while let Some(id) = current {
            let Some(frame) = self.frame_mut(id) else {
                break;
            };

            if let Some(slot) = frame.values.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            current = frame.enclosing;
        }

        Err(undefined(name, line))
    }

    /// Read `name` from the frame exactly `distance` hops up, without searching.
    pub fn get_at(&self, env: EnvId, distance: usize, name: &str, line: usize) -> Result<Value<'a>> {
        self.ancestor(env, distance)
            .and_then(|id| self.frame(id))
            .and_then(|frame| frame.values.get(name).cloned())
            .ok_or_else(|| undefined(name, line))
    }

    /// Write `name` in the frame exactly `distance` hops up.
    pub fn assign_at(
        &mut self,
        env: EnvId,
        distance: usize,
        name: &str,
        value: Value<'a>,
        line: usize,
    ) -> Result<()> {
        let frame = self
            .ancestor(env, distance)
            .and_then(|id| self.frame_mut(id))
            .ok_or_else(|| undefined(name, line))?;
        frame.values.insert(name.to_string(), value);

        Ok(())
    }

    fn ancestor(&self, env: EnvId, distance: usize) -> Option<EnvId> {
        let mut id = env;

        for _ in 0..distance {
            id = self.frame(id)?.enclosing?;
        }

        Some(id)
    }

    /// Free every frame not reachable from `roots`.  A frame is reachable
    /// through its parent link, through function values (their closure) and
    /// through structs and instances (their methods' closures and their
    /// fields).  Returns the number of frames freed.
    pub fn collect(&mut self, roots: &[EnvId]) -> usize {
        let mut marked: Vec<bool> = vec![false; self.frames.len()];
        let mut pending: Vec<EnvId> = roots.to_vec();
        let mut objects: Vec<Rc<RefCell<Instance<'a>>>> = Vec::new();
        let mut seen: HashSet<*const RefCell<Instance<'a>>> = HashSet::new();

        while !pending.is_empty() || !objects.is_empty() {
            while let Some(id) = pending.pop() {
                if marked.get(id.0).copied().unwrap_or(true) {
                    continue;
                }
                marked[id.0] = true;

                if let Some(frame) = self.frame(id) {
                    pending.extend(frame.enclosing);
                    for value in frame.values.values() {
                        trace(value, &mut pending, &mut objects);
                    }
                }
            }

            while let Some(instance) = objects.pop() {
                if !seen.insert(Rc::as_ptr(&instance)) {
                    continue;
                }

                let instance = instance.borrow();
                pending.extend(instance.class().methods().map(|method| method.closure()));
                for value in instance.fields() {
                    trace(value, &mut pending, &mut objects);
                }
            }
        }

        let mut freed: usize = 0;
        for (slot, frame) in self.frames.iter_mut().enumerate() {
            if frame.is_some() && !marked[slot] {
                *frame = None;
                self.free.push(slot);
                freed += 1;
            }
        }

        self.allocated_since_collect = 0;

        info!("Collected {} frame(s), {} live", freed, self.live());

        freed
    }
}

/// Queue the frames and instances `value` keeps alive.
fn trace<'a>(
    value: &Value<'a>,
    pending: &mut Vec<EnvId>,
    objects: &mut Vec<Rc<RefCell<Instance<'a>>>>,
) {
    match value {
        Value::Callable(Callable::Function(function)) => pending.push(function.closure()),
        Value::Callable(Callable::Class(class)) => {
            pending.extend(class.methods().map(|method| method.closure()))
        }
        Value::Instance(instance) => objects.push(Rc::clone(instance)),
        Value::Callable(Callable::Native(_))
        | Value::Number(_)
        | Value::String(_)
        | Value::Bool(_)
        | Value::Nil => {}
    }
}

fn undefined(name: &str, line: usize) -> LoxError {
    debug!("Lookup of '{}' failed on line {}", name, line);

    LoxError::runtime(line, format!("Undefined variable '{}'.", name))
}
