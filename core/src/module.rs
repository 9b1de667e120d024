use crate::val::{Type, Val};
use anyhow::{Result, anyhow, bail};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Host function callable from bytecode. A method receives its receiver as `args[0]`.
pub type BuiltinFn = fn(&[Val]) -> Result<Val>;

/// Opaque reference to a resolved builtin, stable for the resolver's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuiltinHandle(u32);

impl BuiltinHandle {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Accepted argument counts of a builtin (receiver excluded for methods).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(u16),
    AtLeast(u16),
    Any,
}

impl Arity {
    #[inline]
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Exact(n) => argc == n as usize,
            Arity::AtLeast(n) => argc >= n as usize,
            Arity::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Any => f.write_str("any number of"),
        }
    }
}

/// Maps names to host capabilities for the dispatch engine.
///
/// The engine holds one of these behind an `Arc` and never reflects on the
/// host; everything it can reach goes through this trait.
pub trait BuiltinResolver: Send + Sync {
    /// Global function lookup (`LOAD_NAME`, `CALL_BUILTIN`).
    fn resolve(&self, name: &str) -> Option<BuiltinHandle>;

    /// Method lookup keyed by the receiver's runtime type (`CALL_METHOD`).
    fn resolve_method(&self, receiver: &Val, name: &str) -> Option<BuiltinHandle>;

    fn invoke(&self, handle: BuiltinHandle, receiver: Option<&Val>, args: &[Val]) -> Result<Val>;

    fn name_of(&self, handle: BuiltinHandle) -> Option<&str>;

    /// Checked by the engine before `invoke`; resolvers without arity
    /// information accept anything.
    fn arity(&self, _handle: BuiltinHandle) -> Arity {
        Arity::Any
    }
}

/// One exported function of a [`Module`].
#[derive(Debug, Clone, Copy)]
pub struct Export {
    pub name: &'static str,
    pub arity: Arity,
    pub func: BuiltinFn,
}

impl Export {
    pub const fn new(name: &'static str, arity: Arity, func: BuiltinFn) -> Self {
        Self { name, arity, func }
    }
}

/// A named group of builtins, exposed to bytecode as `"<module>.<fn>"`.
pub trait Module: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn enabled(&self) -> bool {
        true
    }

    /// Functions registered under the module prefix.
    fn exports(&self) -> Vec<Export>;

    /// Receiver methods the module contributes, keyed by receiver type.
    fn methods(&self) -> Vec<(Type, Export)> {
        Vec::new()
    }
}

#[derive(Debug)]
struct Entry {
    name: Arc<str>,
    arity: Arity,
    func: BuiltinFn,
}

/// Standard [`BuiltinResolver`]: a flat table of host functions plus name and
/// method indexes into it.
#[derive(Debug, Default)]
pub struct BuiltinRegistry {
    entries: Vec<Entry>,
    globals: FxHashMap<Arc<str>, BuiltinHandle>,
    methods: FxHashMap<Type, FxHashMap<Arc<str>, BuiltinHandle>>,
    modules: Vec<String>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_entry(&mut self, name: Arc<str>, arity: Arity, func: BuiltinFn) -> Result<BuiltinHandle> {
        let index = u32::try_from(self.entries.len()).map_err(|_| anyhow!("builtin table is full"))?;
        self.entries.push(Entry { name, arity, func });
        Ok(BuiltinHandle(index))
    }

    /// Register a global function. Names are unique.
    pub fn register_fn(&mut self, name: &str, arity: Arity, func: BuiltinFn) -> Result<BuiltinHandle> {
        if self.globals.contains_key(name) {
            bail!("builtin '{}' is already registered", name);
        }
        let name: Arc<str> = Arc::from(name);
        let handle = self.push_entry(Arc::clone(&name), arity, func)?;
        self.globals.insert(name, handle);
        Ok(handle)
    }

    /// Register a method on every receiver of type `ty`.
    pub fn register_method(&mut self, ty: Type, name: &str, arity: Arity, func: BuiltinFn) -> Result<BuiltinHandle> {
        if self.methods.get(&ty).is_some_and(|table| table.contains_key(name)) {
            bail!("method '{}' is already registered on {}", name, ty);
        }
        let qualified: Arc<str> = Arc::from(format!("{ty}.{name}"));
        let handle = self.push_entry(qualified, arity, func)?;
        self.methods.entry(ty).or_default().insert(Arc::from(name), handle);
        Ok(handle)
    }

    /// Register every export of `module` as `"<module>.<name>"`, plus its methods.
    pub fn register_module(&mut self, module: &dyn Module) -> Result<()> {
        if !module.enabled() {
            return Ok(());
        }
        let prefix = module.name();
        for export in module.exports() {
            self.register_fn(&format!("{prefix}.{}", export.name), export.arity, export.func)?;
        }
        for (ty, export) in module.methods() {
            self.register_method(ty, export.name, export.arity, export.func)?;
        }
        self.modules.push(prefix.to_string());
        Ok(())
    }

    pub fn module_names(&self) -> &[String] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, handle: BuiltinHandle) -> Option<&Entry> {
        self.entries.get(handle.0 as usize)
    }
}

impl BuiltinResolver for BuiltinRegistry {
    fn resolve(&self, name: &str) -> Option<BuiltinHandle> {
        self.globals.get(name).copied()
    }

    fn resolve_method(&self, receiver: &Val, name: &str) -> Option<BuiltinHandle> {
        self.methods.get(&receiver.type_of())?.get(name).copied()
    }

    fn invoke(&self, handle: BuiltinHandle, receiver: Option<&Val>, args: &[Val]) -> Result<Val> {
        let entry = self
            .entry(handle)
            .ok_or_else(|| anyhow!("unknown builtin handle #{}", handle.0))?;
        if !entry.arity.accepts(args.len()) {
            bail!(
                "{} expects {} arguments, got {}",
                entry.name,
                entry.arity,
                args.len()
            );
        }
        match receiver {
            None => (entry.func)(args),
            Some(recv) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(recv.clone());
                full.extend_from_slice(args);
                (entry.func)(&full)
            }
        }
    }

    fn name_of(&self, handle: BuiltinHandle) -> Option<&str> {
        self.entry(handle).map(|entry| entry.name.as_ref())
    }

    fn arity(&self, handle: BuiltinHandle) -> Arity {
        self.entry(handle).map_or(Arity::Any, |entry| entry.arity)
    }
}
