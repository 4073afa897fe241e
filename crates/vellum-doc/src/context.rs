//! Document contexts and their parent chains.

use std::fmt;
use std::sync::Arc;

use vellum_arena::Arena;
use vellum_core::{ContextId, FieldKind, Heap, Ptr, Value, ValueKind};

use crate::access::Reader;
use crate::config::ContextConfig;
use crate::error::BuildError;
use crate::layout;
use crate::pool::NamePool;
use crate::shape::{Shape, ShapePool};

/// A published, read-only context that children can derive from.
pub type SharedContext = Arc<Context>;

/// A document's allocation and editing scope.
///
/// Owns one arena, one name pool and one shape pool, plus an optional parent.
/// All writes go through `&mut self` into this context's own storage; the
/// parent is an [`Arc`] and can only be read, so a child can never touch an
/// ancestor's arena or pools. Dropping a context releases its own storage
/// only; the parent lives on as long as any child (or anyone else) holds it.
///
/// ```
/// use vellum_doc::{Context, ContextConfig};
///
/// let mut schema = Context::new(ContextConfig::default()).unwrap();
/// let name = schema.intern_name("name").unwrap();
/// let schema = schema.into_shared();
///
/// let mut doc = Context::with_parent(schema.clone(), ContextConfig::default()).unwrap();
/// assert_eq!(doc.intern_name("name").unwrap(), name);
/// assert!(doc.names().is_empty());
/// ```
pub struct Context {
    id: ContextId,
    config: ContextConfig,
    pub(crate) arena: Arena,
    names: NamePool,
    shapes: ShapePool,
    root: Value,
    parent: Option<SharedContext>,
}

impl Context {
    /// Create a root context with a fresh arena.
    pub fn new(config: ContextConfig) -> Result<Self, BuildError> {
        Self::build(config, None)
    }

    /// Create a context that reads through `parent`.
    pub fn with_parent(parent: SharedContext, config: ContextConfig) -> Result<Self, BuildError> {
        Self::build(config, Some(parent))
    }

    fn build(config: ContextConfig, parent: Option<SharedContext>) -> Result<Self, BuildError> {
        config.validate()?;
        let arena = Arena::new(config.arena.clone())?;
        let ctx = Self {
            id: ContextId::next(),
            config,
            arena,
            names: NamePool::new(),
            shapes: ShapePool::new(),
            root: Value::Null,
            parent,
        };
        tracing::debug!(
            ctx = %ctx.id,
            parent = ?ctx.parent.as_ref().map(|p| p.id),
            depth = ctx.depth(),
            "context created"
        );
        Ok(ctx)
    }

    /// Publish this context so children can derive from it.
    pub fn into_shared(self) -> SharedContext {
        tracing::debug!(ctx = %self.id, names = self.names.len(), shapes = self.shapes.len(), "context shared");
        Arc::new(self)
    }

    /// This context's identity.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The configuration this context was built with.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The parent, if any.
    pub fn parent(&self) -> Option<&SharedContext> {
        self.parent.as_ref()
    }

    /// This context followed by its ancestors, nearest first.
    pub fn chain(&self) -> impl Iterator<Item = &Context> {
        std::iter::successors(Some(self), |c| c.parent.as_deref())
    }

    /// Number of ancestors.
    pub fn depth(&self) -> usize {
        self.chain().count() - 1
    }

    /// The context's own arena.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mutable access to the context's own arena, for collaborators that
    /// manage raw buffers.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// The context's own name pool (ancestors' entries not included).
    pub fn names(&self) -> &NamePool {
        &self.names
    }

    /// The context's own shape pool.
    pub fn shapes(&self) -> &ShapePool {
        &self.shapes
    }

    /// A reader over this context and its ancestors.
    pub fn reader(&self) -> Reader<'_> {
        Reader::new(self)
    }

    /// The document root.
    pub fn root(&self) -> Value {
        self.root
    }

    /// Replace the document root. The value must already be owned.
    pub fn set_root(&mut self, value: Value) -> Result<(), BuildError> {
        if !self.is_owned(value) {
            return Err(BuildError::NotOwned { kind: value.kind() });
        }
        self.root = value;
        Ok(())
    }

    /// Whether this context's own arena (not an ancestor's) issued `ptr`.
    pub fn owns_locally(&self, ptr: Ptr) -> bool {
        self.arena.owns(ptr)
    }

    /// Intern `name`, searching the chain first.
    ///
    /// On a miss the bytes are stored in this context's arena and recorded
    /// in this context's pool only.
    pub fn intern_name(&mut self, name: &str) -> Result<Ptr, BuildError> {
        if let Some(ptr) = self.lookup_name(name) {
            tracing::trace!(ctx = %self.id, name, %ptr, "name interning hit");
            return Ok(ptr);
        }
        let ptr = self.alloc_text(name.as_bytes())?;
        self.names.insert(name.as_bytes(), ptr);
        Ok(ptr)
    }

    /// Find an interned name anywhere in the chain without interning it.
    pub fn lookup_name(&self, name: &str) -> Option<Ptr> {
        self.chain().find_map(|c| c.names.get(name.as_bytes()))
    }

    /// Whether some pool in the chain issued `ptr` as a name.
    pub fn is_interned(&self, ptr: Ptr) -> bool {
        self.chain().any(|c| c.names.issued(ptr))
    }

    /// Intern a record shape, searching the chain first.
    ///
    /// Names must already be interned in this chain. An empty field list
    /// yields the empty shape without allocating.
    pub fn intern_shape(&mut self, fields: &[(Ptr, FieldKind)]) -> Result<Shape, BuildError> {
        if fields.is_empty() {
            return Ok(Shape::empty());
        }
        if let Some(ptr) = self.chain().find_map(|c| c.shapes.get(fields)) {
            return Ok(Shape::layout(ptr, fields));
        }
        if let Some(&(name, _)) = fields.iter().find(|(name, _)| !self.owns(*name)) {
            tracing::warn!(ctx = %self.id, %name, "shape field name is not owned by this chain");
            return Err(BuildError::NotOwned {
                kind: ValueKind::Symbol,
            });
        }
        let ptr = self.alloc_bytes(&Shape::encode(fields))?;
        self.shapes.insert(fields, ptr);
        Ok(Shape::layout(ptr, fields))
    }

    /// Store a text payload in this context's arena.
    pub(crate) fn alloc_text(&mut self, bytes: &[u8]) -> Result<Ptr, BuildError> {
        let buf = layout::encode_text(bytes).ok_or(BuildError::Alloc(
            vellum_arena::ArenaError::OutOfMemory {
                requested: bytes.len(),
                limit: Some(u32::MAX as usize),
            },
        ))?;
        self.alloc_bytes(&buf)
    }

    /// Allocate and fill a block in this context's arena.
    pub(crate) fn alloc_bytes(&mut self, bytes: &[u8]) -> Result<Ptr, BuildError> {
        let ptr = self.arena.alloc(bytes.len())?;
        self.arena.write(ptr, bytes)?;
        Ok(ptr)
    }
}

impl Heap for Context {
    fn resolve(&self, ptr: Ptr, len: usize) -> Option<&[u8]> {
        self.chain().find_map(|c| c.arena.bytes(ptr, len))
    }

    fn owns(&self, ptr: Ptr) -> bool {
        self.chain().any(|c| c.arena.owns(ptr))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("parent", &self.parent.as_ref().map(|p| p.id))
            .field("names", &self.names.len())
            .field("shapes", &self.shapes.len())
            .field("arena", &self.arena)
            .finish()
    }
}
