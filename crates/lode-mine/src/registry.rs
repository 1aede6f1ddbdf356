//! Process-wide mine registry.
//!
//! The registry is the read-only table that nested invocations and the
//! type router resolve request types against. It is built once at startup,
//! usually by one or more [`Registrar`]s, and then shared by cloning.

use crate::mine::Mine;
use lode_core::{Basket, ErrorExporter, LodeError, LodeResult, LogExporter, Request};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL_REGISTRY: OnceLock<MineRegistry> = OnceLock::new();

/// Wires capabilities into a registry at startup.
///
/// A registrar constructs stations and terminals, assembles shafts into
/// mines, and hands the mines to the builder. New capabilities are added by
/// writing a registrar, never by changing the engine.
///
/// # Example
///
/// ```
/// use lode_core::LodeResult;
/// use lode_mine::{Mine, MineRegistry, Registrar, RegistryBuilder};
///
/// struct Inventory;
///
/// impl Registrar for Inventory {
///     fn register(&self, builder: &mut RegistryBuilder) -> LodeResult<()> {
///         builder.add_mine(Mine::new("inventory"));
///         Ok(())
///     }
/// }
///
/// let registry = MineRegistry::builder()
///     .registrar(&Inventory)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert!(registry.mine("inventory").is_some());
/// ```
pub trait Registrar {
    /// Adds this registrar's mines to `builder`.
    fn register(&self, builder: &mut RegistryBuilder) -> LodeResult<()>;
}

struct RegistryInner {
    mines: Vec<Mine>,
    /// Request type to index in `mines`.
    routes: HashMap<TypeId, usize>,
    error_exporter: Arc<dyn ErrorExporter>,
}

/// Read-only map from request type to the mine that serves it.
///
/// Cloning is cheap; all clones share the same table.
#[derive(Clone)]
pub struct MineRegistry {
    inner: Arc<RegistryInner>,
}

impl MineRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Installs `registry` as the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Internal`] if a registry is already installed.
    pub fn install(registry: Self) -> LodeResult<()> {
        GLOBAL_REGISTRY
            .set(registry)
            .map_err(|_| LodeError::internal("a mine registry is already installed"))?;
        tracing::debug!("global mine registry installed");
        Ok(())
    }

    /// Returns the process-wide registry, if one was installed.
    pub fn global() -> Option<&'static Self> {
        GLOBAL_REGISTRY.get()
    }

    /// Returns the mine serving `R`.
    pub fn mine_for<R: Request>(&self) -> Option<&Mine> {
        self.inner
            .routes
            .get(&TypeId::of::<R>())
            .map(|&index| &self.inner.mines[index])
    }

    /// Returns the mine called `name`.
    pub fn mine(&self, name: &str) -> Option<&Mine> {
        self.inner.mines.iter().find(|mine| mine.name() == name)
    }

    /// Returns `true` if some mine serves `R`.
    pub fn handles<R: Request>(&self) -> bool {
        self.inner.routes.contains_key(&TypeId::of::<R>())
    }

    /// Kinds of all served request types, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.inner.mines.iter().flat_map(Mine::kinds).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Number of mines.
    pub fn len(&self) -> usize {
        self.inner.mines.len()
    }

    /// Returns `true` if the registry holds no mines.
    pub fn is_empty(&self) -> bool {
        self.inner.mines.is_empty()
    }

    /// Sends a basket to the mine serving its request type.
    ///
    /// The registry is attached to the basket so that nested calls made
    /// from inside the traversal resolve against the same registry.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Routing`] if no mine serves `R`, otherwise
    /// whatever the shaft returns.
    pub async fn send<R: Request>(&self, mut basket: Basket<R>) -> LodeResult<Basket<R>> {
        let Some(mine) = self.mine_for::<R>() else {
            let error = LodeError::routing(R::kind(), "no mine serves this request type");
            self.report(&error);
            return Err(error);
        };
        basket.extensions_mut().insert(self.clone());
        mine.send(basket).await
    }

    /// Sends `request` in a fresh basket and returns its response.
    ///
    /// # Errors
    ///
    /// See [`MineRegistry::send`].
    pub async fn request<R: Request>(&self, request: R) -> LodeResult<R::Response> {
        self.send(Basket::new(request)).await?.into_response()
    }

    /// Reports a failure raised outside any shaft.
    pub fn report(&self, error: &LodeError) {
        self.inner.error_exporter.export_error(error);
    }
}

impl std::fmt::Debug for MineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.inner.mines.iter().map(Mine::name).collect();
        f.debug_struct("MineRegistry")
            .field("mines", &names)
            .field("routes", &self.inner.routes.len())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`MineRegistry`].
pub struct RegistryBuilder {
    mines: Vec<Mine>,
    error_exporter: Option<Arc<dyn ErrorExporter>>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            mines: Vec::new(),
            error_exporter: None,
        }
    }

    /// Adds a mine.
    #[must_use]
    pub fn mine(mut self, mine: Mine) -> Self {
        self.mines.push(mine);
        self
    }

    /// Adds a mine through a mutable reference, for registrars.
    pub fn add_mine(&mut self, mine: Mine) -> &mut Self {
        self.mines.push(mine);
        self
    }

    /// Runs a registrar against this builder.
    ///
    /// # Errors
    ///
    /// Returns whatever the registrar returns.
    pub fn registrar<T: Registrar + ?Sized>(mut self, registrar: &T) -> LodeResult<Self> {
        registrar.register(&mut self)?;
        Ok(self)
    }

    /// Sets the exporter for routing failures raised by the registry.
    /// Defaults to [`LogExporter`].
    #[must_use]
    pub fn error_exporter(mut self, exporter: Arc<dyn ErrorExporter>) -> Self {
        self.error_exporter = Some(exporter);
        self
    }

    /// Builds the registry.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::DuplicateShaft`] if two mines serve the same
    /// request type.
    pub fn build(self) -> LodeResult<MineRegistry> {
        let mut routes = HashMap::new();
        for (index, mine) in self.mines.iter().enumerate() {
            for (type_id, kind) in mine.routes() {
                if let Some(&previous) = routes.get(&type_id) {
                    let owner: &Mine = &self.mines[previous];
                    return Err(LodeError::duplicate_shaft(
                        kind,
                        format!("{} and {}", owner.name(), mine.name()),
                    ));
                }
                routes.insert(type_id, index);
            }
        }

        tracing::debug!(
            mines = self.mines.len(),
            routes = routes.len(),
            "mine registry built"
        );

        Ok(MineRegistry {
            inner: Arc::new(RegistryInner {
                mines: self.mines,
                routes,
                error_exporter: self.error_exporter.unwrap_or_else(|| Arc::new(LogExporter)),
            }),
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("mines", &self.mines.len())
            .finish_non_exhaustive()
    }
}
