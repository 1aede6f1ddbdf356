//! Mines: shaft registries dispatched by request type.
//!
//! A [`Mine`] maps each request type to the one shaft that serves it. It
//! can also hold common stations that several of its shafts share (a
//! data-access mine typically builds one shaft per operation and puts the
//! same security and logging stations in front of each).
//!
//! # Example
//!
//! ```
//! use lode_core::{Basket, BoxFuture, LodeResult, Options, Reply, Request, RequestId};
//! use lode_mine::{Applies, Mine};
//! use lode_shaft::stations::AccessStation;
//! use lode_shaft::Terminal;
//!
//! struct GetUser {
//!     id: RequestId,
//!     options: Options,
//! }
//!
//! impl Request for GetUser {
//!     type Response = Reply<String>;
//!     fn id(&self) -> RequestId { self.id }
//!     fn options(&self) -> &Options { &self.options }
//! }
//!
//! struct Lookup;
//!
//! impl Terminal<GetUser> for Lookup {
//!     fn produce<'a>(&'a self, basket: &'a mut Basket<GetUser>) -> BoxFuture<'a, LodeResult<()>> {
//!         Box::pin(async move {
//!             let reply = Reply::ok(basket.request().id, "ann".to_string());
//!             basket.set_response(reply)
//!         })
//!     }
//! }
//!
//! let mut mine = Mine::new("users");
//! mine.add_common_station(AccessStation::allow_all(), Applies::All);
//!
//! let shaft = mine.shaft_builder::<GetUser>().terminal(Lookup).build().unwrap();
//! assert_eq!(shaft.station_names(), vec!["access"]);
//!
//! mine.add_shaft(shaft).unwrap();
//! assert!(mine.handles::<GetUser>());
//! ```

use lode_core::{Basket, ErrorExporter, LodeError, LodeResult, LogExporter, Request};
use lode_shaft::{AnyStation, Broad, Shaft, ShaftBuilder, SharedStation, Station};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Which request types a common station applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Applies {
    /// Every request type.
    #[default]
    All,
    /// Only the listed request types.
    Only(HashSet<TypeId>),
}

impl Applies {
    /// Applies to `R` only. Chain [`Applies::and`] to add more types.
    pub fn only<R: Request>() -> Self {
        Self::Only(HashSet::from([TypeId::of::<R>()]))
    }

    /// Adds `R` to the covered types.
    #[must_use]
    pub fn and<R: Request>(self) -> Self {
        match self {
            Self::All => Self::All,
            Self::Only(mut types) => {
                types.insert(TypeId::of::<R>());
                Self::Only(types)
            }
        }
    }

    /// Returns `true` if `R` is covered.
    pub fn covers<R: Request>(&self) -> bool {
        self.covers_id(TypeId::of::<R>())
    }

    fn covers_id(&self, type_id: TypeId) -> bool {
        match self {
            Self::All => true,
            Self::Only(types) => types.contains(&type_id),
        }
    }
}

enum CommonStation {
    Broad {
        applies: Applies,
        station: Arc<dyn AnyStation>,
    },
    /// Holds a `SharedStation<R>` for the request type `type_id`.
    Typed {
        type_id: TypeId,
        station: Box<dyn Any + Send + Sync>,
    },
}

struct ShaftSlot {
    kind: &'static str,
    /// Holds a `Shaft<R>`.
    shaft: Box<dyn Any + Send + Sync>,
}

/// Named registry of shafts, keyed by request type.
///
/// Populated at startup, read-only afterwards; dispatch is a plain map
/// lookup with no locking.
pub struct Mine {
    name: String,
    shafts: HashMap<TypeId, ShaftSlot>,
    common: Vec<CommonStation>,
    error_exporter: Arc<dyn ErrorExporter>,
}

impl Mine {
    /// Creates an empty mine that reports routing failures through
    /// [`LogExporter`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shafts: HashMap::new(),
            common: Vec::new(),
            error_exporter: Arc::new(LogExporter),
        }
    }

    /// Sets the exporter for failures raised by the mine itself.
    #[must_use]
    pub fn with_error_exporter(mut self, exporter: Arc<dyn ErrorExporter>) -> Self {
        self.error_exporter = exporter;
        self
    }

    /// Returns the mine name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a payload-agnostic station shared by the request types in
    /// `applies`.
    pub fn add_common_station<S: AnyStation>(&mut self, station: S, applies: Applies) -> &mut Self {
        self.common.push(CommonStation::Broad {
            applies,
            station: Arc::new(station),
        });
        self
    }

    /// Adds a station shared by every shaft serving `R`.
    pub fn add_common_typed_station<R, S>(&mut self, station: S) -> &mut Self
    where
        R: Request,
        S: Station<R>,
    {
        let shared: SharedStation<R> = Arc::new(station);
        self.common.push(CommonStation::Typed {
            type_id: TypeId::of::<R>(),
            station: Box::new(shared),
        });
        self
    }

    /// Returns the common stations that apply to `R`, in insertion order.
    pub fn get_stations<R: Request>(&self) -> Vec<SharedStation<R>> {
        let type_id = TypeId::of::<R>();
        self.common
            .iter()
            .filter_map(|common| match common {
                CommonStation::Broad { applies, station } if applies.covers_id(type_id) => {
                    let broad: SharedStation<R> = Arc::new(Broad::from_arc(station.clone()));
                    Some(broad)
                }
                CommonStation::Typed {
                    type_id: target,
                    station,
                } if *target == type_id => station.downcast_ref::<SharedStation<R>>().cloned(),
                _ => None,
            })
            .collect()
    }

    /// Returns a shaft builder for `R`, named after this mine and pre-seeded
    /// with the common stations that apply to `R`.
    pub fn shaft_builder<R: Request>(&self) -> ShaftBuilder<R> {
        Shaft::builder()
            .name(format!("{}/{}", self.name, R::kind()))
            .stations(self.get_stations::<R>())
    }

    /// Registers the shaft for `R`.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::DuplicateShaft`] if `R` already has a shaft.
    pub fn add_shaft<R: Request>(&mut self, shaft: Shaft<R>) -> LodeResult<()> {
        let type_id = TypeId::of::<R>();
        if self.shafts.contains_key(&type_id) {
            return Err(LodeError::duplicate_shaft(R::kind(), self.name.as_str()));
        }

        tracing::debug!(
            mine = %self.name,
            kind = R::kind(),
            stations = shaft.station_count(),
            terminal = shaft.terminal_name(),
            "shaft registered"
        );
        self.shafts.insert(
            type_id,
            ShaftSlot {
                kind: R::kind(),
                shaft: Box::new(shaft),
            },
        );
        Ok(())
    }

    /// Returns the shaft registered for `R`.
    pub fn shaft<R: Request>(&self) -> Option<&Shaft<R>> {
        self.shafts
            .get(&TypeId::of::<R>())
            .and_then(|slot| slot.shaft.downcast_ref::<Shaft<R>>())
    }

    /// Sends a basket to the shaft registered for its request type.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Routing`] if no shaft serves `R`, otherwise
    /// whatever the shaft returns.
    pub async fn send<R: Request>(&self, basket: Basket<R>) -> LodeResult<Basket<R>> {
        match self.shaft::<R>() {
            Some(shaft) => shaft.send(basket).await,
            None => {
                let error = LodeError::routing(
                    R::kind(),
                    format!("no shaft registered in mine '{}'", self.name),
                );
                self.error_exporter.export_error(&error);
                Err(error)
            }
        }
    }

    /// Sends `request` in a fresh basket and returns its response.
    ///
    /// # Errors
    ///
    /// See [`Mine::send`].
    pub async fn request<R: Request>(&self, request: R) -> LodeResult<R::Response> {
        self.send(Basket::new(request)).await?.into_response()
    }

    /// Returns `true` if a shaft serves `R`.
    pub fn handles<R: Request>(&self) -> bool {
        self.shafts.contains_key(&TypeId::of::<R>())
    }

    /// Kinds of all served request types, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.shafts.values().map(|slot| slot.kind).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Number of registered shafts.
    pub fn len(&self) -> usize {
        self.shafts.len()
    }

    /// Returns `true` if no shaft is registered.
    pub fn is_empty(&self) -> bool {
        self.shafts.is_empty()
    }

    /// Number of common stations.
    pub fn common_station_count(&self) -> usize {
        self.common.len()
    }

    pub(crate) fn routes(&self) -> impl Iterator<Item = (TypeId, &'static str)> + '_ {
        self.shafts.iter().map(|(type_id, slot)| (*type_id, slot.kind))
    }
}

impl std::fmt::Debug for Mine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mine")
            .field("name", &self.name)
            .field("kinds", &self.kinds())
            .field("common_stations", &self.common.len())
            .finish_non_exhaustive()
    }
}
