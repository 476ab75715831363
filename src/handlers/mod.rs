//! HTTP handlers for entity CRUD, the external-id lookup and driver packages.

pub mod entity;
pub mod lookup;
pub mod shipments;
pub use lookup::usuario_por_uid;
pub use shipments::conductor_paquetes;
