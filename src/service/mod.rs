//! Resource operations on top of the store: CRUD, serialization, validation and the two custom reads.

mod crud;
pub mod lookup;
pub mod serializer;
pub mod shipments;
mod validation;

pub use crud::CrudService;
pub use lookup::{resolve_by_external_id, Rol, UsuarioPorUid};
pub use serializer::{Mode, RecordSerializer};
pub use shipments::driver_packages;
pub use validation::RequestValidator;
