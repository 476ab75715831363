//! OpenAPI document for the hand-written endpoints. The generic resource
//! routes are driven by the catalog and are not listed here.

use crate::routes::common::{HealthBody, ReadyBody};
use crate::service::{Rol, UsuarioPorUid};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DdS gestion API",
        description = "Accounts, routes, shipments and packages of the delivery service."
    ),
    paths(
        crate::handlers::lookup::usuario_por_uid,
        crate::handlers::shipments::conductor_paquetes,
        crate::routes::common::health,
        crate::routes::common::ready,
    ),
    components(schemas(UsuarioPorUid, Rol, HealthBody, ReadyBody)),
    tags(
        (name = "lookup", description = "External-auth id resolution"),
        (name = "shipments", description = "Driver package listing"),
        (name = "health", description = "Probes")
    )
)]
pub struct ApiDoc;
