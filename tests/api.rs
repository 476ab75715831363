//! HTTP behaviour of the whole service, driven in-process over MemoryStore.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use dds_gestion::{app, builtin_model, AppState, MemoryStore, Settings};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

struct TestApp {
    app: NormalizePath<Router>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_redaction(false)
    }

    fn with_redaction(redact: bool) -> Self {
        let model = Arc::new(builtin_model().unwrap());
        let store = Arc::new(MemoryStore::new(model.clone()));
        let state = AppState::new(store, model, redact);
        TestApp {
            app: app(state, &Settings::default()),
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// POST and return the new id, failing the test on anything but 201.
    async fn create(&self, uri: &str, body: Value) -> i64 {
        let (status, row) = self.post(uri, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {} -> {}", uri, row);
        row["id"].as_i64().unwrap()
    }
}

fn cliente(correo: &str, uid: Option<&str>) -> Value {
    json!({
        "nombre": "Carla", "contraseña": "pbkdf2_sha256$1$abc", "correo": correo,
        "telefono": "+56911111111", "direccion": "Av. Siempre Viva 742",
        "preferencia_notificacion": "email", "firebase_uid": uid
    })
}

fn despachador(correo: &str, uid: Option<&str>) -> Value {
    json!({
        "nombre": "Diego", "correo": correo, "contraseña": "pbkdf2_sha256$1$def",
        "telefono": "+56922222222", "firebase_uid": uid
    })
}

fn conductor(correo: &str, uid: Option<&str>) -> Value {
    json!({
        "nombre": "Koke", "contraseña": "pbkdf2_sha256$1$ghi", "correo": correo,
        "telefono": "+56933333333", "estado": "disponible", "licencia": "A2-1234",
        "vehiculo": "Furgón", "firebase_uid": uid
    })
}

fn admin(correo: &str) -> Value {
    json!({"nombre": "Ada", "contraseña": "x", "correo": correo, "telefono": "1", "estado": "activo"})
}

/// admin, conductor, informe, ruta and envio wired together.
struct Chain {
    conductor: i64,
    informe: i64,
    ruta: i64,
    envio: i64,
}

async fn chain(t: &TestApp) -> Chain {
    let admin = t.create("/admins", admin("ada@x.cl")).await;
    let conductor = t.create("/conductores", conductor("koke@x.cl", None)).await;
    let informe = t
        .create(
            "/informes",
            json!({"tiempo": "02:15:00", "entrego_todos": false, "vueltas": 3,
                   "admin": admin, "conductor": conductor}),
        )
        .await;
    let ruta = t
        .create(
            "/rutas",
            json!({"distancia": 18.4, "puntos_referencia": "Plaza, Mall", "origen": "Bodega central",
                   "informe": informe}),
        )
        .await;
    let envio = t.create("/envios", json!({"paquetes_totales": 2, "ruta": ruta})).await;
    Chain {
        conductor,
        informe,
        ruta,
        envio,
    }
}

fn paquete(envio: i64, cliente: i64) -> Value {
    json!({
        "fecha_e": "2024-06-01", "direccion_entrega": "Los Olmos 12", "estado": "en bodega",
        "envio": envio, "cliente": cliente, "peso": 1.25, "dimensiones": "30x20x10"
    })
}

#[tokio::test]
async fn account_resources_round_trip() {
    let t = TestApp::new();
    for (path, body) in [
        ("/clientes", cliente("carla@x.cl", Some("uid-1"))),
        ("/despachadores", despachador("diego@x.cl", None)),
        ("/conductores", conductor("koke@x.cl", Some("uid-2"))),
    ] {
        let (status, created) = t.post(path, body.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        for (k, v) in body.as_object().unwrap() {
            assert_eq!(&created[k], v, "{} field {}", path, k);
        }
        let id = created["id"].as_i64().unwrap();
        let (status, fetched) = t.get(&format!("{}/{}", path, id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, listed) = t.get(path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([created]));
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected_per_entity() {
    let t = TestApp::new();
    t.create("/clientes", cliente("same@x.cl", None)).await;
    let (status, body) = t.post("/clientes", cliente("same@x.cl", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("conflict"));

    // Uniqueness is per table.
    t.create("/despachadores", despachador("same@x.cl", None)).await;
    let (status, _) = t.post("/despachadores", despachador("same@x.cl", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_email_fails_validation() {
    let t = TestApp::new();
    let (status, body) = t.post("/conductores", conductor("no-es-correo", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], json!("correo"));
}

#[tokio::test]
async fn put_replaces_and_patch_merges() {
    let t = TestApp::new();
    let id = t.create("/despachadores", despachador("d@x.cl", Some("uid"))).await;
    let uri = format!("/despachadores/{}", id);

    let mut replacement = despachador("nuevo@x.cl", None);
    replacement["nombre"] = json!("Daniela");
    let (status, body) = t.send(Method::PUT, &uri, Some(replacement)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nombre"], json!("Daniela"));
    assert_eq!(body["firebase_uid"], Value::Null);

    let (status, _) = t.send(Method::PUT, &uri, Some(json!({"nombre": "solo"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t.patch(&uri, json!({"telefono": "999"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["telefono"], json!("999"));
    assert_eq!(body["nombre"], json!("Daniela"));
}

#[tokio::test]
async fn put_without_uid_keeps_the_login_link() {
    let t = TestApp::new();
    let id = t.create("/conductores", conductor("k@x.cl", Some("fb-1"))).await;

    let mut replacement = conductor("k@x.cl", None);
    replacement.as_object_mut().unwrap().remove("firebase_uid");
    replacement["vehiculo"] = json!("Camión");
    let (status, body) = t
        .send(Method::PUT, &format!("/conductores/{}", id), Some(replacement))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vehiculo"], json!("Camión"));
    assert_eq!(body["firebase_uid"], json!("fb-1"));

    let (status, body) = t.get("/usuario_por_uid/fb-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rol"], json!("conductor"));
    assert_eq!(body["id"], json!(id));
}

#[tokio::test]
async fn admin_password_is_never_returned() {
    let t = TestApp::new();
    let (status, created) = t.post("/admins", admin("root@x.cl")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.get("contraseña").is_none());
    assert_eq!(created["correo"], json!("root@x.cl"));

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = t.get(&format!("/admins/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fetched.get("contraseña").is_none());
    let (_, listed) = t.get("/admins").await;
    assert!(listed[0].get("contraseña").is_none());

    let (status, patched) = t.patch(&format!("/admins/{}", id), json!({"contraseña": "nueva"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(patched.get("contraseña").is_none());
}

#[tokio::test]
async fn deleting_envio_removes_its_paquetes() {
    let t = TestApp::new();
    let c = chain(&t).await;
    let cliente = t.create("/clientes", cliente("c@x.cl", None)).await;
    t.create("/paquetes", paquete(c.envio, cliente)).await;
    t.create("/paquetes", paquete(c.envio, cliente)).await;

    let (status, body) = t.delete(&format!("/envios/{}", c.envio)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    assert_eq!(t.get("/paquetes").await.1, json!([]));
    assert_eq!(t.get(&format!("/envios/{}", c.envio)).await.0, StatusCode::NOT_FOUND);
    assert_eq!(t.get(&format!("/clientes/{}", cliente)).await.0, StatusCode::OK);
}

#[tokio::test]
async fn deleting_informe_nulls_ruta() {
    let t = TestApp::new();
    let c = chain(&t).await;
    let (status, _) = t.delete(&format!("/informes/{}", c.informe)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, ruta) = t.get(&format!("/rutas/{}", c.ruta)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ruta["informe"], Value::Null);
    assert_eq!(t.get(&format!("/envios/{}", c.envio)).await.0, StatusCode::OK);
}

#[tokio::test]
async fn asignacion_triple_is_unique() {
    let t = TestApp::new();
    let c = chain(&t).await;
    let d = t.create("/despachadores", despachador("d@x.cl", None)).await;
    let triple = json!({"despachador": d, "conductor": c.conductor, "envio": c.envio});
    t.create("/asignaciones", triple.clone()).await;
    let (status, _) = t.post("/asignaciones", triple).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other = t.create("/envios", json!({"paquetes_totales": 1, "ruta": c.ruta})).await;
    t.create(
        "/asignaciones",
        json!({"despachador": d, "conductor": c.conductor, "envio": other}),
    )
    .await;
}

#[tokio::test]
async fn paquete_estado_is_constrained() {
    let t = TestApp::new();
    let c = chain(&t).await;
    let cliente = t.create("/clientes", cliente("c@x.cl", None)).await;
    let id = t.create("/paquetes", paquete(c.envio, cliente)).await;
    let uri = format!("/paquetes/{}", id);

    let (status, body) = t.patch(&uri, json!({"estado": "perdido"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], json!("estado"));

    let (status, body) = t.patch(&uri, json!({"estado": "entregado"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["estado"], json!("entregado"));
}

#[tokio::test]
async fn missing_foreign_key_target_fails_validation() {
    let t = TestApp::new();
    let (status, body) = t.post("/envios", json!({"paquetes_totales": 1, "ruta": 77})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], json!("ruta"));
}

#[tokio::test]
async fn lookup_reports_role_with_precedence() {
    let t = TestApp::new();
    t.create("/clientes", cliente("solo@x.cl", Some("only-cliente"))).await;
    t.create("/clientes", cliente("dup@x.cl", Some("shared"))).await;
    let conductor_id = t.create("/conductores", conductor("k@x.cl", Some("shared"))).await;

    let (status, body) = t.get("/usuario_por_uid/only-cliente").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rol"], json!("cliente"));
    assert_eq!(body["correo"], json!("solo@x.cl"));
    assert_eq!(body["nombre"], json!("Carla"));

    let (status, body) = t.get("/usuario_por_uid/shared").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"id": conductor_id, "nombre": "Koke", "correo": "k@x.cl", "rol": "conductor"})
    );
}

#[tokio::test]
async fn lookup_miss_returns_literal_body() {
    let t = TestApp::new();
    let (status, body) = t.get("/usuario_por_uid/nadie").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Usuario no encontrado"}));
}

#[tokio::test]
async fn trailing_slash_is_accepted() {
    let t = TestApp::new();
    let (status, _) = t.post("/clientes/", cliente("slash@x.cl", None)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = t.get("/clientes/1/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["correo"], json!("slash@x.cl"));
    assert_eq!(t.get("/usuario_por_uid/x/").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_errors() {
    let t = TestApp::new();
    assert_eq!(t.get("/camiones").await.0, StatusCode::NOT_FOUND);
    assert_eq!(t.get("/clientes/abc").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(t.get("/clientes/99").await.0, StatusCode::NOT_FOUND);
    assert_eq!(t.delete("/clientes/99").await.0, StatusCode::NOT_FOUND);
    assert_eq!(t.post("/clientes", json!(["no", "objeto"])).await.0, StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/clientes")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn driver_packages_carry_dispatcher() {
    let t = TestApp::new();
    let c = chain(&t).await;
    let cliente = t.create("/clientes", cliente("c@x.cl", None)).await;
    let d = t.create("/despachadores", despachador("d@x.cl", None)).await;
    t.create(
        "/asignaciones",
        json!({"despachador": d, "conductor": c.conductor, "envio": c.envio}),
    )
    .await;
    let pkg = t.create("/paquetes", paquete(c.envio, cliente)).await;

    let (status, body) = t.get(&format!("/conductores/{}/paquetes", c.conductor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], json!(pkg));
    assert_eq!(body[0]["despachador_id"], json!(d));
    assert_eq!(body[0]["despachador_nombre"], json!("Diego"));

    assert_eq!(t.get("/conductores/999/paquetes").await.0, StatusCode::NOT_FOUND);
    assert_eq!(t.get(&format!("/clientes/{}/paquetes", cliente)).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn durations_are_normalized() {
    let t = TestApp::new();
    let c = chain(&t).await;
    let (status, body) = t
        .patch(&format!("/informes/{}", c.informe), json!({"tiempo": "1 0:30:5"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tiempo"], json!("1 00:30:05"));
}

#[tokio::test]
async fn credentials_can_be_redacted() {
    let t = TestApp::with_redaction(true);
    let (status, body) = t.post("/clientes", cliente("r@x.cl", None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.get("contraseña").is_none());
    assert_eq!(body["correo"], json!("r@x.cl"));
}

#[tokio::test]
async fn operational_endpoints() {
    let t = TestApp::new();
    assert_eq!(t.get("/health").await, (StatusCode::OK, json!({"status": "ok"})));
    let (status, body) = t.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(t.get("/version").await.1["name"], json!("dds-gestion"));
    let (status, doc) = t.get("/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/usuario_por_uid/{uid}"].is_object());
}
