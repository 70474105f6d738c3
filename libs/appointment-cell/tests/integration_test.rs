use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSalonResponses, TestConfig, TestUser};

const CELULAR: &str = "3001234567";
const FECHA: &str = "2099-05-15";

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

fn create_test_app(config: AppConfig) -> Router {
    appointment_routes(Arc::new(config))
}

fn json_request(method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    builder.body(body).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mock_empty_day(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", format!("eq.{}", FECHA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn book_appointment_succeeds_on_a_free_day() {
    let mock_server = MockServer::start().await;
    mock_empty_day(&mock_server).await;

    let nueva = MockSalonResponses::cita_row(
        Uuid::new_v4(),
        CELULAR,
        FECHA,
        "10:00 AM",
        60,
        "Pendiente",
    );
    Mock::given(method("POST"))
        .and(path("/rest/v1/citas"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([nueva])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "POST",
        "/",
        Some(json!({
            "celular": CELULAR,
            "fecha": FECHA,
            "hora": "10:00 AM",
            "servicio": [Uuid::new_v4()],
            "duracionTotal": 60,
            "precioTotal": 45000.0,
        })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["mensaje"], "Cita creada con éxito");
    assert_eq!(body["cita"]["estado"], "Pendiente");
    assert_eq!(body["cita"]["hora"], "10:00 AM");
}

#[tokio::test]
async fn booking_an_occupied_slot_returns_the_conflict_code() {
    let mock_server = MockServer::start().await;

    let ocupada = MockSalonResponses::cita_row(
        Uuid::new_v4(),
        "3007654321",
        FECHA,
        "10:00 AM",
        60,
        "Aprobada",
    );
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", format!("eq.{}", FECHA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ocupada])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "POST",
        "/",
        Some(json!({
            "celular": CELULAR,
            "fecha": FECHA,
            "hora": "10:30 AM",
            "servicio": [Uuid::new_v4()],
            "duracionTotal": 60,
            "precioTotal": 45000.0,
        })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["codigo"], "HORARIO_OCUPADO");
    assert_eq!(body["esErrorUsuario"], true);
    assert!(body["mensaje"].as_str().unwrap().contains("ya está ocupado"));
}

#[tokio::test]
async fn booking_over_own_appointment_says_so() {
    let mock_server = MockServer::start().await;

    let propia =
        MockSalonResponses::cita_row(Uuid::new_v4(), CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", format!("eq.{}", FECHA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([propia])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "POST",
        "/",
        Some(json!({
            "celular": CELULAR,
            "fecha": FECHA,
            "hora": "10:00 AM",
            "servicio": [Uuid::new_v4()],
            "duracionTotal": 30,
            "precioTotal": 20000.0,
        })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert!(body["mensaje"].as_str().unwrap().contains("Usted ya tiene una cita"));
}

#[tokio::test]
async fn booking_collects_every_validation_error() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(config_for(&mock_server));

    let request = json_request(
        "POST",
        "/",
        Some(json!({
            "celular": "123",
            "fecha": "15-05-2099",
            "hora": "25:00",
            "servicio": [],
            "duracionTotal": 0,
            "precioTotal": 0,
        })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["mensaje"], "Datos inválidos");
    assert_eq!(body["errores"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn booking_an_empty_body_lists_required_fields() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(config_for(&mock_server));

    let request = json_request("POST", "/", Some(json!({})), None);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let errores = body["errores"].as_array().unwrap();
    assert!(errores.iter().any(|e| e.as_str().unwrap().contains("celular")));
    assert!(errores.iter().any(|e| e.as_str().unwrap().contains("fecha")));
    assert!(errores.iter().any(|e| e.as_str().unwrap().contains("hora")));
}

#[tokio::test]
async fn booking_rejects_durations_of_a_day_or_more() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(config_for(&mock_server));

    let request = json_request(
        "POST",
        "/",
        Some(json!({
            "celular": CELULAR,
            "fecha": FECHA,
            "hora": "9:00 AM",
            "servicio": [Uuid::new_v4()],
            "duracionTotal": i32::MAX,
            "precioTotal": 20000.0,
        })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let errores = body["errores"].as_array().unwrap();
    assert!(errores.iter().any(|e| e.as_str().unwrap().contains("superar un día")));
}

#[tokio::test]
async fn booking_outside_business_hours_is_rejected() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(config_for(&mock_server));

    let request = json_request(
        "POST",
        "/",
        Some(json!({
            "celular": CELULAR,
            "fecha": FECHA,
            "hora": "8:00 AM",
            "servicio": [Uuid::new_v4()],
            "duracionTotal": 30,
            "precioTotal": 20000.0,
        })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["mensaje"].as_str().unwrap().contains("fuera del horario"));
}

#[tokio::test]
async fn last_slot_accepts_long_services() {
    let mock_server = MockServer::start().await;
    mock_empty_day(&mock_server).await;

    let nueva = MockSalonResponses::cita_row(
        Uuid::new_v4(),
        CELULAR,
        FECHA,
        "5:30 PM",
        120,
        "Pendiente",
    );
    Mock::given(method("POST"))
        .and(path("/rest/v1/citas"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([nueva])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "POST",
        "/",
        Some(json!({
            "celular": CELULAR,
            "fecha": FECHA,
            "hora": "5:30 PM",
            "servicio": [Uuid::new_v4()],
            "duracionTotal": 120,
            "precioTotal": 90000.0,
        })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[tokio::test]
async fn availability_excludes_slots_the_booking_would_overlap() {
    let mock_server = MockServer::start().await;

    let ocupada = MockSalonResponses::cita_row(
        Uuid::new_v4(),
        "3007654321",
        FECHA,
        "10:00 AM",
        60,
        "Pendiente",
    );
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", format!("eq.{}", FECHA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ocupada])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "GET",
        &format!("/disponibilidad?fecha={}&duracion=60", FECHA),
        None,
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["citasExistentes"], 1);
    assert_eq!(body["totalDisponibles"], 15);

    let horarios: Vec<&str> = body["horariosDisponibles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h.as_str().unwrap())
        .collect();

    assert!(horarios.contains(&"9:00 AM"));
    assert!(horarios.contains(&"11:00 AM"));
    assert!(horarios.contains(&"5:30 PM"));
    // A 60-minute service starting at these times would overlap 10:00-11:00.
    assert!(!horarios.contains(&"9:30 AM"));
    assert!(!horarios.contains(&"10:00 AM"));
    assert!(!horarios.contains(&"10:30 AM"));
}

#[tokio::test]
async fn availability_slot_count_never_grows_with_duration() {
    let mock_server = MockServer::start().await;

    let ocupada = MockSalonResponses::cita_row(
        Uuid::new_v4(),
        "3007654321",
        FECHA,
        "12:00 PM",
        90,
        "Pendiente",
    );
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", format!("eq.{}", FECHA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ocupada])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));

    let mut previo = usize::MAX;
    for duracion in [30, 60, 90, 120] {
        let request = json_request(
            "GET",
            &format!("/disponibilidad?fecha={}&duracion={}", FECHA, duracion),
            None,
            None,
        );
        let response = app.clone().oneshot(request).await.unwrap();
        let body = body_json(response).await;
        let total = body["totalDisponibles"].as_u64().unwrap() as usize;

        assert!(total <= previo, "{} min offered more slots than shorter durations", duracion);
        previo = total;
    }
}

#[tokio::test]
async fn availability_rejects_bad_parameters() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(config_for(&mock_server));

    let response = app
        .clone()
        .oneshot(json_request("GET", "/disponibilidad?fecha=no-es-fecha&duracion=60", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/disponibilidad?fecha={}&duracion=0", FECHA),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request("GET", "/disponibilidad?fecha=2020-01-01&duracion=60", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "GET",
            &format!("/disponibilidad?fecha={}&duracion=2147483647", FECHA),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn adding_an_appointment_never_frees_slots() {
    async fn slots_with(citas: Vec<Value>) -> Vec<String> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/citas"))
            .and(query_param("fecha", format!("eq.{}", FECHA)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(citas)))
            .mount(&mock_server)
            .await;

        let app = create_test_app(config_for(&mock_server));
        let request = json_request(
            "GET",
            &format!("/disponibilidad?fecha={}&duracion=60", FECHA),
            None,
            None,
        );
        let body = body_json(app.oneshot(request).await.unwrap()).await;

        body["horariosDisponibles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h.as_str().unwrap().to_string())
            .collect()
    }

    let primera =
        MockSalonResponses::cita_row(Uuid::new_v4(), "3007654321", FECHA, "10:00 AM", 60, "Pendiente");
    let segunda =
        MockSalonResponses::cita_row(Uuid::new_v4(), "3001112233", FECHA, "2:00 PM", 90, "Aprobada");

    let con_una = slots_with(vec![primera.clone()]).await;
    let con_dos = slots_with(vec![primera, segunda]).await;

    // The day with the extra appointment offers a subset of the slots, never
    // new ones.
    assert!(con_dos.len() < con_una.len());
    for slot in &con_dos {
        assert!(con_una.contains(slot), "{} appeared only after adding an appointment", slot);
    }
}

#[tokio::test]
async fn availability_can_ignore_the_appointment_being_rescheduled() {
    let mock_server = MockServer::start().await;

    let propia_id = Uuid::new_v4();
    let propia =
        MockSalonResponses::cita_row(propia_id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", format!("eq.{}", FECHA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([propia])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "GET",
        &format!("/disponibilidad?fecha={}&duracion=60&excluirCita={}", FECHA, propia_id),
        None,
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["citasExistentes"], 0);
    assert_eq!(body["totalDisponibles"], 18);
}

// ==============================================================================
// PHONE LOOKUP
// ==============================================================================

#[tokio::test]
async fn phone_lookup_returns_sorted_appointments() {
    let mock_server = MockServer::start().await;

    let tarde =
        MockSalonResponses::cita_row(Uuid::new_v4(), CELULAR, "2099-05-16", "9:00 AM", 30, "Pendiente");
    let temprano =
        MockSalonResponses::cita_row(Uuid::new_v4(), CELULAR, "2099-05-15", "3:00 PM", 30, "Aprobada");
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("celular", format!("eq.{}", CELULAR)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tarde, temprano])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request("GET", &format!("/celular/{}", CELULAR), None, None);

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["citas"][0]["fecha"], "2099-05-15");
    assert_eq!(body["citas"][1]["fecha"], "2099-05-16");
}

#[tokio::test]
async fn phone_lookup_validates_the_number() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(config_for(&mock_server));

    let response = app
        .oneshot(json_request("GET", "/celular/12345", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==============================================================================
// PUBLIC UPDATES
// ==============================================================================

async fn mock_cita_by_id(mock_server: &MockServer, id: Uuid, row: &Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn public_update_requires_the_matching_phone() {
    let mock_server = MockServer::start().await;

    let id = Uuid::new_v4();
    let row = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    mock_cita_by_id(&mock_server, id, &row).await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "PUT",
        &format!("/publica/{}", id),
        Some(json!({ "celular": "3009999999", "estado": "Aprobada" })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn public_status_update_appends_history() {
    let mock_server = MockServer::start().await;

    let id = Uuid::new_v4();
    let row = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    mock_cita_by_id(&mock_server, id, &row).await;

    let aprobada = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Aprobada");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/citas"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([aprobada])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "PUT",
        &format!("/publica/{}", id),
        Some(json!({ "celular": CELULAR, "estado": "Aprobada" })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["cita"]["estado"], "Aprobada");
}

#[tokio::test]
async fn resending_the_current_status_is_a_noop() {
    let mock_server = MockServer::start().await;

    let id = Uuid::new_v4();
    let row = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    mock_cita_by_id(&mock_server, id, &row).await;
    // No PATCH mock mounted: a write would fail the test with a 500.

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "PUT",
        &format!("/publica/{}", id),
        Some(json!({ "celular": CELULAR, "estado": "Pendiente" })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["cita"]["estado"], "Pendiente");
}

#[tokio::test]
async fn terminal_statuses_block_further_transitions() {
    let mock_server = MockServer::start().await;

    let id = Uuid::new_v4();
    let row = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Completada");
    mock_cita_by_id(&mock_server, id, &row).await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "PUT",
        &format!("/publica/{}", id),
        Some(json!({ "celular": CELULAR, "estado": "Aprobada" })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rescheduling_into_another_booking_uses_the_update_code() {
    let mock_server = MockServer::start().await;

    let id = Uuid::new_v4();
    let propia = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    mock_cita_by_id(&mock_server, id, &propia).await;

    let ajena =
        MockSalonResponses::cita_row(Uuid::new_v4(), "3007654321", FECHA, "11:00 AM", 60, "Aprobada");
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", format!("eq.{}", FECHA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([propia, ajena])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "PUT",
        &format!("/publica/{}", id),
        Some(json!({ "celular": CELULAR, "hora": "11:30 AM" })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["codigo"], "HORARIO_OCUPADO_ACTUALIZACION");
}

#[tokio::test]
async fn rescheduling_around_itself_is_allowed() {
    let mock_server = MockServer::start().await;

    let id = Uuid::new_v4();
    let propia = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    mock_cita_by_id(&mock_server, id, &propia).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("fecha", format!("eq.{}", FECHA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([propia])))
        .mount(&mock_server)
        .await;

    let movida = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:30 AM", 60, "Pendiente");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/citas"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([movida])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config_for(&mock_server));
    let request = json_request(
        "PUT",
        &format!("/publica/{}", id),
        Some(json!({ "celular": CELULAR, "hora": "10:30 AM" })),
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["cita"]["hora"], "10:30 AM");
}

// ==============================================================================
// PROTECTED ROUTES
// ==============================================================================

#[tokio::test]
async fn listing_requires_authentication() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(config_for(&mock_server));

    let response = app
        .oneshot(json_request("GET", "/", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_can_list_all_appointments() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    let row = MockSalonResponses::cita_row(Uuid::new_v4(), CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .and(query_param("order", "fecha.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let admin = TestUser::admin("duena@salon.co");
    let token = JwtTestUtils::create_test_token(&admin, &config.supabase_jwt_secret, Some(1));

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request("GET", "/", None, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn listing_rejects_non_admins() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    let staff = TestUser::staff("recepcion@salon.co");
    let token = JwtTestUtils::create_test_token(&staff, &config.supabase_jwt_secret, Some(1));

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request("GET", "/", None, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_update_rejects_non_admins() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    let staff = TestUser::staff("recepcion@salon.co");
    let token = JwtTestUtils::create_test_token(&staff, &config.supabase_jwt_secret, Some(1));

    let app = create_test_app(config);
    let request = json_request(
        "PUT",
        &format!("/admin/{}", Uuid::new_v4()),
        Some(json!({ "estado": "Aprobada" })),
        Some(&token),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_delete_removes_the_row() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    let id = Uuid::new_v4();
    let row = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    mock_cita_by_id(&mock_server, id, &row).await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/citas"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let admin = TestUser::admin("duena@salon.co");
    let token = JwtTestUtils::create_test_token(&admin, &config.supabase_jwt_secret, Some(1));

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request("DELETE", &format!("/{}", id), None, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["mensaje"], "Cita eliminada");
}

#[tokio::test]
async fn owner_cancellation_is_a_soft_cancel() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    let id = Uuid::new_v4();
    let row = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    mock_cita_by_id(&mock_server, id, &row).await;

    let cancelada =
        MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Cancelada por clienta");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/citas"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelada])))
        .mount(&mock_server)
        .await;

    let staff = TestUser::staff("recepcion@salon.co");
    let token = JwtTestUtils::create_test_token(&staff, &config.supabase_jwt_secret, Some(1));

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request(
            "DELETE",
            &format!("/{}?celular={}", id, CELULAR),
            None,
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["mensaje"], "Cita cancelada");
    assert_eq!(body["cita"]["estado"], "Cancelada por clienta");
}

#[tokio::test]
async fn non_owner_cancellation_is_forbidden() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);

    let id = Uuid::new_v4();
    let row = MockSalonResponses::cita_row(id, CELULAR, FECHA, "10:00 AM", 60, "Pendiente");
    mock_cita_by_id(&mock_server, id, &row).await;

    let staff = TestUser::staff("recepcion@salon.co");
    let token = JwtTestUtils::create_test_token(&staff, &config.supabase_jwt_secret, Some(1));

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request(
            "DELETE",
            &format!("/{}?celular=3009999999", id),
            None,
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
