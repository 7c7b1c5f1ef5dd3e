use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use seace_cache::{CacheConfig, FetchOptions, ResponseCache};
use seace_client::{
    keys, Backend, FetchError, Params, RestClient, SeaceClient, TenderFilters, TrackingUpdate,
};
use seace_core::{ApiSettings, CacheSettings, InterestStatus, PersistMode, TrackedTender};
use seace_test_utils::fixtures::minimal_config;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// ============================================================================
// Scripted backend
// ============================================================================

#[derive(Clone, Default)]
struct ScriptedBackend {
    responses: Arc<Mutex<HashMap<String, Result<Value, FetchError>>>>,
    calls: Arc<Mutex<Vec<(String, Params)>>>,
    delay: Duration,
}

impl ScriptedBackend {
    fn new() -> Self {
        Self::default()
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn respond(&self, action: &str, response: Result<Value, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(action.to_string(), response);
    }

    fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, action: &str) -> usize {
        self.calls().iter().filter(|(a, _)| a == action).count()
    }
}

impl Backend for ScriptedBackend {
    fn call(&self, action: &str, params: Params) -> BoxFuture<'static, Result<Value, FetchError>> {
        self.calls.lock().unwrap().push((action.to_string(), params));
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(action)
            .cloned()
            .unwrap_or_else(|| Ok(json!({"success": true})));
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        }
        .boxed()
    }
}

fn client(backend: &ScriptedBackend) -> SeaceClient<ScriptedBackend> {
    SeaceClient::new(backend.clone(), ResponseCache::new(CacheConfig::default()))
}

fn procesos_body() -> Value {
    json!({
        "total": 2,
        "procesos": [
            {"ID": 1, "NOMENCLATURA": "AS-SM-15-2024-HIDRANDINA-1", "ENTIDAD": "HIDRANDINA", "VALOR": "480,000.00", "FECHA_PUB": "12/03/2024"},
            {"ID": 2, "NOMENCLATURA": "AS-SM-15-2023-HIDRANDINA-1", "ENTIDAD": "HIDRANDINA", "VALOR": 450000, "FECHA_PUB": "2023-03-02"}
        ]
    })
}

// ============================================================================
// Cached reads
// ============================================================================

#[tokio::test]
async fn repeated_reads_fetch_once() {
    let backend = ScriptedBackend::new();
    backend.respond("getProcesos", Ok(procesos_body()));
    let client = client(&backend);

    let first = client.get_procesos(&TenderFilters::default()).await.unwrap();
    let second = client.get_procesos(&TenderFilters::default()).await.unwrap();

    assert!(first.was_cache_miss());
    assert!(second.was_cache_hit());
    assert_eq!(first.value(), second.value());
    assert_eq!(second.value().tenders.len(), 2);
    assert_eq!(second.value().tenders[0].value, Some(480_000.0));
    assert_eq!(backend.count("getProcesos"), 1);
}

#[tokio::test]
async fn concurrent_reads_share_one_fetch() {
    let backend = ScriptedBackend::new().with_delay(Duration::from_millis(50));
    backend.respond("getEstadisticas", Ok(json!({"totalProcesos": 7})));
    let client = client(&backend);

    let reads = join_all((0..8).map(|_| client.get_estadisticas())).await;
    for read in reads {
        assert_eq!(read.unwrap().value().total_procesos, 7);
    }
    assert_eq!(backend.count("getEstadisticas"), 1);
}

#[tokio::test]
async fn filters_become_query_params() {
    let backend = ScriptedBackend::new();
    backend.respond("getProcesos", Ok(json!([])));
    let client = client(&backend);

    let filters = TenderFilters::default()
        .region("LA LIBERTAD")
        .search("redes")
        .keyword("mantenimiento")
        .keyword("transformadores");
    client.get_procesos(&filters).await.unwrap();

    let (action, params) = backend.calls().remove(0);
    assert_eq!(action, "getProcesos");
    assert_eq!(
        params,
        vec![
            ("busqueda".to_string(), "redes".to_string()),
            ("palabrasClave".to_string(), "mantenimiento,transformadores".to_string()),
            ("region".to_string(), "LA LIBERTAD".to_string()),
        ]
    );
}

#[tokio::test]
async fn failures_are_not_cached() {
    let backend = ScriptedBackend::new();
    backend.respond("getRegiones", Err(FetchError::Timeout("slow sheet".to_string())));
    let client = client(&backend);

    let err = client.get_regiones().await.unwrap_err();
    assert_eq!(err, FetchError::Timeout("slow sheet".to_string()));

    backend.respond("getRegiones", Ok(json!({"LIMA": {"count": 2, "valor": 10}})));
    let regions = client.get_regiones().await.unwrap();
    assert!(regions.was_cache_miss());
    assert_eq!(regions.value()[0].region, "LIMA");
    assert_eq!(backend.count("getRegiones"), 2);
}

#[tokio::test]
async fn undecodable_response_is_a_decode_error() {
    let backend = ScriptedBackend::new();
    backend.respond("getCronograma", Ok(json!("not rows")));
    let client = client(&backend);

    let err = client.get_cronograma("X").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn force_refresh_refetches() {
    let backend = ScriptedBackend::new();
    backend.respond("getSeguimiento", Ok(json!([])));
    let client = client(&backend);
    client.get_seguimiento().await.unwrap();

    let refreshing = client.clone().with_fetch_options(FetchOptions::force_refresh());
    let read = refreshing.get_seguimiento().await.unwrap();
    assert!(read.was_cache_miss());
    assert_eq!(backend.count("getSeguimiento"), 2);
}

// ============================================================================
// Writes and invalidation
// ============================================================================

#[tokio::test]
async fn tracking_write_invalidates_tracking_reads() {
    let backend = ScriptedBackend::new();
    backend.respond("getSeguimiento", Ok(json!([{"NOMENCLATURA": "X"}])));
    backend.respond("getEstadisticas", Ok(json!({"totalProcesos": 1})));
    backend.respond("getCronograma", Ok(json!([])));
    let client = client(&backend);

    client.get_seguimiento().await.unwrap();
    client.get_estadisticas().await.unwrap();
    client.get_cronograma("X").await.unwrap();
    client.get_cronograma("Y").await.unwrap();

    let mut tracked = TrackedTender::new("X");
    tracked.status = InterestStatus::Inscrito;
    client.add_seguimiento(&tracked).await.unwrap();

    assert!(client.cache().peek(&keys::seguimiento()).is_none());
    assert!(client.cache().peek(&keys::cronograma("X")).is_none());
    assert!(client.cache().peek(&keys::cronograma("Y")).is_some());
    assert!(client.cache().peek(&keys::estadisticas()).is_some());

    let (_, params) = backend
        .calls()
        .into_iter()
        .find(|(action, _)| action == "addSeguimiento")
        .unwrap();
    assert!(params.contains(&("estado".to_string(), "INSCRITO".to_string())));
    assert!(params.contains(&("prioridad".to_string(), "MEDIA".to_string())));
}

#[tokio::test]
async fn update_sends_only_given_fields() {
    let backend = ScriptedBackend::new();
    let client = client(&backend);

    let update = TrackingUpdate {
        notes: Some("revisar bases".to_string()),
        ..Default::default()
    };
    client.update_seguimiento(" X ", &update).await.unwrap();

    let (action, params) = backend.calls().remove(0);
    assert_eq!(action, "updateSeguimiento");
    assert_eq!(
        params,
        vec![
            ("nomenclatura".to_string(), "X".to_string()),
            ("notas".to_string(), "revisar bases".to_string()),
        ]
    );
}

#[tokio::test]
async fn failed_write_keeps_cache() {
    let backend = ScriptedBackend::new();
    backend.respond("getSeguimiento", Ok(json!([])));
    backend.respond(
        "deleteSeguimiento",
        Err(FetchError::Backend("Proceso no encontrado".to_string())),
    );
    let client = client(&backend);
    client.get_seguimiento().await.unwrap();

    let err = client.delete_seguimiento("X").await.unwrap_err();
    assert_eq!(err, FetchError::Backend("Proceso no encontrado".to_string()));
    assert!(client.cache().peek(&keys::seguimiento()).is_some());
}

#[tokio::test]
async fn preload_warms_dashboard_and_swallows_errors() {
    let backend = ScriptedBackend::new();
    backend.respond("getProcesos", Ok(procesos_body()));
    backend.respond("getEstadisticas", Err(FetchError::Transport("offline".to_string())));
    backend.respond("getSeguimiento", Ok(json!([])));
    let client = client(&backend);

    client.preload().await;
    assert!(client.cache().peek(&keys::procesos(&TenderFilters::default())).is_some());
    assert!(client.cache().peek(&keys::seguimiento()).is_some());
    assert!(client.cache().peek(&keys::estadisticas()).is_none());

    client.preload().await;
    assert_eq!(backend.count("getProcesos"), 1);
    assert_eq!(backend.count("getEstadisticas"), 2);
}

#[tokio::test]
async fn json_cache_settings_persist_reads() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let settings = CacheSettings {
        persist: PersistMode::Json,
        path: Some(dir.path().join("cache.json")),
        ..CacheSettings::default()
    };

    let backend = ScriptedBackend::new();
    backend.respond("getEntidadesUnicas", Ok(json!([{"entidad": "SEAL", "count": 1}])));
    {
        let client = SeaceClient::new(backend.clone(), seace_client::cache_from_settings(&settings));
        client.get_entidades_unicas().await.unwrap();
    }

    let restarted = SeaceClient::new(backend.clone(), seace_client::cache_from_settings(&settings));
    let read = restarted.get_entidades_unicas().await.unwrap();
    assert!(read.was_cache_hit());
    assert_eq!(read.value()[0].entity, "SEAL");
    assert_eq!(backend.count("getEntidadesUnicas"), 1);
}

#[test]
fn from_config_rejects_invalid_settings() {
    let mut config = minimal_config();
    assert!(SeaceClient::from_config(&config).is_ok());

    config.matcher.threshold = 1.5;
    match SeaceClient::from_config(&config) {
        Err(FetchError::Config(message)) => assert!(message.contains("matcher.threshold")),
        Err(other) => panic!("expected a config error, got {other:?}"),
        Ok(_) => panic!("invalid threshold should be rejected"),
    }

    let mut config = minimal_config();
    config.api.base_url = "not a url".to_string();
    assert!(matches!(
        SeaceClient::from_config(&config),
        Err(FetchError::Config(ref m)) if m.contains("api.base_url")
    ));
}

// ============================================================================
// HTTP transport
// ============================================================================

/// Serve one canned response per connection and record each request line.
async fn serve(status: u16, body: &'static str, delay: Duration) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => read += n,
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                if let Some(line) = request.lines().next() {
                    seen.lock().unwrap().push(line.to_string());
                }

                tokio::time::sleep(delay).await;
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}/macros/s/abc/exec", addr), requests)
}

fn rest(base_url: &str, timeout_ms: u64) -> RestClient {
    RestClient::new(&ApiSettings {
        base_url: base_url.to_string(),
        request_timeout_ms: timeout_ms,
    })
    .unwrap()
}

#[tokio::test]
async fn http_get_carries_action_and_params() {
    let (url, requests) = serve(200, r#"{"success":true,"data":[1,2]}"#, Duration::ZERO).await;
    let client = rest(&url, 5_000);

    let value = client
        .execute("getCronograma", &[("nomenclatura".to_string(), "A B".to_string())])
        .await
        .unwrap();
    assert_eq!(value, json!([1, 2]));

    let line = requests.lock().unwrap()[0].clone();
    assert!(line.starts_with("GET /macros/s/abc/exec?action=getCronograma&nomenclatura=A+B "));
}

#[tokio::test]
async fn http_error_status_carries_backend_message() {
    let (url, _) = serve(500, r#"{"error":"Hoja no encontrada"}"#, Duration::ZERO).await;
    let err = rest(&url, 5_000).execute("getProcesos", &[]).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Http {
            status: 500,
            message: "Hoja no encontrada".to_string()
        }
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn http_backend_error_body() {
    let (url, _) = serve(200, r#"{"success":false,"error":"Acción no válida"}"#, Duration::ZERO).await;
    let err = rest(&url, 5_000).execute("getNada", &[]).await.unwrap_err();
    assert_eq!(err, FetchError::Backend("Acción no válida".to_string()));
}

#[tokio::test]
async fn http_malformed_json_is_decode_error() {
    let (url, _) = serve(200, "<html>login</html>", Duration::ZERO).await;
    let err = rest(&url, 5_000).execute("getProcesos", &[]).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn http_timeout() {
    let (url, _) = serve(200, "{}", Duration::from_secs(3)).await;
    let err = rest(&url, 200).execute("getProcesos", &[]).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn cached_client_over_http() {
    let (url, requests) = serve(200, r#"{"LIMA":{"count":3,"valor":99.5}}"#, Duration::ZERO).await;
    let client = SeaceClient::new(rest(&url, 5_000), ResponseCache::new(CacheConfig::default()));

    let first = client.get_regiones().await.unwrap();
    let second = client.get_regiones().await.unwrap();
    assert_eq!(first.value(), second.value());
    assert_eq!(requests.lock().unwrap().len(), 1);
}
