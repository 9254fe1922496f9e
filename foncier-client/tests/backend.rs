//! Tests du client HTTP contre un backend simulé
//!
//! Le backend simulé répond une seule fois avec un statut et un corps donnés,
//! et renvoie la requête reçue (ligne de requête et corps).
//!
//! Les tests marqués `#[ignore]` nécessitent un vrai backend :
//! ```bash
//! FONCIER_API_URL=http://localhost:5001 cargo test --test backend -- --ignored
//! ```

use std::time::Duration;

use foncier::{LayerRequest, SpatialQuery};
use foncier_client::{Analysis, ApiError, BackendClient, ClientConfig, Upload};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Requête reçue par le serveur simulé
struct Received {
    line: String,
    body: Vec<u8>,
}

/// Démarre un serveur qui répond à une requête puis s'arrête
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        let header_end = loop {
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break request.len();
            }
            request.extend_from_slice(&buf[..n]);
        };

        // Lire le corps en entier avant de répondre
        let content_length = String::from_utf8_lossy(&request[..header_end])
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while request.len() < header_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        let line = String::from_utf8_lossy(&request[..header_end])
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        Received {
            line,
            body: request[header_end..].to_vec(),
        }
    });

    (base, handle)
}

fn client(base: &str) -> BackendClient {
    BackendClient::new(&ClientConfig {
        api_url: base.to_string(),
        chat_url: base.to_string(),
        timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_layers_info() {
    let (base, server) = serve_once(
        "200 OK",
        r#"[{"key":"aif","name":"Titres Fonciers"},{"key":"parcelles","name":"Parcelles"}]"#,
    )
    .await;

    let catalog = client(&base).layers_info().await.unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].key, "aif");

    assert_eq!(server.await.unwrap().line, "GET /layers/info HTTP/1.1");
}

#[tokio::test]
async fn test_layer_data_spatial_query() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[2.39,6.37]},"properties":{}}]}"#,
    )
    .await;

    let request = LayerRequest {
        key: "parcelles".into(),
        near: Some(SpatialQuery {
            lat: 6.5,
            lon: 2.25,
            radius_m: 1000.0,
        }),
    };
    let collection = client(&base).layer_data(request).await.unwrap();
    assert_eq!(collection.len(), 1);

    assert_eq!(
        server.await.unwrap().line,
        "GET /layers/data/parcelles?lat=6.5&lon=2.25&radius=1000 HTTP/1.1"
    );
}

#[tokio::test]
async fn test_layer_data_invalid_payload() {
    let (base, server) = serve_once("200 OK", r#"{"type":"Feature"}"#).await;

    let err = client(&base)
        .layer_data(LayerRequest {
            key: "aif".into(),
            near: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Invalid(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_error_status_carries_backend_message() {
    let (base, server) = serve_once(
        "422 Unprocessable Entity",
        r#"{"detail":"Aucune parcelle détectée sur le levé"}"#,
    )
    .await;

    let err = client(&base).layers_info().await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Aucune parcelle détectée sur le levé");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_error_status_without_body() {
    let (base, server) = serve_once("503 Service Unavailable", "").await;

    let err = client(&base).layers_info().await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Status { status: 503, ref message } if message == "Service Unavailable"
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn test_chat_empty_reply() {
    let (base, server) = serve_once("200 OK", r#"{"reply":"  "}"#).await;

    let reply = client(&base).chat("Bonjour").await.unwrap();
    assert_eq!(reply, None);

    assert_eq!(server.await.unwrap().line, "POST /chat/ HTTP/1.1");
}

const ANALYSIS_3D: &str = r#"{"image_id":"leve-9","geojson":{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[2.0,6.0,31.5],[2.1,6.0,31.7],[2.1,6.1,32.0],[2.0,6.0,31.5]]]},"properties":{"type":"parcel_boundary"}}]},"overlaps":[{"layer_name":"Titres Fonciers","overlapping_count":1}],"processed_at":"2024-05-02T10:00:00Z"}"#;

#[tokio::test]
async fn test_analyze_keeps_backend_payload() {
    let (base, server) = serve_once("200 OK", ANALYSIS_3D).await;

    let upload = Upload {
        file_name: "leve.pdf".into(),
        mime: "application/pdf",
        data: b"%PDF-1.4".to_vec(),
    };
    let analysis = client(&base).analyze(&upload).await.unwrap();
    assert_eq!(analysis.result.image_id, "leve-9");
    assert_eq!(
        analysis.payload["geojson"]["features"][0]["geometry"]["coordinates"][0][0][2],
        json!(31.5)
    );

    assert_eq!(
        server.await.unwrap().line,
        "POST /workflow/process-and-analyze HTTP/1.1"
    );
}

#[tokio::test]
async fn test_report_posts_raw_payload() {
    let (base, server) = serve_once("200 OK", "%PDF-1.4").await;

    let payload: Value = serde_json::from_str(ANALYSIS_3D).unwrap();
    let analysis = Analysis::from_payload(payload.clone()).unwrap();
    let pdf = client(&base).generate_report(&analysis).await.unwrap();
    assert_eq!(&pdf[..], b"%PDF-1.4");

    let received = server.await.unwrap();
    assert_eq!(received.line, "POST /workflow/generate-report HTTP/1.1");
    let sent: Value = serde_json::from_slice(&received.body).unwrap();
    assert_eq!(sent, payload);
}

#[tokio::test]
#[ignore]
async fn test_live_layer_catalog() {
    let config = ClientConfig::from_env();
    let catalog = BackendClient::new(&config)
        .unwrap()
        .layers_info()
        .await
        .unwrap();
    assert!(!catalog.is_empty());
}
