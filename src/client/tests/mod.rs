
use super::*;
use crate::registry::RegistryCache;
use super::test_helpers::{self, MockCadc};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn tap_base_strips_capabilities_segment() {
    assert_eq!(
        tap_base_from_capabilities("https://ws.example/argus/capabilities"),
        "https://ws.example/argus"
    );
    assert_eq!(
        tap_base_from_capabilities("https://ws.example/argus"),
        "https://ws.example/argus"
    );
}

#[test]
fn invalid_config_is_rejected() {
    let config = Config {
        tap_service_uri: String::new(),
        ..Config::default()
    };
    assert!(CadcClient::new(config).unwrap_err().is_usage());
}

#[tokio::test]
async fn endpoints_resolve_once_through_registry() {
    let cadc = MockCadc::start().await;
    let client = cadc.client();

    let tap = client.tap().await.unwrap();
    assert_eq!(tap.base_url(), format!("{}/tap", cadc.server.uri()));

    let datalink = client.datalink().await.unwrap();
    assert_eq!(
        datalink.links_url(),
        format!("{}/caom2ops/datalink", cadc.server.uri())
    );

    // Clones share the memoised endpoints
    let clone = client.clone();
    clone.tap().await.unwrap();
    clone.datalink().await.unwrap();

    let requests = cadc.server.received_requests().await.unwrap();
    let registry_calls = requests
        .iter()
        .filter(|r| r.url.path() == test_helpers::REGISTRY_PATH)
        .count();
    let caps_calls = requests
        .iter()
        .filter(|r| r.url.path() == "/caom2ops/capabilities")
        .count();
    assert_eq!(registry_calls, 1);
    assert_eq!(caps_calls, 1);
}

#[tokio::test]
async fn configured_urls_bypass_registry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        registry_url: format!("{}/reg", server.uri()),
        tap_url: Some("https://tap.example/tap/".to_string()),
        datalink_url: Some("https://dl.example/links".to_string()),
        ..Config::default()
    };
    let client = CadcClient::new(config).unwrap();

    assert_eq!(client.tap().await.unwrap().base_url(), "https://tap.example/tap");
    assert_eq!(
        client.datalink().await.unwrap().links_url(),
        "https://dl.example/links"
    );
    assert!(!client.registry().is_populated());
}

#[tokio::test]
async fn shared_registry_cache_serves_several_clients() {
    let cadc = MockCadc::start().await;
    let config = cadc.config();
    let cache = Arc::new(RegistryCache::new(config.registry_url.clone()));

    let first = CadcClient::with_registry(config.clone(), cache.clone()).unwrap();
    let second = CadcClient::with_registry(config, cache.clone()).unwrap();
    first.tap().await.unwrap();
    second.tap().await.unwrap();

    assert!(cache.is_populated());
    let requests = cadc.server.received_requests().await.unwrap();
    assert_eq!(
        requests
            .iter()
            .filter(|r| r.url.path() == test_helpers::REGISTRY_PATH)
            .count(),
        1
    );
}

#[tokio::test]
async fn unknown_service_is_reported() {
    let cadc = MockCadc::start().await;
    let config = Config {
        tap_service_uri: "ivo://cadc.nrc.ca/nowhere".to_string(),
        ..cadc.config()
    };
    let client = CadcClient::new(config).unwrap();

    assert!(matches!(
        client.tap().await,
        Err(crate::Error::UnknownService(_))
    ));
}
