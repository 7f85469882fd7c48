//! End-to-end tests of the public API against a mock CADC.
//!
//! The mock serves the registry, capabilities, TAP and DataLink endpoints;
//! request counts are verified when each `MockServer` is dropped.

mod common;

use cadc_tap::{CadcClient, Coordinates, Error, JobPhase, QueryOptions, Radius};
use common::{caom_result, links_for, mock_config, start_mock_cadc};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn region_query_to_cutout_urls() {
    let server = start_mock_cadc().await;
    let uri = server.uri();

    let ids: Vec<String> = (0..45).map(|i| format!("ivo://cadc.nrc.ca/CFHT?{i}/{i}p")).collect();
    Mock::given(method("POST"))
        .and(path("/argus/sync"))
        .and(body_string_contains("position_bounds"))
        .respond_with(ResponseTemplate::new(200).set_body_string(caom_result(&ids)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/caom2ops/datalink"))
        .respond_with(ResponseTemplate::new(200).set_body_string(links_for(&uri, "x")))
        .expect(3)
        .mount(&server)
        .await;

    let client = CadcClient::new(mock_config(&server)).unwrap();
    let center = Coordinates::parse("10.5 -20.25").unwrap();
    let radius = Radius::from_degrees(0.1).unwrap();

    let results = client.query_region(&center, radius, None).await.unwrap();
    assert_eq!(results.len(), 45);

    let urls = client.get_image_list(&results, &center, radius).await.unwrap();

    // One cutout per DataLink response, three batches
    assert_eq!(urls.len(), 3);
    assert!(urls.iter().all(|u| {
        u.starts_with(&format!("{uri}/soda/sync?ID=x&"))
            && u.ends_with("POS=CIRCLE+10.5+-20.25+0.1")
    }));
}

#[tokio::test]
async fn data_urls_with_and_without_auxiliaries() {
    let server = start_mock_cadc().await;
    let uri = server.uri();

    Mock::given(method("POST"))
        .and(path("/argus/sync"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(caom_result(&["p1".to_string()])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/caom2ops/datalink"))
        .and(query_param("ID", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(links_for(&uri, "p1")))
        .expect(2)
        .mount(&server)
        .await;

    let client = CadcClient::new(mock_config(&server)).unwrap();
    let results = client.query_name("m101").await.unwrap();

    let primary = client.get_data_urls(&results, false).await.unwrap();
    assert_eq!(primary, vec![format!("{uri}/data/p1.fits")]);

    let all = client.get_data_urls(&results, true).await.unwrap();
    assert_eq!(
        all,
        vec![format!("{uri}/data/p1.fits"), format!("{uri}/data/p1.png")]
    );
}

#[tokio::test]
async fn async_job_is_driven_by_the_caller() {
    let server = start_mock_cadc().await;
    let uri = server.uri();
    let job_url = format!("{uri}/argus/async/abc");

    Mock::given(method("POST"))
        .and(path("/argus/async"))
        .and(body_string_contains("MAXREC=5"))
        .respond_with(ResponseTemplate::new(303).insert_header("Location", job_url.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/argus/async/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<uws:job xmlns:uws="http://www.ivoa.net/xml/UWS/v1.0">
  <uws:jobId>abc</uws:jobId>
  <uws:phase>ERROR</uws:phase>
  <uws:errorSummary type="fatal"><uws:message>bad ADQL</uws:message></uws:errorSummary>
</uws:job>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/argus/async/abc/phase"))
        .and(body_string_contains("PHASE=RUN"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/argus/async/abc/phase"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ERROR"))
        .mount(&server)
        .await;

    let client = CadcClient::new(mock_config(&server)).unwrap();
    let options = QueryOptions {
        maxrec: Some(5),
        ..Default::default()
    };
    let job = client.create_async("select bad", &options).await.unwrap();

    job.run().await.unwrap();
    assert_eq!(job.wait().await.unwrap(), JobPhase::Error);
    match job.raise_if_error().await {
        Err(Error::Query(message)) => assert_eq!(message, "bad ADQL"),
        other => panic!("expected query error, got {:?}", other),
    }
}

#[tokio::test]
async fn images_are_retrieved_into_a_directory() {
    let server = start_mock_cadc().await;
    let uri = server.uri();

    Mock::given(method("POST"))
        .and(path("/argus/sync"))
        .and(body_string_contains("dataProductType"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(caom_result(&["img1".to_string()])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/caom2ops/datalink"))
        .respond_with(ResponseTemplate::new(200).set_body_string(links_for(&uri, "img1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/soda/sync"))
        .and(query_param("ID", "img1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"SIMPLE  = T".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = CadcClient::new(mock_config(&server)).unwrap();
    let center = Coordinates::icrs(150.0, 2.2).unwrap();
    let images = client
        .get_images(&center, Radius::default(), Some("CFHT"))
        .await
        .unwrap();
    assert_eq!(images.len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let saved = images[0].save_to(dir.path()).await.unwrap();
    assert_eq!(saved, dir.path().join("sync"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"SIMPLE  = T");
}
