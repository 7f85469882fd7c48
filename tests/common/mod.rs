//! Common test utilities for cadc-tap integration tests

use cadc_tap::Config;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the mocked registry feed
pub const REGISTRY_PATH: &str = "/reg/resource-caps";

/// Start a mock CADC serving the registry and the DataLink capabilities.
///
/// TAP lives under `/argus`, DataLink at `/caom2ops/datalink`, SODA at `/soda/sync`.
pub async fn start_mock_cadc() -> MockServer {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path(REGISTRY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "ivo://cadc.nrc.ca/tap = {uri}/argus/capabilities\n\
             ivo://cadc.nrc.ca/caom2ops = {uri}/caom2ops/capabilities\n"
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/caom2ops/capabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<vosi:capabilities xmlns:vosi="http://www.ivoa.net/xml/VOSICapabilities/v1.0">
  <capability standardID="ivo://ivoa.net/std/VOSI#capabilities">
    <interface><accessURL use="full">{uri}/caom2ops/capabilities</accessURL></interface>
  </capability>
  <capability standardID="ivo://ivoa.net/std/DataLink#links-1.0">
    <interface>
      <accessURL use="full">{uri}/caom2ops/datalink</accessURL>
      <securityMethod/>
    </interface>
    <interface>
      <accessURL use="full">{uri}/caom2ops/pub/datalink</accessURL>
      <securityMethod standardID="ivo://ivoa.net/sso#cookie"/>
    </interface>
  </capability>
</vosi:capabilities>"#
        )))
        .mount(&server)
        .await;

    server
}

/// Configuration resolving every endpoint through `server`
pub fn mock_config(server: &MockServer) -> Config {
    Config {
        registry_url: format!("{}{}", server.uri(), REGISTRY_PATH),
        timeout: Duration::from_secs(5),
        job_poll_interval: Duration::from_millis(10),
        ..Config::default()
    }
}

/// A CAOM query result with one row per publisher id
pub fn caom_result(publisher_ids: &[String]) -> String {
    let rows: String = publisher_ids
        .iter()
        .map(|pid| format!("<TR><TD>CFHT</TD><TD>{pid}</TD><TD>image</TD></TR>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<VOTABLE xmlns="http://www.ivoa.net/xml/VOTable/v1.3" version="1.3">
  <RESOURCE type="results">
    <INFO name="QUERY_STATUS" value="OK"/>
    <TABLE>
      <FIELD name="collection" datatype="char" arraysize="*"/>
      <FIELD name="publisherID" datatype="char" arraysize="*"/>
      <FIELD name="dataProductType" datatype="char" arraysize="*"/>
      <DATA><TABLEDATA>{rows}</TABLEDATA></DATA>
    </TABLE>
  </RESOURCE>
</VOTABLE>"#
    )
}

/// A DataLink response with a `#this`, a `#preview` and a SODA `#cutout` row
pub fn links_for(uri: &str, id: &str) -> String {
    format!(
        r##"<VOTABLE version="1.3">
  <RESOURCE type="results">
    <INFO name="QUERY_STATUS" value="OK"/>
    <TABLE>
      <FIELD name="ID" datatype="char" arraysize="*" ID="primaryID"/>
      <FIELD name="access_url" datatype="char" arraysize="*"/>
      <FIELD name="service_def" datatype="char" arraysize="*"/>
      <FIELD name="semantics" datatype="char" arraysize="*"/>
      <DATA><TABLEDATA>
        <TR><TD>{id}</TD><TD>{uri}/data/{id}.fits</TD><TD/><TD>#this</TD></TR>
        <TR><TD>{id}</TD><TD>{uri}/data/{id}.png</TD><TD/><TD>#preview</TD></TR>
        <TR><TD>{id}</TD><TD/><TD>soda-sync</TD><TD>#cutout</TD></TR>
      </TABLEDATA></DATA>
    </TABLE>
  </RESOURCE>
  <RESOURCE type="meta" utype="adhoc:service" ID="soda-sync">
    <PARAM name="standardID" datatype="char" arraysize="*" value="ivo://ivoa.net/std/SODA#sync-1.0"/>
    <PARAM name="accessURL" datatype="char" arraysize="*" value="{uri}/soda/sync"/>
    <GROUP name="inputParams">
      <PARAM name="ID" datatype="char" arraysize="*" ref="primaryID"/>
      <PARAM name="POS" datatype="char" arraysize="*"/>
    </GROUP>
  </RESOURCE>
</VOTABLE>"##
    )
}
