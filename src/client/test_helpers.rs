//! Shared helpers for testing `CadcClient` against a mock CADC.

use crate::client::CadcClient;
use crate::config::Config;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the mocked registry feed
pub(crate) const REGISTRY_PATH: &str = "/reg/resource-caps";

/// A mock server answering registry and capabilities requests.
///
/// TAP requests land under `/tap`, DataLink requests at `/caom2ops/datalink`.
pub(crate) struct MockCadc {
    pub(crate) server: MockServer,
}

impl MockCadc {
    /// Start the server with the registry and DataLink capabilities mounted
    pub(crate) async fn start() -> Self {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("GET"))
            .and(path(REGISTRY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "# test registry\n\
                 ivo://cadc.nrc.ca/tap = {uri}/tap/capabilities\n\
                 ivo://cadc.nrc.ca/caom2ops = {uri}/caom2ops/capabilities\n"
            )))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/caom2ops/capabilities"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<vosi:capabilities xmlns:vosi="http://www.ivoa.net/xml/VOSICapabilities/v1.0">
  <capability standardID="ivo://ivoa.net/std/DataLink#links-1.0">
    <interface>
      <accessURL use="full">{uri}/caom2ops/datalink</accessURL>
    </interface>
    <interface>
      <accessURL use="full">{uri}/caom2ops/auth-datalink</accessURL>
      <securityMethod standardID="ivo://ivoa.net/sso#tls-with-certificate"/>
    </interface>
  </capability>
</vosi:capabilities>"#
            )))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Configuration pointing at this server's registry
    pub(crate) fn config(&self) -> Config {
        Config {
            registry_url: format!("{}{}", self.server.uri(), REGISTRY_PATH),
            timeout: Duration::from_secs(5),
            job_poll_interval: Duration::from_millis(10),
            ..Config::default()
        }
    }

    /// A client resolving every endpoint through this server
    pub(crate) fn client(&self) -> CadcClient {
        CadcClient::new(self.config()).unwrap()
    }
}

/// A TAP result VOTable with `collection`, `publisherID` and `energy_emBand`
/// columns, one row per `(collection, publisher id, band)` triple
pub(crate) fn observations(rows: &[(&str, &str, Option<&str>)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(collection, pid, band)| match band {
            Some(band) => format!("<TR><TD>{collection}</TD><TD>{pid}</TD><TD>{band}</TD></TR>"),
            None => format!("<TR><TD>{collection}</TD><TD>{pid}</TD><TD/></TR>"),
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<VOTABLE xmlns="http://www.ivoa.net/xml/VOTable/v1.3" version="1.3">
  <RESOURCE type="results">
    <INFO name="QUERY_STATUS" value="OK"/>
    <TABLE>
      <FIELD name="collection" datatype="char" arraysize="*"/>
      <FIELD name="publisherID" datatype="char" arraysize="*"/>
      <FIELD name="energy_emBand" datatype="char" arraysize="*"/>
      <DATA><TABLEDATA>{rows}</TABLEDATA></DATA>
    </TABLE>
  </RESOURCE>
</VOTABLE>"#
    )
}

/// A DataLink response offering one synchronous SODA cutout for `id`
pub(crate) fn cutout_links(uri: &str, id: &str) -> String {
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
        <TR><TD>{id}</TD><TD>{uri}/files/{id}.fits</TD><TD/><TD>#this</TD></TR>
        <TR><TD>{id}</TD><TD/><TD>soda</TD><TD>#cutout</TD></TR>
      </TABLEDATA></DATA>
    </TABLE>
  </RESOURCE>
  <RESOURCE type="meta" utype="adhoc:service" ID="soda">
    <PARAM name="accessURL" datatype="char" arraysize="*" value="{uri}/soda/sync"/>
    <GROUP name="inputParams">
      <PARAM name="ID" datatype="char" arraysize="*" ref="primaryID" value=""/>
    </GROUP>
  </RESOURCE>
</VOTABLE>"##
    )
}
