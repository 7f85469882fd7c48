//! VOSI capabilities documents
//!
//! A capabilities document lists the standard capabilities a service offers,
//! each with one or more interfaces. Parsing produces typed [`Capability`]
//! values; [`select_access_url`] then picks the interface usable without
//! credentials or with a session cookie.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Security method identifier for cookie-based access
pub const COOKIE_SECURITY_METHOD: &str = "ivo://ivoa.net/sso#cookie";

/// Standard identifier of the DataLink links endpoint
pub const DATALINK_LINKS_CAPABILITY: &str = "ivo://ivoa.net/std/DataLink#links-1.0";

/// One `<capability>` element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capability {
    /// The `standardID` attribute
    pub standard_id: Option<String>,
    /// Interfaces in document order
    pub interfaces: Vec<Interface>,
}

/// One `<interface>` element of a capability
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Interface {
    /// Text of the `<accessURL>` child
    pub access_url: Option<String>,
    /// Declared security methods (empty means anonymous only)
    pub security_methods: Vec<SecurityMethod>,
}

/// One `<securityMethod>` element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityMethod {
    /// The `standardID` attribute; absent means anonymous access
    pub standard_id: Option<String>,
}

impl Interface {
    /// True if the interface can be used anonymously or with a cookie.
    ///
    /// Every declared security method is considered, not only the first, so an
    /// interface listing a certificate method ahead of the cookie method qualifies.
    pub fn allows_anonymous_or_cookie(&self) -> bool {
        self.security_methods.is_empty()
            || self.security_methods.iter().any(|sm| match &sm.standard_id {
                None => true,
                Some(id) => id == COOKIE_SECURITY_METHOD,
            })
    }
}

/// Pick the access URL for `standard_id` among parsed capabilities.
///
/// For each capability with a matching standard id, a lone interface is
/// returned regardless of its security; otherwise the first interface that
/// allows anonymous or cookie access wins.
pub fn select_access_url(capabilities: &[Capability], standard_id: &str) -> Result<String> {
    for capability in capabilities
        .iter()
        .filter(|c| c.standard_id.as_deref() == Some(standard_id))
    {
        if let [only] = capability.interfaces.as_slice()
            && let Some(url) = &only.access_url
        {
            return Ok(url.clone());
        }

        let usable = capability
            .interfaces
            .iter()
            .filter(|i| i.allows_anonymous_or_cookie())
            .find_map(|i| i.access_url.clone());
        if let Some(url) = usable {
            return Ok(url);
        }
    }

    Err(Error::CapabilityNotUsable(standard_id.to_string()))
}

/// Parse a capabilities document
///
/// Namespace prefixes are ignored and names are matched case-insensitively.
pub fn parse_capabilities(xml: &str) -> Result<Vec<Capability>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut capabilities = Vec::new();
    let mut current: Option<Capability> = None;
    let mut interface: Option<Interface> = None;
    let mut in_access_url = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match element_name(e).as_str() {
                "capability" => current = Some(start_capability(e)?),
                "interface" if current.is_some() => interface = Some(Interface::default()),
                "securitymethod" => push_security_method(&mut interface, e)?,
                "accessurl" if interface.is_some() => in_access_url = true,
                _ => {}
            },
            Event::Empty(ref e) => match element_name(e).as_str() {
                "capability" => capabilities.push(start_capability(e)?),
                "interface" => {
                    if let Some(cap) = current.as_mut() {
                        cap.interfaces.push(Interface::default());
                    }
                }
                "securitymethod" => push_security_method(&mut interface, e)?,
                _ => {}
            },
            Event::Text(ref e) if in_access_url => {
                let text = e.unescape()?;
                if let Some(i) = interface.as_mut() {
                    i.access_url
                        .get_or_insert_with(String::new)
                        .push_str(text.trim());
                }
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                match name.as_str() {
                    "accessurl" => in_access_url = false,
                    "interface" => {
                        if let (Some(cap), Some(done)) = (current.as_mut(), interface.take()) {
                            cap.interfaces.push(done);
                        }
                    }
                    "capability" => {
                        if let Some(done) = current.take() {
                            capabilities.push(done);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(capabilities)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

fn attribute(e: &BytesStart<'_>, wanted: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_ascii_lowercase();
        if key == wanted {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn start_capability(e: &BytesStart<'_>) -> Result<Capability> {
    Ok(Capability {
        standard_id: attribute(e, "standardid")?,
        interfaces: Vec::new(),
    })
}

fn push_security_method(interface: &mut Option<Interface>, e: &BytesStart<'_>) -> Result<()> {
    if let Some(i) = interface.as_mut() {
        i.security_methods.push(SecurityMethod {
            standard_id: attribute(e, "standardid")?,
        });
    }
    Ok(())
}
