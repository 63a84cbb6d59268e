//! Blocking client for the SoundTouch HTTP/XML API (port 8090).
//!
//! Only the endpoints the browser needs are covered: device identity,
//! media server listing, library navigation and content selection.

use std::time::Duration;

use tracing::{debug, warn};
use ureq::Agent;
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::errors::ControlPointError;
use crate::model::{
    ContainerRef, ContentItem, DeviceId, DeviceInfo, Item, ItemKind, ListResult, MediaServer,
};

pub const DEFAULT_PORT: u16 = 8090;

/// Largest page the device returns for one `/navigate` call.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

const INFO: &str = "info";
const LIST_MEDIA_SERVERS: &str = "listMediaServers";
const NAVIGATE: &str = "navigate";
const SELECT: &str = "select";

pub fn build_agent(timeout: Duration) -> Agent {
    // Error bodies carry the device's <errors> document, so 4xx/5xx must be
    // readable instead of surfacing as ureq::Error::StatusCode.
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

pub struct SoundTouchClient {
    host: String,
    port: u16,
    agent: Agent,
}

impl SoundTouchClient {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            agent: build_agent(timeout),
        }
    }

    /// Builds a client and checks the device answers on `/info`.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(Self, DeviceInfo), ControlPointError> {
        let client = Self::new(host, port, timeout);
        let info = client.info()?;
        debug!(
            host = host,
            device = info.name.as_str(),
            id = info.device_id.0.as_str(),
            "SoundTouch device answered"
        );
        Ok((client, info))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn url(&self, endpoint: &str) -> String {
        format!("http://{}:{}/{}", self.host, self.port, endpoint)
    }

    fn get(&self, endpoint: &str) -> Result<Element, ControlPointError> {
        let url = self.url(endpoint);
        debug!(url = url.as_str(), "GET");
        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ControlPointError::http(endpoint, e))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ControlPointError::http(endpoint, e))?;

        parse_response(endpoint, status, &body)
    }

    fn post(&self, endpoint: &str, body: String) -> Result<Element, ControlPointError> {
        let url = self.url(endpoint);
        debug!(url = url.as_str(), body = body.as_str(), "POST");
        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/xml")
            .send(body)
            .map_err(|e| ControlPointError::http(endpoint, e))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ControlPointError::http(endpoint, e))?;

        parse_response(endpoint, status, &body)
    }

    pub fn info(&self) -> Result<DeviceInfo, ControlPointError> {
        let root = self.get(INFO)?;
        parse_info(&root)
    }

    pub fn list_media_servers(&self) -> Result<Vec<MediaServer>, ControlPointError> {
        let root = self.get(LIST_MEDIA_SERVERS)?;
        Ok(parse_media_servers(&root))
    }

    /// Account string the device expects for `STORED_MUSIC` requests:
    /// the first media server id suffixed with `/0`.
    pub fn stored_music_account(&self) -> Result<String, ControlPointError> {
        let servers = self.list_media_servers()?;
        let server = servers.first().ok_or(ControlPointError::NoMediaServer)?;
        debug!(
            server = server.friendly_name.as_str(),
            id = server.id.as_str(),
            "Using media server for stored music"
        );
        Ok(format!("{}/0", server.id))
    }

    /// Lists one page of `container` (the source root when `None`).
    ///
    /// `start` is 1-based, as on the device.
    pub fn navigate(
        &self,
        source: &str,
        account: &str,
        container: Option<&ContainerRef>,
        start: u32,
        count: u32,
    ) -> Result<ListResult, ControlPointError> {
        let body = navigate_body(source, account, container, start, count)?;
        let root = self.post(NAVIGATE, body)?;
        parse_navigate(&root)
    }

    pub fn select(&self, content: &ContentItem) -> Result<(), ControlPointError> {
        let body = to_xml(&content_item_element(content), SELECT)?;
        self.post(SELECT, body)?;
        Ok(())
    }
}

fn parse_response(endpoint: &str, status: u16, body: &str) -> Result<Element, ControlPointError> {
    let parsed = Element::parse(body.as_bytes());

    if let Ok(root) = &parsed {
        if root.name == "errors" {
            return Err(parse_device_error(root));
        }
    }

    if !(200..300).contains(&status) {
        return Err(ControlPointError::Http(
            endpoint.to_string(),
            format!("HTTP status {} and body: {}", status, body),
        ));
    }

    parsed.map_err(|e| ControlPointError::xml_parse(endpoint, e))
}

fn parse_device_error(root: &Element) -> ControlPointError {
    let Some(error) = root.get_child("error") else {
        return ControlPointError::DeviceError {
            code: 0,
            name: "UNKNOWN".to_string(),
            message: String::new(),
        };
    };

    let code = error
        .attributes
        .get("value")
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let name = error
        .attributes
        .get("name")
        .cloned()
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let message = error
        .get_text()
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    ControlPointError::DeviceError {
        code,
        name,
        message,
    }
}

fn child_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .get_child(name)
        .and_then(|child| child.get_text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn attribute(elem: &Element, name: &str) -> Option<String> {
    elem.attributes
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_info(root: &Element) -> Result<DeviceInfo, ControlPointError> {
    let device_id = attribute(root, "deviceID")
        .ok_or_else(|| ControlPointError::missing_element("deviceID", INFO))?;
    let name = child_text(root, "name").ok_or_else(|| ControlPointError::missing_element("name", INFO))?;

    Ok(DeviceInfo {
        device_id: DeviceId(device_id),
        name,
        device_type: child_text(root, "type"),
    })
}

fn parse_media_servers(root: &Element) -> Vec<MediaServer> {
    root.children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Element(elem) if elem.name == "media_server" => Some(elem),
            _ => None,
        })
        .filter_map(|elem| {
            let Some(id) = attribute(elem, "id") else {
                warn!("Skipping media_server entry without id");
                return None;
            };
            Some(MediaServer {
                friendly_name: attribute(elem, "friendly_name").unwrap_or_else(|| id.clone()),
                id,
                ip: attribute(elem, "ip"),
                manufacturer: attribute(elem, "manufacturer"),
                model_name: attribute(elem, "model_name"),
                location: attribute(elem, "location"),
            })
        })
        .collect()
}

fn parse_content_item(elem: &Element) -> Option<ContentItem> {
    let source = attribute(elem, "source")?;
    Some(ContentItem {
        source,
        location: attribute(elem, "location"),
        source_account: attribute(elem, "sourceAccount"),
        is_presetable: attribute(elem, "isPresetable")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        item_name: child_text(elem, "itemName"),
    })
}

fn parse_navigate(root: &Element) -> Result<ListResult, ControlPointError> {
    if root.name != "navigateResponse" {
        return Err(ControlPointError::missing_element("navigateResponse", NAVIGATE));
    }

    let total = child_text(root, "totalItems").and_then(|t| t.parse::<u32>().ok());

    let Some(items_elem) = root.get_child("items") else {
        // An empty folder comes back without an <items> block.
        return Ok(ListResult {
            items: Vec::new(),
            total,
        });
    };

    let mut items = Vec::new();
    for node in &items_elem.children {
        let XMLNode::Element(entry) = node else {
            continue;
        };
        if entry.name != "item" {
            continue;
        }

        let name = child_text(entry, "name").unwrap_or_default();
        let kind = ItemKind::from_wire(&child_text(entry, "type").unwrap_or_default());
        let Some(content) = entry.get_child("ContentItem").and_then(parse_content_item) else {
            warn!(name = name.as_str(), "Skipping navigate entry without ContentItem");
            continue;
        };

        items.push(Item::new(&name, kind, content));
    }

    Ok(ListResult { items, total })
}

fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

fn content_item_element(content: &ContentItem) -> Element {
    let mut elem = Element::new("ContentItem");
    elem.attributes
        .insert("source".to_string(), content.source.clone());
    if let Some(location) = &content.location {
        elem.attributes
            .insert("location".to_string(), location.clone());
    }
    if let Some(account) = &content.source_account {
        elem.attributes
            .insert("sourceAccount".to_string(), account.clone());
    }
    elem.attributes.insert(
        "isPresetable".to_string(),
        content.is_presetable.to_string(),
    );
    if let Some(name) = &content.item_name {
        elem.children
            .push(XMLNode::Element(text_element("itemName", name)));
    }
    elem
}

fn navigate_body(
    source: &str,
    account: &str,
    container: Option<&ContainerRef>,
    start: u32,
    count: u32,
) -> Result<String, ControlPointError> {
    let mut root = Element::new("navigate");
    root.attributes
        .insert("source".to_string(), source.to_string());
    root.attributes
        .insert("sourceAccount".to_string(), account.to_string());
    root.children.push(XMLNode::Element(text_element(
        "startItem",
        &start.max(1).to_string(),
    )));
    root.children
        .push(XMLNode::Element(text_element("numItems", &count.to_string())));

    if let Some(container) = container {
        let mut item = Element::new("item");
        item.children
            .push(XMLNode::Element(text_element("name", &container.name)));
        item.children.push(XMLNode::Element(text_element(
            "type",
            ItemKind::Dir.as_wire(),
        )));
        item.children
            .push(XMLNode::Element(content_item_element(&container.content)));
        root.children.push(XMLNode::Element(item));
    }

    to_xml(&root, NAVIGATE)
}

fn to_xml(elem: &Element, endpoint: &str) -> Result<String, ControlPointError> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new().write_document_declaration(false);
    elem.write_with_config(&mut buf, config)
        .map_err(|e| ControlPointError::xml_parse(endpoint, e))?;
    String::from_utf8(buf).map_err(|e| ControlPointError::xml_parse(endpoint, e))
}
