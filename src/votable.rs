//! VOTable reader
//!
//! Reads the TABLEDATA serialization used by CADC for TAP results and
//! DataLink responses: the first results table (fields, rows, query status)
//! and any `adhoc:service` resources describing invocable services.
//! BINARY, BINARY2 and FITS serializations are rejected.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Row count at which a synchronous CADC query is capped by the service
pub const SYNC_ROW_LIMIT: usize = 2000;

/// Column description from a `<FIELD>` element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Field {
    /// Column name
    pub name: String,
    /// XML `ID`, the target of `ref` attributes
    pub id: Option<String>,
    /// VOTable datatype (`char`, `int`, `double`, ...)
    pub datatype: Option<String>,
    /// Array size (`*`, `64`, ...)
    pub arraysize: Option<String>,
    /// Physical unit
    pub unit: Option<String>,
    /// Unified content descriptor
    pub ucd: Option<String>,
}

impl Field {
    /// A `char` column named `name`
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: Some("char".to_string()),
            arraysize: Some("*".to_string()),
            ..Default::default()
        }
    }

    /// Interpret a raw cell according to this field's datatype
    pub fn parse_value(&self, raw: &str) -> Value {
        let scalar = self
            .arraysize
            .as_deref()
            .is_none_or(|size| size == "1");
        match self.datatype.as_deref() {
            Some("short" | "int" | "long" | "unsignedByte") if scalar => raw
                .trim()
                .parse()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            Some("float" | "double") if scalar => raw
                .trim()
                .parse()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            Some("boolean") if scalar => match raw.trim() {
                "T" | "t" | "true" | "1" => Value::Bool(true),
                "F" | "f" | "false" | "0" => Value::Bool(false),
                _ => Value::Text(raw.to_string()),
            },
            _ => Value::Text(raw.to_string()),
        }
    }
}

/// A typed cell value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Integer column
    Int(i64),
    /// Floating-point column
    Float(f64),
    /// Boolean column
    Bool(bool),
    /// Character data or any array column
    Text(String),
}

/// A `<PARAM>` element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// XML `ID`
    pub id: Option<String>,
    /// The `value` attribute
    pub value: Option<String>,
    /// The `ref` attribute, naming a FIELD whose per-row value applies
    pub reference: Option<String>,
    /// VOTable datatype
    pub datatype: Option<String>,
}

/// Query status reported through `<INFO name="QUERY_STATUS">`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    /// Query completed
    Ok,
    /// Results were truncated by a row limit
    Overflow,
    /// Query failed with the given message
    Error(String),
}

/// Service descriptor from a `<RESOURCE type="meta" utype="adhoc:service">`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Resource `ID`, referenced by the `service_def` column
    pub id: Option<String>,
    /// Top-level PARAMs (`accessURL`, `standardID`, ...)
    pub params: Vec<Param>,
    /// PARAMs of the `inputParams` group
    pub input_params: Vec<Param>,
}

impl ServiceDescriptor {
    fn param_value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.value.as_deref())
    }

    /// The service endpoint
    pub fn access_url(&self) -> Option<&str> {
        self.param_value("accessURL")
    }

    /// The IVOA standard the service implements
    pub fn standard_id(&self) -> Option<&str> {
        self.param_value("standardID")
    }
}

/// A result table: named, typed columns and rows of optional cells
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    fields: Vec<Field>,
    rows: Vec<Vec<Option<String>>>,
    status: Option<QueryStatus>,
}

impl Table {
    /// Build a table from fields and rows; short rows are padded with nulls
    pub fn new(fields: Vec<Field>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = fields.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self {
            fields,
            rows,
            status: None,
        }
    }

    /// Column descriptions
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Column names in order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Index of the column called `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// True if a column called `name` exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Every cell of the column called `name`, or `None` if there is no such column
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).and_then(|c| c.as_deref()))
                .collect(),
        )
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { table: self, cells })
    }

    /// The `QUERY_STATUS` reported by the service, if any
    pub fn status(&self) -> Option<&QueryStatus> {
        self.status.as_ref()
    }

    /// True if the service may have cut the result short.
    ///
    /// CADC caps synchronous queries at [`SYNC_ROW_LIMIT`] rows without always
    /// flagging an overflow, so exactly that many rows counts as truncation.
    pub fn is_possibly_truncated(&self) -> bool {
        matches!(self.status, Some(QueryStatus::Overflow)) || self.rows.len() == SYNC_ROW_LIMIT
    }

    /// A new table holding the rows for which `predicate` is true
    pub fn filter<F>(&self, predicate: F) -> Table
    where
        F: Fn(&Row<'_>) -> bool,
    {
        let rows = self
            .rows()
            .filter(|row| predicate(row))
            .map(|row| row.cells.to_vec())
            .collect();
        Table {
            fields: self.fields.clone(),
            rows,
            status: self.status.clone(),
        }
    }
}

/// A borrowed row of a [`Table`]
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [Option<String>],
}

impl<'a> Row<'a> {
    /// Raw text of the cell in column `name`; `None` for null cells or unknown columns
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let idx = self.table.column_index(name)?;
        self.cells.get(idx)?.as_deref()
    }

    /// Raw text of the cell in the column whose FIELD `ID` is `id`
    pub fn get_by_id(&self, id: &str) -> Option<&'a str> {
        let idx = self
            .table
            .fields
            .iter()
            .position(|f| f.id.as_deref() == Some(id))?;
        self.cells.get(idx)?.as_deref()
    }

    /// Typed value of the cell in column `name`
    pub fn value(&self, name: &str) -> Option<Value> {
        let idx = self.table.column_index(name)?;
        let raw = self.cells.get(idx)?.as_deref()?;
        Some(self.table.fields[idx].parse_value(raw))
    }
}

/// A parsed VOTable document
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoTable {
    /// The first results table
    pub table: Table,
    /// Service descriptors, in document order
    pub services: Vec<ServiceDescriptor>,
}

impl VoTable {
    /// The service descriptor whose resource `ID` is `id`
    pub fn service(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.id.as_deref() == Some(id))
    }

    /// Fail with [`Error::Query`] if the service reported an error
    pub fn into_result(self) -> Result<Self> {
        if let Some(QueryStatus::Error(message)) = &self.table.status {
            return Err(Error::Query(message.clone()));
        }
        Ok(self)
    }
}

/// Parse a VOTable document
pub fn parse_votable(bytes: &[u8]) -> Result<VoTable> {
    let xml = std::str::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parser = VoTableParser::default();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) => parser.handle_start(e, false)?,
            Event::Empty(ref e) => parser.handle_start(e, true)?,
            Event::Text(ref e) => parser.handle_text(&e.unescape()?),
            Event::CData(ref e) => parser.handle_text(&String::from_utf8_lossy(e)),
            Event::End(ref e) => {
                parser.handle_end(&String::from_utf8_lossy(e.local_name().as_ref()))
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parser.finish())
}

/// VOTable state machine
#[derive(Default)]
struct VoTableParser {
    table: Table,
    services: Vec<ServiceDescriptor>,
    service: Option<ServiceDescriptor>,
    resource_depth: usize,
    service_depth: Option<usize>,
    in_input_group: bool,
    in_table: bool,
    table_done: bool,
    row: Option<Vec<Option<String>>>,
    cell: Option<String>,
    info: Option<(String, String)>,
}

impl VoTableParser {
    fn handle_start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
        match name.as_str() {
            "RESOURCE" => {
                if !empty {
                    self.resource_depth += 1;
                }
                if attr(e, "utype")?.as_deref() == Some("adhoc:service") {
                    let descriptor = ServiceDescriptor {
                        id: attr(e, "ID")?,
                        ..Default::default()
                    };
                    if empty {
                        self.services.push(descriptor);
                    } else {
                        self.service = Some(descriptor);
                        self.service_depth = Some(self.resource_depth);
                    }
                }
            }
            "GROUP" if self.service.is_some() && !empty => {
                self.in_input_group = attr(e, "name")?.as_deref() == Some("inputParams");
            }
            "PARAM" => {
                let param = Param {
                    name: attr(e, "name")?.unwrap_or_default(),
                    id: attr(e, "ID")?,
                    value: attr(e, "value")?,
                    reference: attr(e, "ref")?,
                    datatype: attr(e, "datatype")?,
                };
                if let Some(service) = self.service.as_mut() {
                    if self.in_input_group {
                        service.input_params.push(param);
                    } else {
                        service.params.push(param);
                    }
                }
            }
            "INFO" => {
                if attr(e, "name")?.as_deref() == Some("QUERY_STATUS") && self.service.is_none() {
                    let value = attr(e, "value")?.unwrap_or_default();
                    if empty {
                        self.set_status(&value, String::new());
                    } else {
                        self.info = Some((value, String::new()));
                    }
                }
            }
            "TABLE" if self.service.is_none() && !self.table_done => {
                if empty {
                    self.table_done = true;
                } else {
                    self.in_table = true;
                }
            }
            "FIELD" if self.in_table => {
                if !self.table.rows.is_empty() || self.row.is_some() {
                    return Err(Error::Xml("FIELD declared after table rows".to_string()));
                }
                self.table.fields.push(Field {
                    name: attr(e, "name")?.unwrap_or_default(),
                    id: attr(e, "ID")?,
                    datatype: attr(e, "datatype")?,
                    arraysize: attr(e, "arraysize")?,
                    unit: attr(e, "unit")?,
                    ucd: attr(e, "ucd")?,
                });
            }
            "TR" if self.in_table => {
                self.row = Some(Vec::with_capacity(self.table.fields.len()));
                if empty {
                    self.finish_row();
                }
            }
            "TD" if self.in_table => {
                if empty {
                    if let Some(row) = self.row.as_mut() {
                        row.push(None);
                    }
                } else {
                    self.cell = Some(String::new());
                }
            }
            "BINARY" | "BINARY2" | "FITS" if self.in_table => {
                return Err(Error::Xml(format!(
                    "unsupported VOTable serialization {}",
                    name
                )));
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &str) {
        if let Some(cell) = self.cell.as_mut() {
            cell.push_str(text);
        } else if let Some((_, message)) = self.info.as_mut() {
            message.push_str(text);
        }
    }

    fn handle_end(&mut self, name: &str) {
        match name {
            "TD" => {
                if let (Some(row), Some(cell)) = (self.row.as_mut(), self.cell.take()) {
                    row.push(if cell.is_empty() { None } else { Some(cell) });
                }
            }
            "TR" => self.finish_row(),
            "TABLE" if self.in_table => {
                self.in_table = false;
                self.table_done = true;
            }
            "INFO" => {
                if let Some((value, message)) = self.info.take() {
                    self.set_status(&value, message);
                }
            }
            "GROUP" => self.in_input_group = false,
            "RESOURCE" => {
                if self.service_depth == Some(self.resource_depth)
                    && let Some(service) = self.service.take()
                {
                    self.services.push(service);
                    self.service_depth = None;
                    self.in_input_group = false;
                }
                self.resource_depth = self.resource_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn finish_row(&mut self) {
        if let Some(mut row) = self.row.take() {
            row.resize(self.table.fields.len(), None);
            self.table.rows.push(row);
        }
    }

    fn set_status(&mut self, value: &str, message: String) {
        self.table.status = Some(match value {
            "OK" => QueryStatus::Ok,
            "OVERFLOW" => QueryStatus::Overflow,
            _ => QueryStatus::Error(message),
        });
    }

    fn finish(self) -> VoTable {
        VoTable {
            table: self.table,
            services: self.services,
        }
    }
}

fn attr(e: &BytesStart<'_>, wanted: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        if attr.key.local_name().as_ref() == wanted.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
