//! XML element tree and serialization of fiscal documents.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::fel::builder::format_timestamp;
use crate::fel::document::{CancellationDocument, CertificationDocument, Emitter, ExportComplement, LineEntry};
use crate::fel::error::FelError;
use crate::fel::receiver::Receiver;

pub const DTE_NAMESPACE: &str = "http://www.sat.gob.gt/dte/fel/0.2.0";
pub const CANCELLATION_NAMESPACE: &str = "http://www.sat.gob.gt/dte/fel/0.1.0";
pub const EXPORT_NAMESPACE: &str = "http://www.sat.gob.gt/face2/ComplementoExportaciones/0.1.0";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

const DOCUMENT_TYPE: &str = "FACT";
const TAX_SHORT_NAME: &str = "IVA";

/// XML element with ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Element with trimmed text content.
    pub fn with_text(name: impl Into<String>, text: impl AsRef<str>) -> Self {
        let mut node = Self::new(name);
        node.text = Some(text.as_ref().trim().to_string());
        node
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.attributes.push((name.into(), value.as_ref().trim().to_string()));
        self
    }

    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// First direct child with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn xml_io(error: std::io::Error) -> FelError {
    FelError::Xml(format!("XML write error: {error}"))
}

/// Serialize a tree with an XML declaration and two-space indentation.
///
/// Text and attribute values are escaped by the writer.
///
/// # Errors
/// Returns an error if writing fails.
pub fn serialize(root: &XmlNode) -> Result<String, FelError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_io)?;
    write_node(&mut writer, root)?;
    let buffer = writer.into_inner().into_inner();
    String::from_utf8(buffer).map_err(|error| FelError::Xml(format!("XML UTF-8 error: {error}")))
}

fn write_node(writer: &mut Writer<Cursor<Vec<u8>>>, node: &XmlNode) -> Result<(), FelError> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    match &node.text {
        None if node.children.is_empty() => writer.write_event(Event::Empty(start)).map_err(xml_io)?,
        text => {
            writer.write_event(Event::Start(start)).map_err(xml_io)?;
            if let Some(text) = text.as_deref().filter(|text| !text.is_empty()) {
                writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_io)?;
            }
            for child in &node.children {
                write_node(writer, child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(node.name.as_str())))
                .map_err(xml_io)?;
        }
    }
    Ok(())
}

/// Money and line amounts: six decimals.
#[must_use]
pub fn format_money(value: Decimal) -> String {
    format!("{:.6}", value.round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero))
}

/// Quantities: two decimals.
#[must_use]
pub fn format_quantity(value: Decimal) -> String {
    format!("{:.2}", value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

fn dte(name: &str) -> String {
    format!("dte:{name}")
}

fn address_node(name: &str, street: &str, postal_code: &str, city: &str, department: &str, country: &str) -> XmlNode {
    XmlNode::new(dte(name))
        .child(XmlNode::with_text(dte("Direccion"), street))
        .child(XmlNode::with_text(dte("CodigoPostal"), postal_code))
        .child(XmlNode::with_text(dte("Municipio"), city))
        .child(XmlNode::with_text(dte("Departamento"), department))
        .child(XmlNode::with_text(dte("Pais"), country))
}

fn emitter_node(emitter: &Emitter) -> XmlNode {
    let address = &emitter.address;
    XmlNode::new(dte("Emisor"))
        .attr("AfiliacionIVA", &emitter.vat_affiliation)
        .attr("CodigoEstablecimiento", &emitter.establishment_code)
        .attr("CorreoEmisor", &emitter.email)
        .attr("NITEmisor", &emitter.tax_id)
        .attr("NombreComercial", &emitter.commercial_name)
        .attr("NombreEmisor", &emitter.name)
        .child(address_node(
            "DireccionEmisor",
            &address.street,
            &address.postal_code,
            &address.city,
            &address.department,
            &address.country,
        ))
}

fn receiver_node(receiver: &Receiver) -> XmlNode {
    let address = &receiver.address;
    XmlNode::new(dte("Receptor"))
        .attr("CorreoReceptor", &receiver.email)
        .attr("IDReceptor", &receiver.id)
        .attr("NombreReceptor", &receiver.name)
        .child(address_node(
            "DireccionReceptor",
            &address.street,
            &address.postal_code,
            &address.city,
            &address.department,
            &address.country,
        ))
}

fn item_node(line: &LineEntry) -> XmlNode {
    let tax = XmlNode::new(dte("Impuesto"))
        .child(XmlNode::with_text(dte("NombreCorto"), TAX_SHORT_NAME))
        .child(XmlNode::with_text(dte("CodigoUnidadGravable"), line.taxable_unit.code()))
        .child(XmlNode::with_text(dte("MontoGravable"), format_money(line.taxable_amount)))
        .child(XmlNode::with_text(dte("MontoImpuesto"), format_money(line.tax_amount)));

    XmlNode::new(dte("Item"))
        .attr("BienOServicio", "S")
        .attr("NumeroLinea", line.number.to_string())
        .child(XmlNode::with_text(dte("Cantidad"), format_quantity(line.quantity)))
        .child(XmlNode::with_text(dte("UnidadMedida"), &line.unit_of_measure))
        .child(XmlNode::with_text(dte("Descripcion"), &line.description))
        .child(XmlNode::with_text(dte("PrecioUnitario"), format_money(line.unit_price)))
        .child(XmlNode::with_text(dte("Precio"), format_money(line.price)))
        .child(XmlNode::with_text(dte("Descuento"), format_money(line.discount)))
        .child(XmlNode::new(dte("Impuestos")).child(tax))
        .child(XmlNode::with_text(dte("Total"), format_money(line.total)))
}

fn complement_node(complement: &ExportComplement) -> XmlNode {
    let export = XmlNode::new("cex:Exportacion")
        .attr("xmlns:cex", EXPORT_NAMESPACE)
        .attr("Version", "1")
        .child(XmlNode::with_text(
            "cex:NombreConsignatarioODestinatario",
            &complement.consignee_name,
        ))
        .child(XmlNode::with_text("cex:DireccionConsignatario", &complement.consignee_address))
        .child(XmlNode::with_text("cex:NombreComprador", &complement.buyer_name))
        .child(XmlNode::with_text("cex:DireccionComprador", &complement.buyer_address))
        .child(XmlNode::with_text("cex:CodigoComprador", &complement.buyer_code))
        .child(XmlNode::with_text("cex:NombreExportador", &complement.exporter_name))
        .child(XmlNode::with_text("cex:CodigoExportador", &complement.exporter_code));

    XmlNode::new(dte("Complementos")).child(
        XmlNode::new(dte("Complemento"))
            .attr("IDComplemento", "ID_EXPORTACION")
            .attr("NombreComplemento", "Exportacion")
            .attr("URIComplemento", EXPORT_NAMESPACE)
            .child(export),
    )
}

/// Element tree of a certification document.
#[must_use]
pub fn certification_tree(document: &CertificationDocument) -> XmlNode {
    let mut general = XmlNode::new(dte("DatosGenerales")).attr("CodigoMoneda", &document.currency);
    if document.jurisdiction.is_export() {
        general = general.attr("Exp", "SI");
    }
    let general = general
        .attr("FechaHoraEmision", format_timestamp(&document.issued_at))
        .attr("Tipo", DOCUMENT_TYPE);

    let phrases = XmlNode::new(dte("Frases")).children(document.phrases.iter().map(|phrase| {
        XmlNode::new(dte("Frase"))
            .attr("CodigoEscenario", &phrase.scenario_code)
            .attr("TipoFrase", &phrase.phrase_type)
    }));

    let items = XmlNode::new(dte("Items")).children(document.lines.iter().map(item_node));

    let totals = XmlNode::new(dte("Totales"))
        .child(
            XmlNode::new(dte("TotalImpuestos")).child(
                XmlNode::new(dte("TotalImpuesto"))
                    .attr("NombreCorto", TAX_SHORT_NAME)
                    .attr("TotalMontoImpuesto", format_money(document.tax_total)),
            ),
        )
        .child(XmlNode::with_text(dte("GranTotal"), format_money(document.grand_total)));

    let mut emission = XmlNode::new(dte("DatosEmision"))
        .attr("ID", "DatosEmision")
        .child(general)
        .child(emitter_node(&document.emitter))
        .child(receiver_node(&document.receiver))
        .child(phrases)
        .child(items)
        .child(totals);
    if let Some(complement) = &document.complement {
        emission = emission.child(complement_node(complement));
    }

    XmlNode::new(dte("GTDocumento"))
        .attr("xmlns:dte", DTE_NAMESPACE)
        .attr("xmlns:xsi", XSI_NAMESPACE)
        .attr("Version", "0.1")
        .child(
            XmlNode::new(dte("SAT")).attr("ClaseDocumento", "dte").child(
                XmlNode::new(dte("DTE"))
                    .attr("ID", "DatosCertificados")
                    .child(emission),
            ),
        )
}

/// Element tree of a cancellation document.
#[must_use]
pub fn cancellation_tree(document: &CancellationDocument) -> XmlNode {
    let general = XmlNode::new(dte("DatosGenerales"))
        .attr("ID", "DatosAnulacion")
        .attr("NumeroDocumentoAAnular", &document.document_id)
        .attr("NITEmisor", &document.emitter_tax_id)
        .attr("IDReceptor", &document.receiver_id)
        .attr("FechaEmisionDocumentoAnular", &document.original_issue_date)
        .attr("FechaHoraAnulacion", format_timestamp(&document.canceled_at))
        .attr("MotivoAnulacion", &document.reason);

    XmlNode::new(dte("GTAnulacionDocumento"))
        .attr("xmlns:dte", CANCELLATION_NAMESPACE)
        .attr("xmlns:xsi", XSI_NAMESPACE)
        .attr("Version", "0.1")
        .child(
            XmlNode::new(dte("SAT")).child(
                XmlNode::new(dte("AnulacionDTE"))
                    .attr("ID", "DatosCertificados")
                    .child(general),
            ),
        )
}
