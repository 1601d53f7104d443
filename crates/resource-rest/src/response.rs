// Archivo: response.rs
// Propósito: respuesta REST y presentación de entidades y errores en JSON
// o XML.
use crate::errors::RestError;
use crate::request::Format;
use entity_domain::{Entity, Violation};
use http::StatusCode;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const ETAG: &str = "ETag";
pub const ENTITY_VERSION: &str = "X-Entity-Version";

/// Cuerpo de error: mensaje legible, código estable y, si aplica, las
/// violaciones de validación.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<ViolationBody>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationBody {
    pub property_path: String,
    pub message: String,
}

impl From<&Violation> for ViolationBody {
    fn from(v: &Violation) -> Self {
        Self { property_path: v.property_path.clone(), message: v.message.clone() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub headers: IndexMap<String, String>,
    pub body: String,
}

impl RestResponse {
    /// Respuesta con una entidad; lleva `ETag` y versión.
    pub fn entity(status: StatusCode, entity: &Entity, format: Format) -> Self {
        let json = entity.to_json();
        let mut response = Self::value(status, &json, format);
        response.headers.insert(ETAG.to_string(), etag(entity));
        response.headers.insert(ENTITY_VERSION.to_string(), entity.version().to_string());
        response
    }

    /// Respuesta con una lista de entidades.
    pub fn list(entities: &[Entity], format: Format) -> Self {
        let json = Value::Array(entities.iter().map(Entity::to_json).collect());
        Self::value(StatusCode::OK, &json, format)
    }

    pub fn error(err: &RestError, format: Format) -> Self {
        let violations = match err {
            RestError::Resource(inner) if !inner.violations().is_empty() => {
                Some(inner.violations().iter().map(ViolationBody::from).collect())
            }
            _ => None,
        };
        let body = ErrorResponse { error: err.to_string(), code: err.code().to_string(), violations };
        // ErrorResponse siempre se puede serializar
        let json = serde_json::to_value(&body).unwrap_or(Value::Null);
        Self::value(err.status(), &json, format)
    }

    fn value(status: StatusCode, json: &Value, format: Format) -> Self {
        let body = match format {
            Format::Json => json.to_string(),
            Format::Xml => to_xml(json),
        };
        Self { status,
               content_type: format.content_type(),
               headers: IndexMap::new(),
               body }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Cuerpo interpretado como JSON; `Value::Null` si no lo es.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Etiqueta de entidad: sha256 del JSON de la entidad, entre comillas.
pub fn etag(entity: &Entity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entity.kind().as_bytes());
    hasher.update(entity.version().to_le_bytes());
    hasher.update(entity.to_json().to_string().as_bytes());
    format!("\"{:x}\"", hasher.finalize())
}

/// Documento XML `<result>`: un elemento por propiedad, texto en CDATA y
/// las listas como hijos `<entry>`.
pub fn to_xml(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(&mut out, "result", value);
    out.push('\n');
    out
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                write_element(out, key, child);
            }
        }
        Value::Array(items) => {
            for item in items {
                write_element(out, "entry", item);
            }
        }
        Value::String(s) => push_cdata(out, s),
        other => push_cdata(out, &other.to_string()),
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn push_cdata(out: &mut String, text: &str) {
    out.push_str("<![CDATA[");
    // "]]>" no puede aparecer dentro de una sección CDATA
    out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
    out.push_str("]]>");
}
