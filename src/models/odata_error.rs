use crate::error::Result;
use crate::serialization::{
    Parsable, ParseNode, ParseNodeExt, SerializationWriter, SerializationWriterExt, UntypedValue,
};
use indexmap::IndexMap;
use std::fmt;

/// The standard OData error body: `{"error": {...}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ODataError {
    pub error: Option<MainError>,
    pub additional_data: IndexMap<String, UntypedValue>,
}

impl ODataError {
    pub fn new(error: MainError) -> Self {
        ODataError {
            error: Some(error),
            additional_data: IndexMap::new(),
        }
    }

    /// Service error code, e.g. `itemNotFound`.
    pub fn code(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.code.as_deref())
    }

    pub fn message(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.message.as_deref())
    }
}

impl fmt::Display for ODataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code(), self.message()) {
            (Some(code), Some(message)) => write!(f, "{}: {}", code, message),
            (Some(code), None) => f.write_str(code),
            (None, Some(message)) => f.write_str(message),
            (None, None) => f.write_str("OData error"),
        }
    }
}

impl std::error::Error for ODataError {}

impl Parsable for ODataError {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_optional_object("error", self.error.as_ref())?;
        writer.write_additional_data(&self.additional_data)
    }
}

/// Factory for [`ODataError`]; the error hierarchy has no subtypes.
pub fn create_odata_error_from_discriminator_value(node: &dyn ParseNode) -> Result<ODataError> {
    Ok(ODataError {
        error: node.child_object("error", create_main_error_from_discriminator_value)?,
        additional_data: node.additional_data(&["error"])?,
    })
}

/// The `error` member of an OData error body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub target: Option<String>,
    pub details: Vec<ErrorDetails>,
    pub inner_error: Option<InnerError>,
}

impl MainError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        MainError {
            code: Some(code.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

impl Parsable for MainError {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_optional("code", self.code.as_ref())?;
        writer.write_optional("message", self.message.as_ref())?;
        writer.write_optional("target", self.target.as_ref())?;
        if !self.details.is_empty() {
            writer.write_collection_of_object_values(Some("details"), &self.details)?;
        }
        writer.write_optional_object("innerError", self.inner_error.as_ref())
    }
}

pub fn create_main_error_from_discriminator_value(node: &dyn ParseNode) -> Result<MainError> {
    Ok(MainError {
        code: node.child("code")?,
        message: node.child("message")?,
        target: node.child("target")?,
        details: node.child_collection("details", create_error_details_from_discriminator_value)?,
        inner_error: node.child_object("innerError", create_inner_error_from_discriminator_value)?,
    })
}

/// One entry of `error.details`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub target: Option<String>,
}

impl Parsable for ErrorDetails {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_optional("code", self.code.as_ref())?;
        writer.write_optional("message", self.message.as_ref())?;
        writer.write_optional("target", self.target.as_ref())
    }
}

pub fn create_error_details_from_discriminator_value(node: &dyn ParseNode) -> Result<ErrorDetails> {
    Ok(ErrorDetails {
        code: node.child("code")?,
        message: node.child("message")?,
        target: node.child("target")?,
    })
}

/// `error.innerError`: free-form diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InnerError {
    pub values: IndexMap<String, UntypedValue>,
}

impl InnerError {
    pub fn get(&self, key: &str) -> Option<&UntypedValue> {
        self.values.get(key)
    }

    /// `request-id`, used when reporting issues to the service.
    pub fn request_id(&self) -> Option<&str> {
        self.values.get("request-id").and_then(UntypedValue::as_str)
    }

    pub fn client_request_id(&self) -> Option<&str> {
        self.values.get("client-request-id").and_then(UntypedValue::as_str)
    }

    pub fn date(&self) -> Option<&str> {
        self.values.get("date").and_then(UntypedValue::as_str)
    }
}

impl Parsable for InnerError {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_additional_data(&self.values)
    }
}

pub fn create_inner_error_from_discriminator_value(node: &dyn ParseNode) -> Result<InnerError> {
    Ok(InnerError {
        values: node.additional_data(&[])?,
    })
}
