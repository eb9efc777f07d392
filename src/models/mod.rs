//! Models every OData binding shares.
//!
//! | Type | Wire shape |
//! |------|------------|
//! | [`ODataError`] | `{"error": {"code", "message", "target", "details", "innerError"}}` |
//! | [`CollectionResponse`] | `{"value": [...], "@odata.nextLink", "@odata.deltaLink", "@odata.count"}` |
//!
//! Endpoint-specific models are generated elsewhere and follow the same
//! pattern: a struct or enum implementing
//! [`Parsable`](crate::serialization::Parsable) plus a
//! `create_<name>_from_discriminator_value` factory.

mod collection;
mod odata_error;

pub use collection::CollectionResponse;
pub use odata_error::{
    create_error_details_from_discriminator_value, create_inner_error_from_discriminator_value,
    create_main_error_from_discriminator_value, create_odata_error_from_discriminator_value,
    ErrorDetails, InnerError, MainError, ODataError,
};
