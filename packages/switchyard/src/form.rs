//! Form submissions.
//!
//! Bodies are `application/x-www-form-urlencoded`. Fields are collected with
//! last-one-wins semantics for repeated names, then validated by a
//! [`FormSchema`] into a typed request. Validation problems are reported per
//! field so clients can show them next to the offending input.

use std::collections::{BTreeMap, HashMap};

use clients::switchyard::v1::{ChangeOrganizationRequest, OrganizationId};
use derive_more::Debug;
use serde::Serialize;
use tap::Pipe;

use crate::error::ApiError;

/// The raw fields of a submitted form.
#[derive(Clone, Default, Debug)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    /// Decode an urlencoded body.
    pub fn from_bytes(body: &[u8]) -> Self {
        url::form_urlencoded::parse(body)
            .into_owned()
            .collect::<HashMap<_, _>>()
            .pipe(FormFields)
    }

    /// A required field; records an error when it is missing. Present values
    /// are returned as-is, including empty ones.
    pub fn required<'a>(&'a self, name: &'static str, errors: &mut FieldErrors) -> Option<&'a str> {
        let value = self.0.get(name).map(String::as_str);
        if value.is_none() {
            errors.insert(name, "Required");
        }
        value
    }

    /// An optional field; empty values count as absent.
    pub fn optional(&self, name: &'static str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Validation problems keyed by field name.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

/// A typed request that can be validated out of form fields.
pub trait FormSchema: Sized {
    fn from_fields(fields: &FormFields) -> Result<Self, FieldErrors>;
}

/// Parse and validate an urlencoded body.
pub fn parse_data<T: FormSchema>(body: &[u8]) -> Result<T, ApiError> {
    T::from_fields(&FormFields::from_bytes(body)).map_err(ApiError::validation)
}

impl FormSchema for ChangeOrganizationRequest {
    fn from_fields(fields: &FormFields) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();
        let organization_id = fields.required("organizationId", &mut errors);
        let redirect_to = fields.optional("redirectTo");

        match organization_id {
            Some(organization_id) if errors.is_empty() => ChangeOrganizationRequest::builder()
                .organization_id(OrganizationId::new(organization_id))
                .maybe_redirect_to(redirect_to)
                .build()
                .pipe(Ok),
            _ => Err(errors),
        }
    }
}
