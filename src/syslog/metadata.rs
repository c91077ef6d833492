//! Structured-data elements added to every rewritten frame.
//!
//! Two elements may be appended after MSGID:
//! - `[origin ip="<addr>"]` naming the client the batch came from;
//! - `[<id> k="v" ... fields="k=v,..."]` built from recognized query
//!   parameters and, for deprecated credentials, a deprecation marker.
//!
//! Both are computed once per request and copied into each frame.

use crate::config::schema::MetadataConfig;
use crate::security::credentials::Credential;

/// Append `value` to `out`, escaping `"`, `\` and `]` as RFC 5424 requires
/// inside PARAM-VALUE.
pub fn push_param_value(out: &mut Vec<u8>, value: &[u8]) {
    for &b in value {
        if matches!(b, b'"' | b'\\' | b']') {
            out.push(b'\\');
        }
        out.push(b);
    }
}

/// `[origin ip="<addr>"]`, or nothing for an empty address.
pub fn origin_element(remote_addr: &str) -> Vec<u8> {
    if remote_addr.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(remote_addr.len() + 16);
    out.extend_from_slice(b"[origin ip=\"");
    push_param_value(&mut out, remote_addr.as_bytes());
    out.extend_from_slice(b"\"]");
    out
}

/// Build the query metadata element.
///
/// `query` holds decoded query pairs in request order; the first value of a
/// repeated key wins. Returns `None` when the element would carry nothing.
pub fn metadata_element(
    config: &MetadataConfig,
    query: &[(String, String)],
    credential: Option<&Credential>,
) -> Option<Vec<u8>> {
    if config.id.is_empty() {
        return None;
    }

    let mut attrs = Vec::new();
    let mut fields = Vec::new();

    for key in &config.query_keys {
        let value = match query.iter().find(|(k, _)| k == key) {
            Some((_, v)) if !v.is_empty() => v,
            _ => continue,
        };

        if config.field_keys.contains(key) {
            if !fields.is_empty() {
                fields.push(b',');
            }
            fields.extend_from_slice(key.as_bytes());
            fields.push(b'=');
            push_param_value(&mut fields, value.as_bytes());
        } else {
            attrs.push(b' ');
            attrs.extend_from_slice(key.as_bytes());
            attrs.extend_from_slice(b"=\"");
            push_param_value(&mut attrs, value.as_bytes());
            attrs.push(b'"');
        }
    }

    if let Some(cred) = credential.filter(|c| c.deprecated) {
        if !fields.is_empty() {
            fields.push(b',');
        }
        fields.extend_from_slice(b"credential_deprecated=true,credential_name=");
        push_param_value(&mut fields, cred.name.as_bytes());
    }

    if attrs.is_empty() && fields.is_empty() {
        return None;
    }

    let mut element = Vec::with_capacity(config.id.len() + attrs.len() + fields.len() + 12);
    element.push(b'[');
    element.extend_from_slice(config.id.as_bytes());
    element.extend_from_slice(&attrs);
    if !fields.is_empty() {
        element.extend_from_slice(b" fields=\"");
        element.extend_from_slice(&fields);
        element.push(b'"');
    }
    element.push(b']');
    Some(element)
}
