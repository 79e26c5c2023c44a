// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while serializing a [`TestSuite`](crate::TestSuite).
///
/// Returned by [`TestSuite::serialize`](crate::TestSuite::serialize) and
/// [`TestSuite::to_string`](crate::TestSuite::to_string).
#[derive(Debug, Error)]
#[error("error serializing JUnit report")]
pub struct SerializeError {
    #[from]
    inner: quick_xml::Error,
}

/// An error that occurs while reading a report back into an [`XmlElement`](crate::XmlElement).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReadError {
    /// The underlying XML was malformed.
    #[error("error reading JUnit report")]
    Xml(#[from] quick_xml::Error),

    /// The document ended before every element was closed.
    #[error("unexpected end of document: element `{name}` was never closed")]
    UnclosedElement {
        /// The innermost element left open.
        name: String,
    },

    /// The document has no root element.
    #[error("document has no root element")]
    NoRootElement,
}
